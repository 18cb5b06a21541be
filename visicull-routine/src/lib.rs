//! GPU frustum culling for visicull.
//!
//! [`GpuCuller`] runs the same per-object test and atomic slot reservation as
//! [`visicull::CpuCuller`] in a wgpu compute pass. [`CullingBuffers`] owns the
//! object, uniform, command and counter buffers; after a pass the command and
//! counter buffers feed [`record_indirect_draws`] directly, or
//! [`read_back`] copies them to the CPU.
//!
//! Only the bounding box test runs on the GPU.

mod bind_merge;
mod buffers;
mod culler;
mod draw;
mod error;
mod readback;
mod setup;
mod shaders;

pub use buffers::*;
pub use culler::*;
pub use draw::*;
pub use error::*;
pub use readback::*;
pub use setup::*;
pub use shaders::*;

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use visicull::{
        types::{Aabb, DepthRange, MeshRange, ObjectRecord},
        util::frustum::Frustum,
    };

    use crate::{create_iad, read_back, CullingBuffers, GpuCuller, InstanceAdapterDevice};

    struct TestContext {
        iad: InstanceAdapterDevice,
        culler: GpuCuller,
    }

    impl TestContext {
        fn new() -> Option<Self> {
            let iad = pollster::block_on(create_iad(None, None)).ok()?;
            let culler = pollster::block_on(GpuCuller::new(&iad.device)).unwrap();
            Some(Self { iad, culler })
        }

        fn run(&self, objects: &[ObjectRecord], frustum: &Frustum, capacity: usize) -> crate::CullReadback {
            let device = &self.iad.device;
            let mut buffers = CullingBuffers::new(device, objects.len().max(1), capacity).unwrap();
            buffers.upload(&self.iad.queue, objects, frustum).unwrap();

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            self.culler.cull(device, &mut encoder, &buffers);
            self.iad.queue.submit(Some(encoder.finish()));

            pollster::block_on(read_back(device, &self.iad.queue, &buffers)).unwrap()
        }
    }

    fn object(center: Vec3, first_index: u32) -> ObjectRecord {
        ObjectRecord::new(
            Mat4::from_translation(center),
            Aabb::from_center_half_extents(center, Vec3::splat(0.05)),
            MeshRange {
                index_count: 36,
                first_index,
                vertex_offset: 0,
            },
        )
    }

    fn clip_cube() -> Frustum {
        Frustum::from_matrix(Mat4::IDENTITY, DepthRange::ZeroToOne)
    }

    #[test]
    fn compacts_visible_objects() {
        let Some(ctx) = TestContext::new() else {
            return;
        };

        let objects = [
            object(Vec3::new(0.0, 0.0, 0.5), 0),
            object(Vec3::new(5.0, 0.0, 0.5), 36),
            object(Vec3::new(0.5, 0.5, 0.5), 72),
            object(Vec3::new(0.0, 0.0, -3.0), 108),
        ];
        let result = ctx.run(&objects, &clip_cube(), objects.len());

        assert_eq!(result.count, 2);
        let mut indices: Vec<u32> = result.commands.iter().map(|c| c.object_index()).collect();
        indices.sort_unstable();
        assert_eq!(indices, [0, 2]);
        for command in &result.commands {
            assert_eq!(command.first_index, objects[command.object_index() as usize].first_index);
        }
    }

    #[test]
    fn counter_stops_at_capacity() {
        let Some(ctx) = TestContext::new() else {
            return;
        };

        let objects: Vec<_> = (0..1000).map(|i| object(Vec3::new(0.0, 0.0, 0.5), i)).collect();
        let result = ctx.run(&objects, &clip_cube(), 100);

        assert_eq!(result.count, 100);
        let mut indices: Vec<u32> = result.commands.iter().map(|c| c.object_index()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 100);
    }

    #[test]
    fn empty_upload_clears_counter() {
        let Some(ctx) = TestContext::new() else {
            return;
        };

        let result = ctx.run(&[], &clip_cube(), 4);
        assert_eq!(result.count, 0);
        assert!(result.commands.is_empty());
    }
}
