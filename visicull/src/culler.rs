use glam::Vec3;
use rayon::prelude::*;
use visicull_types::{DrawCommand, ObjectRecord};

use crate::{
    util::frustum::{BoundingSphere, Frustum},
    CommandBuffer, CullingError, CullingOptions, CullingTest,
};

/// Frustum test for a single object.
///
/// Pure; the commit into the command buffer is a separate step.
pub fn is_visible(object: &ObjectRecord, frustum: &Frustum, test: CullingTest) -> bool {
    let aabb = object.aabb();
    match test {
        CullingTest::Aabb => frustum.intersects_aabb(&aabb),
        CullingTest::Sphere => frustum.contains_sphere(BoundingSphere::from_aabb(&aabb)),
    }
}

/// Extra criterion applied to objects that passed the frustum test.
pub trait VisibilityFilter: Sync {
    /// Returns `false` to cull the object.
    fn keep(&self, object_index: u32, object: &ObjectRecord) -> bool;
}

/// Keeps everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoFilter;

impl VisibilityFilter for NoFilter {
    fn keep(&self, _object_index: u32, _object: &ObjectRecord) -> bool {
        true
    }
}

/// Culls objects whose box is entirely further than `max_distance` from `origin`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DistanceFilter {
    pub origin: Vec3,
    pub max_distance: f32,
}

impl VisibilityFilter for DistanceFilter {
    fn keep(&self, _object_index: u32, object: &ObjectRecord) -> bool {
        let closest = self.origin.clamp(object.aabb_min, object.aabb_max);
        closest.distance_squared(self.origin) <= self.max_distance * self.max_distance
    }
}

/// Counts from a single culling pass.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CullStats {
    pub candidates: usize,
    /// Objects that passed every test.
    pub visible: usize,
    /// Commands written into the command buffer.
    pub written: usize,
    /// Visible objects that did not fit in the command buffer.
    pub dropped: usize,
}

/// Data parallel frustum culling on the CPU.
#[derive(Debug, Default, Clone)]
pub struct CpuCuller {
    options: CullingOptions,
}

impl CpuCuller {
    pub fn new(options: CullingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CullingOptions {
        &self.options
    }

    /// Culls `objects` against `frustum`, appending a command for every visible one to `output`.
    ///
    /// `output` should have been cleared since the last pass.
    pub fn cull(&self, objects: &[ObjectRecord], frustum: &Frustum, output: &CommandBuffer) -> CullStats {
        self.cull_with_filter(objects, frustum, &NoFilter, output)
    }

    pub fn cull_with_filter<F>(
        &self,
        objects: &[ObjectRecord],
        frustum: &Frustum,
        filter: &F,
        output: &CommandBuffer,
    ) -> CullStats
    where
        F: VisibilityFilter,
    {
        profiling::scope!("CPU Culling");

        let objects = if objects.len() > u32::MAX as usize {
            log::warn!(
                "Culling only the first {} of {} objects, object indices are 32 bit",
                u32::MAX,
                objects.len()
            );
            &objects[..u32::MAX as usize]
        } else {
            objects
        };

        let stats = cull_internal(objects, frustum, filter, output, &self.options);

        if stats.dropped != 0 {
            log::warn!(
                "Command buffer full: dropped {} of {} visible objects (capacity {})",
                stats.dropped,
                stats.visible,
                output.capacity()
            );
        }
        log::trace!("{:?}", stats);

        stats
    }

    /// Culls into a freshly allocated buffer of `capacity` slots and returns the written commands.
    pub fn cull_to_vec(
        &self,
        objects: &[ObjectRecord],
        frustum: &Frustum,
        capacity: usize,
    ) -> Result<(Vec<DrawCommand>, CullStats), CullingError> {
        let output = CommandBuffer::new(capacity)?;
        let stats = self.cull(objects, frustum, &output);
        Ok((output.into_commands(), stats))
    }
}

fn cull_internal<F: VisibilityFilter>(
    objects: &[ObjectRecord],
    frustum: &Frustum,
    filter: &F,
    output: &CommandBuffer,
    options: &CullingOptions,
) -> CullStats {
    let test = options.test;
    // (visible, written) for one object.
    let cull_one = |(idx, object): (usize, &ObjectRecord)| -> (usize, usize) {
        let idx = idx as u32;
        if !is_visible(object, frustum, test) || !filter.keep(idx, object) {
            return (0, 0);
        }
        match output.push(DrawCommand::for_object(idx, object)) {
            Some(_) => (1, 1),
            None => (1, 0),
        }
    };
    let sum = |a: (usize, usize), b: (usize, usize)| (a.0 + b.0, a.1 + b.1);

    let (visible, written) = if options.parallel {
        objects
            .par_iter()
            .enumerate()
            .with_min_len(options.min_parallel_len)
            .map(cull_one)
            .reduce(|| (0, 0), sum)
    } else {
        objects.iter().enumerate().map(cull_one).fold((0, 0), sum)
    };

    CullStats {
        candidates: objects.len(),
        visible,
        written,
        dropped: visible - written,
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use visicull_types::{Aabb, DepthRange, MeshRange, ObjectRecord};

    use super::{is_visible, CpuCuller, CullStats, DistanceFilter, VisibilityFilter};
    use crate::{util::frustum::Frustum, CommandBuffer, CullingOptions, CullingTest};

    fn clip_cube() -> Frustum {
        Frustum::from_matrix(Mat4::IDENTITY, DepthRange::ZeroToOne)
    }

    fn object(center: Vec3, half: f32) -> ObjectRecord {
        ObjectRecord::new(
            Mat4::from_translation(center),
            Aabb::from_center_half_extents(center, Vec3::splat(half)),
            MeshRange {
                index_count: 36,
                first_index: 0,
                vertex_offset: 0,
            },
        )
    }

    #[test]
    fn predicate_is_pure() {
        let frustum = clip_cube();
        let inside = object(Vec3::new(0.0, 0.0, 0.5), 0.1);
        let outside = object(Vec3::new(5.0, 0.0, 0.5), 0.1);
        for _ in 0..3 {
            assert!(is_visible(&inside, &frustum, CullingTest::Aabb));
            assert!(!is_visible(&outside, &frustum, CullingTest::Aabb));
        }
    }

    #[test]
    fn sphere_keeps_what_aabb_keeps() {
        let frustum = clip_cube();
        // Box misses the corner of the volume, its bounding sphere does not.
        let near_corner = object(Vec3::new(1.15, 1.15, 0.5), 0.1);
        assert!(!is_visible(&near_corner, &frustum, CullingTest::Aabb));
        assert!(is_visible(&near_corner, &frustum, CullingTest::Sphere));
    }

    #[test]
    fn mixed_scene() {
        let objects = [
            object(Vec3::new(0.0, 0.0, 0.5), 0.1),
            object(Vec3::new(0.0, 0.0, -5.0), 0.1),
            object(Vec3::new(0.9, 0.9, 0.9), 0.5),
            object(Vec3::new(0.0, 3.0, 0.5), 0.1),
        ];
        for parallel in [true, false] {
            let culler = CpuCuller::new(CullingOptions {
                parallel,
                min_parallel_len: 1,
                ..Default::default()
            });
            let (commands, stats) = culler.cull_to_vec(&objects, &clip_cube(), objects.len()).unwrap();
            assert_eq!(
                stats,
                CullStats {
                    candidates: 4,
                    visible: 2,
                    written: 2,
                    dropped: 0,
                }
            );
            let mut indices: Vec<u32> = commands.iter().map(|c| c.object_index()).collect();
            indices.sort_unstable();
            assert_eq!(indices, vec![0, 2]);
            assert!(commands.iter().all(|c| c.index_count == 36 && c.instance_count == 1));
        }
    }

    #[test]
    fn overflow_is_reported() {
        let objects: Vec<_> = (0..10).map(|_| object(Vec3::new(0.0, 0.0, 0.5), 0.1)).collect();
        let culler = CpuCuller::default();
        let output = CommandBuffer::new(4).unwrap();
        let stats = culler.cull(&objects, &clip_cube(), &output);
        assert_eq!(stats.visible, 10);
        assert_eq!(stats.written, 4);
        assert_eq!(stats.dropped, 6);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn distance_filter() {
        let filter = DistanceFilter {
            origin: Vec3::ZERO,
            max_distance: 10.0,
        };
        assert!(filter.keep(0, &object(Vec3::new(0.0, 0.0, 5.0), 1.0)));
        // Center is past the limit, the near face is not.
        assert!(filter.keep(0, &object(Vec3::new(0.0, 0.0, 10.5), 1.0)));
        assert!(!filter.keep(0, &object(Vec3::new(0.0, 0.0, 12.0), 1.0)));
        // Camera inside the box.
        assert!(filter.keep(0, &object(Vec3::ZERO, 1.0)));
    }

    #[test]
    fn filter_runs_after_frustum() {
        let frustum = Frustum::from_matrix(Mat4::perspective_lh(1.0, 1.0, 0.1, 1000.0), DepthRange::ZeroToOne);
        let objects = [
            object(Vec3::new(0.0, 0.0, 5.0), 1.0),
            object(Vec3::new(0.0, 0.0, 500.0), 1.0),
            object(Vec3::new(0.0, 0.0, -5.0), 1.0),
        ];
        let output = CommandBuffer::new(3).unwrap();
        let stats = CpuCuller::default().cull_with_filter(
            &objects,
            &frustum,
            &DistanceFilter {
                origin: Vec3::ZERO,
                max_distance: 100.0,
            },
            &output,
        );
        assert_eq!(stats.visible, 1);
        assert_eq!(output.get(0).map(|c| c.object_index()), Some(0));
    }
}
