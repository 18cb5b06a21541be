//! Type declarations for the visicull culling crates.
//!
//! This is reexported in the visicull crate proper and contains every record
//! that crosses the CPU/GPU boundary. All `#[repr(C)]` types here have the
//! exact byte layout of their WGSL counterparts in `visicull-routine`.

use bytemuck::{Pod, Zeroable};
/// Reexport of the glam version visicull is using.
pub use glam;
use glam::{Mat4, Vec3, Vec3A};

mod camera;
pub use camera::*;

/// Axis aligned bounding box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners. The corners may be given in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centered on `center` that extends `half_extents` in each direction.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing all the given points. Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = Vec3A::from(*points.first()?);

        let (min, max) = points.iter().skip(1).fold((first, first), |(min, max), &pos| {
            let pos = Vec3A::from(pos);
            (min.min(pos), max.max(pos))
        });

        Some(Self {
            min: min.into(),
            max: max.into(),
        })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// All eight corners. Bit 0 of the index selects x, bit 1 y, bit 2 z; a set bit picks `max`.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Box enclosing this box after it has been moved by `transform`.
    pub fn transformed(&self, transform: Mat4) -> Self {
        let corners = self.corners().map(|c| transform.transform_point3(c));
        // Eight corners, never empty.
        Self::from_points(&corners).unwrap_or(*self)
    }
}

/// Range of the shared index buffer an object is drawn from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct MeshRange {
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index in the index buffer.
    pub first_index: u32,
    /// Value added to each index before reading the vertex buffer.
    pub vertex_offset: i32,
}

/// One draw candidate fed to the culling pass.
///
/// Immutable for the duration of a dispatch. The bounding box is in world space.
///
/// Each visible record becomes one draw of a single instance: the instance
/// index of that draw is the record's position in the candidate array.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectRecord {
    pub transform: Mat4,
    pub aabb_min: Vec3,
    pub index_count: u32,
    pub aabb_max: Vec3,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub _padding: [u32; 3],
}

impl ObjectRecord {
    /// Size of one record in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Creates a record from a world space bounding box.
    pub fn new(transform: Mat4, world_aabb: Aabb, mesh: MeshRange) -> Self {
        Self {
            transform,
            aabb_min: world_aabb.min,
            index_count: mesh.index_count,
            aabb_max: world_aabb.max,
            first_index: mesh.first_index,
            vertex_offset: mesh.vertex_offset,
            _padding: [0; 3],
        }
    }

    /// Creates a record from a mesh-local bounding box, moving it into world space with `transform`.
    pub fn from_local(transform: Mat4, local_aabb: Aabb, mesh: MeshRange) -> Self {
        Self::new(transform, local_aabb.transformed(transform), mesh)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: self.aabb_min,
            max: self.aabb_max,
        }
    }

    pub fn mesh(&self) -> MeshRange {
        MeshRange {
            index_count: self.index_count,
            first_index: self.first_index,
            vertex_offset: self.vertex_offset,
        }
    }
}

/// Arguments of a single indexed indirect draw.
///
/// Matches the `DrawIndexedIndirect` layout every wgpu backend consumes, so a
/// slice of these can be handed to the indirect draw stage as-is.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct DrawCommand {
    /// Number of indices (vertices) to draw.
    pub index_count: u32,
    /// Always 1. A wider range would overlap the next object's instance index.
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// Index of the object in the candidate array.
    pub first_instance: u32,
}

impl DrawCommand {
    /// Size of one command in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// The command drawing `object`, which sits at `object_index` in the candidate array.
    pub fn for_object(object_index: u32, object: &ObjectRecord) -> Self {
        Self {
            index_count: object.index_count,
            instance_count: 1,
            first_index: object.first_index,
            vertex_offset: object.vertex_offset,
            first_instance: object_index,
        }
    }

    /// Index of the object this command draws.
    pub fn object_index(&self) -> u32 {
        self.first_instance
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use crate::{Aabb, DrawCommand, MeshRange, ObjectRecord};

    #[test]
    fn record_layouts() {
        assert_eq!(ObjectRecord::SIZE, 112);
        assert_eq!(std::mem::size_of::<DrawCommand>(), 20);
        assert_eq!(DrawCommand::SIZE, 20);
    }

    #[test]
    fn aabb_corners_cover_both_extremes() {
        let aabb = Aabb::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, -2.0, -3.0));
        let corners = aabb.corners();
        assert_eq!(corners[0], Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(corners[7], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Aabb::from_points(&corners), Some(aabb));
        assert_eq!(Aabb::from_points(&[]), None);
    }

    #[test]
    fn local_aabb_moves_with_transform() {
        let local = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let record = ObjectRecord::from_local(
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            local,
            MeshRange::default(),
        );
        assert_eq!(record.aabb().center(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(record.aabb().half_extents(), Vec3::ONE);
    }

    #[test]
    fn command_references_object() {
        let mesh = MeshRange {
            index_count: 36,
            first_index: 72,
            vertex_offset: -4,
        };
        let record = ObjectRecord::new(Mat4::IDENTITY, Aabb::new(Vec3::ZERO, Vec3::ONE), mesh);
        let command = DrawCommand::for_object(9, &record);
        assert_eq!(
            command,
            DrawCommand {
                index_count: 36,
                instance_count: 1,
                first_index: 72,
                vertex_offset: -4,
                first_instance: 9,
            }
        );
        assert_eq!(command.object_index(), 9);
        assert_eq!(record.mesh(), mesh);
    }

    #[test]
    fn neighbouring_commands_do_not_share_instances() {
        let record = ObjectRecord::new(Mat4::IDENTITY, Aabb::new(Vec3::ZERO, Vec3::ONE), MeshRange::default());
        let commands: Vec<DrawCommand> = (0..4).map(|i| DrawCommand::for_object(i, &record)).collect();
        for pair in commands.windows(2) {
            let end = pair[0].first_instance + pair[0].instance_count;
            assert!(end <= pair[1].first_instance);
        }
    }
}
