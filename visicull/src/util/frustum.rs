//! Frustums, planes and bounding spheres.
//!
//! Plane extraction follows <https://www.gamedevs.org/uploads/fast-extraction-viewing-frustum-planes-from-world-view-projection-matrix.pdf>.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};
use visicull_types::{Aabb, DepthRange};

/// Represents a point in space and a radius from that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}
impl BoundingSphere {
    /// Smallest sphere centered on the box that still encloses all of it.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.half_extents().length(),
        }
    }
}

/// Represents a plane as a vec4 (or vec3 + f32)
///
/// Points with a non-negative [`distance`](Plane::distance) are on the inside.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Plane {
    pub abc: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            abc: Vec3::new(a, b, c),
            d,
        }
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self { abc: v.xyz(), d: v.w }
    }

    pub fn to_vec4(self) -> Vec4 {
        self.abc.extend(self.d)
    }

    /// Scales the plane so the normal has unit length.
    ///
    /// A plane without a normal (the far plane of an infinite projection)
    /// becomes a plane every point is inside of, or outside of if `d` is negative.
    pub fn normalize(mut self) -> Self {
        let mag = self.abc.length();
        if mag <= f32::EPSILON {
            return Self {
                abc: Vec3::ZERO,
                d: if self.d >= 0.0 { 1.0 } else { -1.0 },
            };
        }

        self.abc /= mag;
        self.d /= mag;

        self
    }

    pub fn distance(self, point: Vec3) -> f32 {
        self.abc.dot(point) + self.d
    }

    /// Largest signed distance of any of the box's eight corners.
    ///
    /// This is the distance of the corner furthest along the normal, so a
    /// negative result means the whole box is outside.
    pub fn max_distance(self, aabb: &Aabb) -> f32 {
        let positive = Vec3::select(self.abc.cmpge(Vec3::ZERO), aabb.max, aabb.min);
        self.distance(positive)
    }
}

/// A frustum composed of the six clip planes of a view-projection matrix.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;

    /// Extracts the planes of `view_proj`.
    ///
    /// glam matrices are column major, so the plane equations come from the
    /// matrix rows. `depth_range` must be the convention the projection was
    /// built with.
    pub fn from_matrix(view_proj: Mat4, depth_range: DepthRange) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let (near, far) = match depth_range {
            DepthRange::ZeroToOne => (r2, r3 - r2),
            DepthRange::NegativeOneToOne => (r3 + r2, r3 - r2),
            // near and far get flipped.
            DepthRange::ReverseZ => (r3 - r2, r2),
        };

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, near, far].map(|v| Plane::from_vec4(v).normalize());

        Self { planes }
    }

    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Determines if the point is inside or on the boundary of the frustum.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance(point) >= 0.0)
    }

    /// Determines if the sphere is at all inside the frustum.
    pub fn contains_sphere(&self, sphere: BoundingSphere) -> bool {
        let neg_radius = -sphere.radius;

        self.planes
            .iter()
            .all(|plane| plane.distance(sphere.center) >= neg_radius)
    }

    /// Determines if any part of the box is inside the frustum.
    ///
    /// A box is only rejected when all eight corners are strictly outside a
    /// single plane. Touching a plane counts as inside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| plane.max_distance(aabb) >= 0.0)
    }
}
