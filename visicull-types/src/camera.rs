use glam::{Mat4, Vec3A};

/// Handedness of the world and view space the camera works in.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Handedness {
    #[default]
    Left,
    Right,
}

/// Clip-space depth convention of a projection matrix.
///
/// Frustum extraction has to use the same convention the projection was built
/// with, otherwise the near and far planes end up in the wrong place.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DepthRange {
    /// Depth in `[0, 1]`, near maps to 0. wgpu, D3D, Metal and Vulkan.
    #[default]
    ZeroToOne,
    /// Depth in `[-1, 1]`, near maps to -1. OpenGL.
    NegativeOneToOne,
    /// Depth in `[0, 1]`, near maps to 1. Usually paired with an infinite far plane.
    ReverseZ,
}

/// Describes how the world should be projected into the camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraProjection {
    Orthographic {
        /// Size assumes the location is at the center of the camera area.
        /// `z` is the depth of the visible volume.
        size: Vec3A,
    },
    Perspective {
        /// Vertical field of view in degrees.
        vfov: f32,
        near: f32,
        far: f32,
    },
    /// Reversed-Z perspective projection with an infinite far plane.
    InfinitePerspective {
        /// Vertical field of view in degrees.
        vfov: f32,
        near: f32,
    },
    Raw {
        matrix: Mat4,
        depth_range: DepthRange,
    },
}

impl Default for CameraProjection {
    fn default() -> Self {
        Self::Perspective {
            vfov: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraProjection {
    pub fn depth_range(&self) -> DepthRange {
        match *self {
            Self::Orthographic { .. } | Self::Perspective { .. } => DepthRange::ZeroToOne,
            Self::InfinitePerspective { .. } => DepthRange::ReverseZ,
            Self::Raw { depth_range, .. } => depth_range,
        }
    }

    pub fn matrix(&self, aspect_ratio: f32, handedness: Handedness) -> Mat4 {
        match (*self, handedness) {
            (Self::Orthographic { size }, Handedness::Left) => {
                let half = size * 0.5;
                Mat4::orthographic_lh(-half.x, half.x, -half.y, half.y, 0.0, size.z)
            }
            (Self::Orthographic { size }, Handedness::Right) => {
                let half = size * 0.5;
                Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, 0.0, size.z)
            }
            (Self::Perspective { vfov, near, far }, Handedness::Left) => {
                Mat4::perspective_lh(vfov.to_radians(), aspect_ratio, near, far)
            }
            (Self::Perspective { vfov, near, far }, Handedness::Right) => {
                Mat4::perspective_rh(vfov.to_radians(), aspect_ratio, near, far)
            }
            (Self::InfinitePerspective { vfov, near }, Handedness::Left) => {
                Mat4::perspective_infinite_reverse_lh(vfov.to_radians(), aspect_ratio, near)
            }
            (Self::InfinitePerspective { vfov, near }, Handedness::Right) => {
                Mat4::perspective_infinite_reverse_rh(vfov.to_radians(), aspect_ratio, near)
            }
            (Self::Raw { matrix, .. }, _) => matrix,
        }
    }
}

/// Describes how the camera should look at the scene.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Camera {
    pub projection: CameraProjection,
    /// View matrix
    pub view: Mat4,
    pub handedness: Handedness,
}

impl Camera {
    pub fn proj(&self, aspect_ratio: f32) -> Mat4 {
        self.projection.matrix(aspect_ratio, self.handedness)
    }

    /// Combined view-projection matrix the frustum planes are extracted from.
    pub fn view_proj(&self, aspect_ratio: f32) -> Mat4 {
        self.proj(aspect_ratio) * self.view
    }

    pub fn depth_range(&self) -> DepthRange {
        self.projection.depth_range()
    }

    /// World space position of the camera.
    pub fn location(&self) -> glam::Vec3 {
        self.view.inverse().w_axis.truncate()
    }
}
