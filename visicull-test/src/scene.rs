use glam::{Mat4, Vec3};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use visicull::{
    types::{Aabb, Camera, CameraProjection, Handedness, MeshRange, ObjectRecord},
    util::frustum::Frustum,
};

const CUBE_INDEX_COUNT: u32 = 36;

/// A camera and a set of candidates with known visibility.
pub struct Scene {
    pub camera: Camera,
    pub aspect_ratio: f32,
    pub objects: Vec<ObjectRecord>,
    /// Whether each object in `objects` is entirely inside the frustum. Objects
    /// that are not are entirely behind the camera.
    pub expected_visible: Vec<bool>,
}

impl Scene {
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.camera.view_proj(self.aspect_ratio), self.camera.depth_range())
    }

    /// Sorted indices of the objects expected to be visible.
    pub fn expected_set(&self) -> Vec<u32> {
        self.expected_visible
            .iter()
            .enumerate()
            .filter_map(|(idx, &visible)| visible.then_some(idx as u32))
            .collect()
    }
}

/// Builds seeded random scenes around a left handed camera at the origin looking down +Z.
pub struct SceneBuilder {
    rng: StdRng,
    camera: Camera,
    aspect_ratio: f32,
    half_fov_tan: f32,
    objects: Vec<(ObjectRecord, bool)>,
}

impl SceneBuilder {
    pub fn new(seed: u64) -> Self {
        let vfov: f32 = 60.0;
        Self {
            rng: StdRng::seed_from_u64(seed),
            camera: Camera {
                projection: CameraProjection::Perspective {
                    vfov,
                    near: 0.1,
                    far: 1000.0,
                },
                view: Mat4::IDENTITY,
                handedness: Handedness::Left,
            },
            aspect_ratio: 16.0 / 9.0,
            half_fov_tan: (vfov.to_radians() * 0.5).tan(),
            objects: Vec::new(),
        }
    }

    fn push(&mut self, center: Vec3, half_extent: f32, visible: bool) {
        let first_index = self.objects.len() as u32 * CUBE_INDEX_COUNT;
        let record = ObjectRecord::new(
            Mat4::from_translation(center),
            Aabb::from_center_half_extents(center, Vec3::splat(half_extent)),
            MeshRange {
                index_count: CUBE_INDEX_COUNT,
                first_index,
                vertex_offset: 0,
            },
        );
        self.objects.push((record, visible));
    }

    /// Adds `count` boxes that are strictly inside the frustum.
    pub fn inside(mut self, count: usize) -> Self {
        for _ in 0..count {
            let depth = self.rng.gen_range(1.0..500.0_f32);
            let half_height = depth * self.half_fov_tan;
            let half_width = half_height * self.aspect_ratio;
            let x = self.rng.gen_range(-0.8..0.8) * half_width;
            let y = self.rng.gen_range(-0.8..0.8) * half_height;
            // A tenth of the margin left to the side planes.
            let half_extent = 0.02 * half_height;
            self.push(Vec3::new(x, y, depth), half_extent, true);
        }
        self
    }

    /// Adds `count` boxes that are strictly behind the near plane.
    pub fn behind(mut self, count: usize) -> Self {
        for _ in 0..count {
            let depth = self.rng.gen_range(-500.0..-1.0_f32);
            let x = self.rng.gen_range(-100.0..100.0);
            let y = self.rng.gen_range(-100.0..100.0);
            let half_extent = self.rng.gen_range(0.01..0.5);
            self.push(Vec3::new(x, y, depth), half_extent, false);
        }
        self
    }

    /// Randomizes the order of everything added so far.
    pub fn shuffled(mut self) -> Self {
        self.objects.shuffle(&mut self.rng);
        self
    }

    pub fn build(self) -> Scene {
        let (objects, expected_visible) = self.objects.into_iter().unzip();
        Scene {
            camera: self.camera,
            aspect_ratio: self.aspect_ratio,
            objects,
            expected_visible,
        }
    }
}
