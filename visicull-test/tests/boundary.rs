use anyhow::Result;
use glam::{Mat4, Vec3};
use visicull::{
    types::{Aabb, DepthRange, MeshRange, ObjectRecord},
    util::frustum::Frustum,
    CpuCuller, CullingOptions, CullingTest,
};
use visicull_test::{init_logging, test_attr, visible_set, GpuRunner};

fn clip_cube() -> Frustum {
    Frustum::from_matrix(Mat4::IDENTITY, DepthRange::ZeroToOne)
}

fn record(min: Vec3, max: Vec3) -> ObjectRecord {
    ObjectRecord::new(
        Mat4::IDENTITY,
        Aabb::new(min, max),
        MeshRange {
            index_count: 3,
            first_index: 0,
            vertex_offset: 0,
        },
    )
}

/// Boxes touching each of the six planes from the outside, then the same boxes nudged out.
fn touching_and_outside() -> (Vec<ObjectRecord>, Vec<ObjectRecord>) {
    let touching = vec![
        record(Vec3::new(-2.0, -0.5, 0.2), Vec3::new(-1.0, 0.5, 0.8)),
        record(Vec3::new(1.0, -0.5, 0.2), Vec3::new(2.0, 0.5, 0.8)),
        record(Vec3::new(-0.5, -2.0, 0.2), Vec3::new(0.5, -1.0, 0.8)),
        record(Vec3::new(-0.5, 1.0, 0.2), Vec3::new(0.5, 2.0, 0.8)),
        record(Vec3::new(-0.5, -0.5, -1.0), Vec3::new(0.5, 0.5, 0.0)),
        record(Vec3::new(-0.5, -0.5, 1.0), Vec3::new(0.5, 0.5, 2.0)),
    ];
    let offsets = [
        Vec3::new(-0.001, 0.0, 0.0),
        Vec3::new(0.001, 0.0, 0.0),
        Vec3::new(0.0, -0.001, 0.0),
        Vec3::new(0.0, 0.001, 0.0),
        Vec3::new(0.0, 0.0, -0.001),
        Vec3::new(0.0, 0.0, 0.001),
    ];
    let outside = touching
        .iter()
        .zip(offsets)
        .map(|(object, offset)| record(object.aabb_min + offset, object.aabb_max + offset))
        .collect();
    (touching, outside)
}

#[test]
pub fn touching_a_plane_is_visible() -> Result<()> {
    init_logging();
    let (touching, outside) = touching_and_outside();
    let culler = CpuCuller::default();

    let (commands, _) = culler.cull_to_vec(&touching, &clip_cube(), touching.len())?;
    assert_eq!(visible_set(&commands), [0, 1, 2, 3, 4, 5]);

    let (commands, _) = culler.cull_to_vec(&outside, &clip_cube(), outside.len())?;
    assert!(commands.is_empty());
    Ok(())
}

#[test]
pub fn corner_on_plane_is_visible() -> Result<()> {
    init_logging();
    // Only the (-1, -1, 0) corner lies on the frustum, the rest of the box is outside three planes.
    let corner = [record(Vec3::new(-2.0, -2.0, -1.0), Vec3::new(-1.0, -1.0, 0.0))];

    let (commands, _) = CpuCuller::default().cull_to_vec(&corner, &clip_cube(), 1)?;
    assert_eq!(commands.len(), 1);

    let sphere = CpuCuller::new(CullingOptions {
        test: CullingTest::Sphere,
        ..Default::default()
    });
    let (commands, _) = sphere.cull_to_vec(&corner, &clip_cube(), 1)?;
    assert_eq!(commands.len(), 1);
    Ok(())
}

#[test_attr]
pub async fn gpu_touching_a_plane_is_visible() -> Result<()> {
    init_logging();
    let Ok(runner) = GpuRunner::new().await else {
        return Ok(());
    };
    let (touching, outside) = touching_and_outside();

    let result = runner.cull(&touching, &clip_cube(), touching.len()).await?;
    assert_eq!(visible_set(&result.commands), [0, 1, 2, 3, 4, 5]);

    let result = runner.cull(&outside, &clip_cube(), outside.len()).await?;
    assert_eq!(result.count, 0);
    Ok(())
}
