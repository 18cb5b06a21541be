use anyhow::Result;
use visicull::CpuCuller;
use visicull_test::{all_unique, init_logging, test_attr, visible_set, GpuRunner, SceneBuilder};

#[test_attr]
pub async fn gpu_matches_cpu() -> Result<()> {
    init_logging();
    let Ok(runner) = GpuRunner::new().await else {
        return Ok(());
    };

    let scene = SceneBuilder::new(11).inside(3000).behind(3000).shuffled().build();
    let frustum = scene.frustum();

    let (cpu, _) = CpuCuller::default().cull_to_vec(&scene.objects, &frustum, scene.objects.len())?;
    let gpu = runner.cull(&scene.objects, &frustum, scene.objects.len()).await?;

    assert_eq!(gpu.count as usize, gpu.commands.len());
    assert_eq!(visible_set(&gpu.commands), visible_set(&cpu));
    assert_eq!(visible_set(&gpu.commands), scene.expected_set());
    for command in &gpu.commands {
        let object = &scene.objects[command.object_index() as usize];
        assert_eq!(command.first_index, object.first_index);
        assert_eq!(command.index_count, object.index_count);
    }
    Ok(())
}

#[test_attr]
pub async fn gpu_clamps_to_capacity() -> Result<()> {
    init_logging();
    let Ok(runner) = GpuRunner::new().await else {
        return Ok(());
    };

    let scene = SceneBuilder::new(12).inside(5000).build();
    let result = runner.cull(&scene.objects, &scene.frustum(), 1000).await?;

    assert_eq!(result.count, 1000);
    assert_eq!(result.commands.len(), 1000);
    assert!(all_unique(&result.commands));
    Ok(())
}

#[test_attr]
pub async fn gpu_all_behind_culls_everything() -> Result<()> {
    init_logging();
    let Ok(runner) = GpuRunner::new().await else {
        return Ok(());
    };

    let scene = SceneBuilder::new(13).behind(2000).build();
    let result = runner.cull(&scene.objects, &scene.frustum(), scene.objects.len()).await?;
    assert_eq!(result.count, 0);
    Ok(())
}
