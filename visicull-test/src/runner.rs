use anyhow::{Context, Result};
use visicull::{types::ObjectRecord, util::frustum::Frustum};
use visicull_routine::{create_iad, read_back, CullReadback, CullingBuffers, GpuCuller, InstanceAdapterDevice};

/// Runs culling passes on a real device and reads the results back.
pub struct GpuRunner {
    pub iad: InstanceAdapterDevice,
    culler: GpuCuller,
}

impl GpuRunner {
    /// Fails when no usable adapter exists; tests return early in that case.
    pub async fn new() -> Result<Self> {
        let iad = create_iad(None, None)
            .await
            .context("InstanceAdapterDevice creation failed")?;
        let culler = GpuCuller::new(&iad.device)
            .await
            .context("Failed to build the culling pipeline")?;
        Ok(Self { iad, culler })
    }

    pub async fn cull(&self, objects: &[ObjectRecord], frustum: &Frustum, capacity: usize) -> Result<CullReadback> {
        let device = &self.iad.device;
        let mut buffers =
            CullingBuffers::new(device, objects.len().max(1), capacity).context("Failed to create culling buffers")?;
        buffers
            .upload(&self.iad.queue, objects, frustum)
            .context("Failed to upload objects")?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test culling encoder"),
        });
        self.culler.cull(device, &mut encoder, &buffers);
        self.iad.queue.submit(Some(encoder.finish()));

        read_back(device, &self.iad.queue, &buffers)
            .await
            .context("Failed to read back culling results")
    }
}
