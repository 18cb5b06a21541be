use visicull::types::{DrawCommand, ObjectRecord};
use wgpu::{
    BindGroupLayout, BufferBindingType, CommandEncoder, ComputePassDescriptor, ComputePipeline,
    ComputePipelineDescriptor, Device, ErrorFilter, PipelineLayoutDescriptor, ShaderModuleDescriptor, ShaderSource,
};

use crate::{
    bind_merge::{BindGroupBuilder, BindGroupLayoutBuilder},
    buffers::{CullingBuffers, GpuCullingUniforms},
    shaders::CULL_SHADER,
    PipelineCreationError,
};

/// Invocations per workgroup of the culling shader.
pub const WORKGROUP_SIZE: u32 = 64;

/// Compute pipeline testing every uploaded object against the frustum and
/// compacting the visible ones into the command buffer.
pub struct GpuCuller {
    bgl: BindGroupLayout,
    pipeline: ComputePipeline,
}

impl GpuCuller {
    /// Builds the culling pipeline.
    ///
    /// Shader or pipeline validation failures are caught in an error scope and
    /// returned instead of reaching the device's uncaptured error handler.
    pub async fn new(device: &Device) -> Result<Self, PipelineCreationError> {
        profiling::scope!("GpuCuller::new");

        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);

        let sm = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("cull.wgsl"),
            source: ShaderSource::Wgsl(CULL_SHADER.into()),
        });

        let bgl = BindGroupLayoutBuilder::new()
            .append_buffer(BufferBindingType::Storage { read_only: true }, ObjectRecord::SIZE)
            .append_buffer(
                BufferBindingType::Uniform,
                std::mem::size_of::<GpuCullingUniforms>() as u64,
            )
            .append_buffer(BufferBindingType::Storage { read_only: false }, DrawCommand::SIZE)
            .append_buffer(BufferBindingType::Storage { read_only: false }, 4)
            .build(device, Some("culling bgl"));

        let pll = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("culling pll"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("culling pipeline"),
            layout: Some(&pll),
            module: &sm,
            entry_point: "cs_main",
        });

        let validation = device.pop_error_scope().await;
        let out_of_memory = device.pop_error_scope().await;
        if let Some(error) = validation {
            return Err(PipelineCreationError::Validation {
                description: error.to_string(),
            });
        }
        if out_of_memory.is_some() {
            return Err(PipelineCreationError::OutOfMemory);
        }

        Ok(Self { bgl, pipeline })
    }

    /// Records the culling pass into `encoder`.
    ///
    /// The visible counter is cleared first, so after the pass it holds the
    /// number of commands written, never more than the command capacity.
    /// Nothing is dispatched when no objects were uploaded.
    pub fn cull(&self, device: &Device, encoder: &mut CommandEncoder, buffers: &CullingBuffers) {
        profiling::scope!("GPU Culling");

        encoder.clear_buffer(&buffers.counter, 0, None);

        let workgroups = buffers.dispatch_size();
        if workgroups == 0 {
            return;
        }

        let bg = BindGroupBuilder::new()
            .append_buffer(&buffers.objects)
            .append_buffer(&buffers.uniforms)
            .append_buffer(&buffers.commands)
            .append_buffer(&buffers.counter)
            .build(device, Some("culling bg"), &self.bgl);

        let mut cpass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("culling cpass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &bg, &[]);
        cpass.dispatch_workgroups(workgroups, 1, 1);
        drop(cpass);
    }
}
