use visicull::types::DrawCommand;
use wgpu::{BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Device, Maintain, MapMode, Queue};

use crate::{CullingBuffers, ReadbackError};

const COUNTER_BYTES: u64 = 4;

/// Result of a culling pass, copied back to the CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CullReadback {
    /// Final value of the visible counter.
    pub count: u32,
    /// The dense command prefix, `count` commands long.
    pub commands: Vec<DrawCommand>,
}

/// Copies the counter and the written commands to the CPU.
///
/// Submits its own copy after any work already queued and blocks the device
/// until that copy is done, so this is for tests and tools, not per-frame use.
pub async fn read_back(device: &Device, queue: &Queue, buffers: &CullingBuffers) -> Result<CullReadback, ReadbackError> {
    profiling::scope!("Culling Readback");

    let capacity = buffers.command_capacity();
    let command_bytes = capacity as u64 * DrawCommand::SIZE;

    let staging = device.create_buffer(&BufferDescriptor {
        label: Some("culling readback staging"),
        size: COUNTER_BYTES + command_bytes,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
        label: Some("culling readback encoder"),
    });
    encoder.copy_buffer_to_buffer(&buffers.counter, 0, &staging, 0, COUNTER_BYTES);
    if command_bytes != 0 {
        encoder.copy_buffer_to_buffer(&buffers.commands, 0, &staging, COUNTER_BYTES, command_bytes);
    }
    let submit_index = queue.submit(Some(encoder.finish()));

    let (sender, receiver) = flume::bounded(1);
    staging.slice(..).map_async(MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(Maintain::WaitForSubmissionIndex(submit_index));

    receiver
        .recv_async()
        .await
        .map_err(|_| ReadbackError::CallbackDropped)?
        .map_err(ReadbackError::MapFailed)?;

    let readback = {
        let mapping = staging.slice(..).get_mapped_range();
        let (counter, commands) = mapping.split_at(COUNTER_BYTES as usize);

        let raw_count: u32 = bytemuck::pod_read_unaligned(counter);
        if raw_count > capacity {
            log::error!("Visible counter {} passed the command capacity {}", raw_count, capacity);
        }
        let count = raw_count.min(capacity);

        let commands = commands
            .chunks_exact(DrawCommand::SIZE as usize)
            .take(count as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        CullReadback { count, commands }
    };
    staging.unmap();

    log::trace!("Read back {} draw commands", readback.count);

    Ok(readback)
}
