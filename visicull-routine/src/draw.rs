use visicull::types::DrawCommand;
use wgpu::{Features, RenderPass};

use crate::CullingBuffers;

/// How the draw stage learns how many commands the culling pass wrote.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndirectDrawMode {
    /// The visible counter is read on the GPU. Needs `MULTI_DRAW_INDIRECT_COUNT`.
    IndirectCount,
    /// The count was read back from a previous frame's pass.
    ReadbackCount(u32),
}

impl IndirectDrawMode {
    /// Picks [`IndirectCount`](Self::IndirectCount) if the device supports it.
    pub fn for_features(features: Features, readback_count: u32) -> Self {
        if features.contains(Features::MULTI_DRAW_INDIRECT_COUNT) {
            Self::IndirectCount
        } else {
            Self::ReadbackCount(readback_count)
        }
    }
}

/// Records the indexed indirect draws for the commands of the last culling pass.
///
/// `features` are the device's features; without `MULTI_DRAW_INDIRECT` a
/// readback count is drawn one command at a time. The index and vertex
/// buffers must already be bound on `rpass`.
pub fn record_indirect_draws<'a>(
    rpass: &mut RenderPass<'a>,
    buffers: &'a CullingBuffers,
    features: Features,
    mode: IndirectDrawMode,
) {
    profiling::scope!("Indirect Draws");

    let capacity = buffers.command_capacity();
    match mode {
        IndirectDrawMode::IndirectCount => {
            rpass.multi_draw_indexed_indirect_count(&buffers.commands, 0, &buffers.counter, 0, capacity);
        }
        IndirectDrawMode::ReadbackCount(count) => {
            let count = count.min(capacity);
            if count == 0 {
                return;
            }
            if features.contains(Features::MULTI_DRAW_INDIRECT) {
                rpass.multi_draw_indexed_indirect(&buffers.commands, 0, count);
            } else {
                for idx in 0..count as u64 {
                    rpass.draw_indexed_indirect(&buffers.commands, idx * DrawCommand::SIZE);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wgpu::Features;

    use super::IndirectDrawMode;

    #[test]
    fn mode_follows_features() {
        assert_eq!(
            IndirectDrawMode::for_features(Features::MULTI_DRAW_INDIRECT_COUNT, 7),
            IndirectDrawMode::IndirectCount
        );
        assert_eq!(
            IndirectDrawMode::for_features(Features::MULTI_DRAW_INDIRECT, 7),
            IndirectDrawMode::ReadbackCount(7)
        );
    }
}
