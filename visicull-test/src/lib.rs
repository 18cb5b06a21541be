mod runner;
mod scene;

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::test as test_attr;
#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen_test::wasm_bindgen_test as test_attr;

pub use runner::GpuRunner;
pub use scene::{Scene, SceneBuilder};

use visicull::types::DrawCommand;

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sorted object indices referenced by `commands`.
pub fn visible_set(commands: &[DrawCommand]) -> Vec<u32> {
    let mut indices: Vec<u32> = commands.iter().map(DrawCommand::object_index).collect();
    indices.sort_unstable();
    indices
}

/// True if no object index appears twice.
pub fn all_unique(commands: &[DrawCommand]) -> bool {
    let indices = visible_set(commands);
    indices.windows(2).all(|pair| pair[0] != pair[1])
}
