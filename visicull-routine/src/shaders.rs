/// WGSL source of the culling compute shader. Entry point is `cs_main`.
pub const CULL_SHADER: &str = include_str!("../shaders/cull.wgsl");
