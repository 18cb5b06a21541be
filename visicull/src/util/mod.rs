//! Helpers shared by the CPU and GPU passes.

pub mod frustum;
pub mod math;
