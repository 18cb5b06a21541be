//! Frustum culling with atomic draw command compaction.
//!
//! Every candidate object is tested on its own against the camera frustum.
//! Visible objects reserve a slot from a shared [`VisibleCounter`] and write
//! one [`DrawCommand`](types::DrawCommand) into it, so the output is a dense
//! array whose length is the final counter value. The same algorithm runs on
//! the GPU in `visicull-routine`; this crate is the CPU side and the reference
//! the GPU pass is checked against.
//!
//! ```
//! use visicull::{types::glam::Mat4, types::DepthRange, util::frustum::Frustum, CpuCuller};
//!
//! let frustum = Frustum::from_matrix(Mat4::IDENTITY, DepthRange::ZeroToOne);
//! let (commands, stats) = CpuCuller::default().cull_to_vec(&[], &frustum, 16).unwrap();
//! assert!(commands.is_empty());
//! assert_eq!(stats.visible, 0);
//! ```

mod commands;
mod counter;
mod culler;
mod error;
mod options;
pub mod util;

pub use commands::*;
pub use counter::*;
pub use culler::*;
pub use error::*;
pub use options::*;

/// Reexport of the visicull-types crate.
pub use visicull_types as types;
