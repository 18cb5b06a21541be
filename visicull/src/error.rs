use std::path::PathBuf;

use thiserror::Error;

/// Reason why culling state could not be created.
///
/// The pass itself never fails; these are all reported up front, when buffers
/// and options are set up for a frame.
#[derive(Error, Debug)]
pub enum CullingError {
    #[error("Command capacity {requested} does not fit in the 32 bit visible counter")]
    CapacityOverflow { requested: usize },
    #[error("Invalid culling options: {0}")]
    InvalidOptions(String),
    #[error("Failed to parse culling options")]
    OptionsParse(#[source] serde_json::Error),
    #[error("Failed to read culling options from {}", path.display())]
    OptionsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
