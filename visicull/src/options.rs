use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CullingError;

/// Bounding volume an object is tested with.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullingTest {
    /// Exact box test. An object is culled only if all eight corners are outside one plane.
    #[default]
    Aabb,
    /// Sphere enclosing the box. Cheaper and more conservative than [`CullingTest::Aabb`].
    Sphere,
}

/// Settings of the CPU culling pass.
///
/// Every field has a default, so a config file only has to name what it changes.
/// Unknown fields are an error rather than silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CullingOptions {
    pub test: CullingTest,
    /// Spread the objects over the rayon thread pool. Runs in a single loop otherwise.
    pub parallel: bool,
    /// Smallest number of objects a rayon task is given.
    pub min_parallel_len: usize,
    /// Slots in the command buffer. `None` sizes it to the object count.
    pub command_capacity: Option<usize>,
}

impl Default for CullingOptions {
    fn default() -> Self {
        Self {
            test: CullingTest::Aabb,
            parallel: true,
            min_parallel_len: 256,
            command_capacity: None,
        }
    }
}

impl CullingOptions {
    pub fn from_json_str(json: &str) -> Result<Self, CullingError> {
        let options: Self = serde_json::from_str(json).map_err(CullingError::OptionsParse)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CullingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CullingError::OptionsIo {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading culling options from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CullingError> {
        if self.min_parallel_len == 0 {
            return Err(CullingError::InvalidOptions("min_parallel_len must be at least 1".into()));
        }
        if let Some(capacity) = self.command_capacity {
            if u32::try_from(capacity).is_err() {
                return Err(CullingError::CapacityOverflow { requested: capacity });
            }
        }
        Ok(())
    }

    /// Command buffer size for a frame with `object_count` candidates.
    pub fn capacity_for(&self, object_count: usize) -> usize {
        self.command_capacity.unwrap_or(object_count)
    }
}
