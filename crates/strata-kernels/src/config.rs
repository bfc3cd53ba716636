//! Engine-wide kernel settings.

use serde::{Deserialize, Serialize};

/// Default element count at which flat kernels switch to rayon.
pub const DEFAULT_PAR_THRESHOLD: usize = 32 * 1024;

/// Settings for [`CpuEngine`](crate::CpuEngine).
///
/// Missing fields take their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Minimum buffer length before flat kernels run in parallel.
    /// `usize::MAX` keeps every kernel sequential.
    pub par_threshold: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            par_threshold: DEFAULT_PAR_THRESHOLD,
        }
    }
}

impl KernelConfig {
    /// A config that never parallelizes.
    pub fn sequential() -> Self {
        Self {
            par_threshold: usize::MAX,
        }
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
