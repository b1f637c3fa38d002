//! VM configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gas::ProtocolVersion;

/// Default limit on deployed code size
pub const DEFAULT_MAX_CODE_SIZE: usize = 24576;
/// Default limit on nested call depth
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Errors loading [`VmParams`]
#[derive(Debug, Error)]
pub enum ParamsError {
    /// File could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid params JSON
    #[error("invalid params: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunable VM parameters.
///
/// Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmParams {
    /// Version in force when no upgrade height applies
    pub protocol_version: ProtocolVersion,
    /// Height from which V1 is active; below it V0 applies
    pub v1_height: Option<u64>,
    /// Largest deployable code, enforced from V1
    pub max_code_size: usize,
    /// Maximum nesting of calls and creations
    pub max_call_depth: usize,
    /// Record KECCAK256 preimages in the state
    pub record_preimages: bool,
}

impl Default for VmParams {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::default(),
            v1_height: None,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            record_preimages: false,
        }
    }
}

impl VmParams {
    /// Parameters pinned to one version
    pub fn with_version(version: ProtocolVersion) -> Self {
        Self {
            protocol_version: version,
            ..Self::default()
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Protocol version for a block height
    pub fn version_at(&self, height: u64) -> ProtocolVersion {
        match self.v1_height {
            Some(v1) if height >= v1 => ProtocolVersion::V1,
            Some(_) => ProtocolVersion::V0,
            None => self.protocol_version,
        }
    }
}
