//! Configuration for the resource manager

use crate::{ResError, Result};
use resfile_format::ENTRY_BATCH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of concurrently open container files
pub const DEFAULT_MAX_FILES: u8 = 15;

/// Configuration for the resource manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResConfig {
    /// Number of file slots; file numbers run from 1 to this value
    pub max_files: u8,

    /// Retry failed opens with a case-insensitive path lookup
    pub caseless_fallback: bool,

    /// Directory entries read per batch when no edit state is kept
    pub entry_batch: usize,
}

impl Default for ResConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            caseless_fallback: true,
            entry_batch: ENTRY_BATCH,
        }
    }
}

impl ResConfig {
    /// Load configuration from a JSON file, missing fields take defaults
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ResError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of file slots
    #[must_use]
    pub const fn with_max_files(mut self, max_files: u8) -> Self {
        self.max_files = max_files;
        self
    }

    /// Enable or disable the case-insensitive open fallback
    #[must_use]
    pub const fn with_caseless_fallback(mut self, enable: bool) -> Self {
        self.caseless_fallback = enable;
        self
    }

    /// Set the streaming batch size
    #[must_use]
    pub const fn with_entry_batch(mut self, entries: usize) -> Self {
        self.entry_batch = entries;
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ResError::Config` if a count is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(ResError::Config("max_files must be at least 1".into()));
        }
        if self.entry_batch == 0 {
            return Err(ResError::Config("entry_batch must be at least 1".into()));
        }
        Ok(())
    }
}
