//! Configuration for lotstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Default slot width in bytes (excluding the line terminator)
pub const DEFAULT_RECORD_WIDTH: usize = 500;

/// Main configuration for a lotstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all table files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── models.txt / models_index.txt
    ///     ├── cars.txt   / cars_index.txt
    ///     └── sales.txt  / sales_index.txt
    pub data_dir: PathBuf,

    /// Fixed width of every record slot in bytes, before the newline
    pub record_width: usize,

    /// fsync every record and index rewrite before returning
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lotstore_data"),
            record_width: DEFAULT_RECORD_WIDTH,
            sync_writes: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.record_width == 0 {
            return Err(StoreError::Config(
                "record_width must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all table files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the record slot width (in bytes)
    pub fn record_width(mut self, width: usize) -> Self {
        self.config.record_width = width;
        self
    }

    /// Enable or disable fsync after each rewrite
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
