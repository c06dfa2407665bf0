#[cfg(test)]
pub mod config_test;

use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drivers::apple_spi::driver::{TrackpadInfo, TICKS_PER_UNIT};

/// Represents all possible errors loading a [TrackpadConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Configuration of a single trackpad device
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct TrackpadConfig {
    pub name: String,
    /// Sensor coordinate range used to normalize contacts
    pub dimensions: TrackpadInfo,
    /// Performance counter ticks per report scan time unit
    pub ticks_per_unit: u64,
    /// Maximum number of hardware reads that may be in flight at once
    pub buffer_pool_size: usize,
    /// Size of each hardware read buffer in bytes
    pub packet_buffer_size: usize,
    /// Depth of the device command channel
    pub command_queue_size: usize,
}

impl Default for TrackpadConfig {
    fn default() -> Self {
        Self {
            name: "Apple SPI Trackpad".to_string(),
            dimensions: TrackpadInfo::default(),
            ticks_per_unit: TICKS_PER_UNIT,
            buffer_pool_size: 16,
            packet_buffer_size: 512,
            command_queue_size: 2048,
        }
    }
}

impl TrackpadConfig {
    /// Load a [TrackpadConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<TrackpadConfig, LoadError> {
        let config: TrackpadConfig = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [TrackpadConfig] from the given YAML file
    pub fn from_yaml_file<P>(path: P) -> Result<TrackpadConfig, LoadError>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        let config: TrackpadConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }
}
