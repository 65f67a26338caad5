// Licensed under the Apache-2.0 license

use crate::link::{LaneCount, LinkRate};
use crate::stream::{Bpc, MAX_STREAMS};
use thiserror::Error;

#[cfg(not(target_arch = "riscv32"))]
use serde::{Deserialize, Serialize};

/// Build-time parameters of the transmitter core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    not(target_arch = "riscv32"),
    derive(Deserialize, Serialize),
    serde(default)
)]
pub struct DpTxCoreConfig {
    pub max_lane_count: LaneCount,
    pub max_link_rate: LinkRate,
    pub max_bits_per_color: Bpc,
    pub mst_supported: bool,
    pub num_mst_streams: u8,
    /// Payload datapath width in pixels per clock, 2 or 4.
    pub payload_data_width: u8,
    pub audio_enable: bool,
}

impl Default for DpTxCoreConfig {
    fn default() -> Self {
        Self {
            max_lane_count: LaneCount::Four,
            max_link_rate: LinkRate::Hbr3,
            max_bits_per_color: Bpc::Sixteen,
            mst_supported: true,
            num_mst_streams: MAX_STREAMS as u8,
            payload_data_width: 4,
            audio_enable: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("num_mst_streams must be between 1 and 4, got {0}")]
    InvalidStreamCount(u8),
    #[error("payload_data_width must be 2 or 4, got {0}")]
    InvalidPayloadWidth(u8),
    #[cfg(not(target_arch = "riscv32"))]
    #[error("failed to parse core configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[cfg(not(target_arch = "riscv32"))]
    #[error("failed to read core configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl DpTxCoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_mst_streams == 0 || self.num_mst_streams as usize > MAX_STREAMS {
            return Err(ConfigError::InvalidStreamCount(self.num_mst_streams));
        }
        if !matches!(self.payload_data_width, 2 | 4) {
            return Err(ConfigError::InvalidPayloadWidth(self.payload_data_width));
        }
        Ok(())
    }

    /// Streams usable in MST mode; a core without MST drives a single stream.
    pub fn mst_stream_limit(&self) -> u8 {
        if self.mst_supported {
            self.num_mst_streams
        } else {
            1
        }
    }
}

#[cfg(not(target_arch = "riscv32"))]
impl DpTxCoreConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DpTxCoreConfig = toml::de::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
