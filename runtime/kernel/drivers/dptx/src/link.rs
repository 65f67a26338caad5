// Licensed under the Apache-2.0 license

use crate::error::DpTxError;

/// Main link rate, encoded as the LINK_BW_SET code (units of 270 Mbps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    not(target_arch = "riscv32"),
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
#[repr(u8)]
pub enum LinkRate {
    /// 1.62 Gbps
    Rbr = 0x06,
    /// 2.70 Gbps
    Hbr = 0x0A,
    /// 5.40 Gbps
    Hbr2 = 0x14,
    /// 8.10 Gbps
    Hbr3 = 0x1E,
}

impl LinkRate {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Per-lane bit rate in Hz.
    pub fn bit_rate_hz(self) -> u64 {
        match self {
            LinkRate::Rbr => 1_620_000_000,
            LinkRate::Hbr => 2_700_000_000,
            LinkRate::Hbr2 => 5_400_000_000,
            LinkRate::Hbr3 => 8_100_000_000,
        }
    }
}

impl TryFrom<u8> for LinkRate {
    type Error = DpTxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x06 => Ok(LinkRate::Rbr),
            0x0A => Ok(LinkRate::Hbr),
            0x14 => Ok(LinkRate::Hbr2),
            0x1E => Ok(LinkRate::Hbr3),
            _ => Err(DpTxError::InvalidParameter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    not(target_arch = "riscv32"),
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "u8", into = "u8")
)]
#[repr(u8)]
pub enum LaneCount {
    One = 1,
    Two = 2,
    Four = 4,
}

impl LaneCount {
    pub fn count(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LaneCount {
    type Error = DpTxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LaneCount::One),
            2 => Ok(LaneCount::Two),
            4 => Ok(LaneCount::Four),
            _ => Err(DpTxError::InvalidParameter),
        }
    }
}

impl From<LaneCount> for u8 {
    fn from(lanes: LaneCount) -> u8 {
        lanes as u8
    }
}

/// Negotiated main link parameters.
///
/// `max_*` hold the common maximum of the sink and this transmitter, filled
/// in by the capability query. After a successful training the active values
/// never exceed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub lane_count: LaneCount,
    pub link_rate: LinkRate,
    pub max_lane_count: LaneCount,
    pub max_link_rate: LinkRate,
    pub vs_level: u8,
    pub pe_level: u8,
}

impl LinkConfig {
    pub fn new(lane_count: LaneCount, link_rate: LinkRate) -> Self {
        Self {
            lane_count,
            link_rate,
            max_lane_count: lane_count,
            max_link_rate: link_rate,
            vs_level: 0,
            pe_level: 0,
        }
    }

    /// Raw link bandwidth: lanes x rate code x 27.
    pub fn bandwidth(&self) -> u64 {
        self.lane_count.count() as u64 * self.link_rate.code() as u64 * 27
    }

    pub fn within_maxima(&self) -> bool {
        self.lane_count <= self.max_lane_count && self.link_rate <= self.max_link_rate
    }

    pub fn use_maximum(&mut self) {
        self.lane_count = self.max_lane_count;
        self.link_rate = self.max_link_rate;
    }

    /// True if `self` runs fewer lanes or a lower rate than `before`.
    pub fn is_downshift_from(&self, before: &LinkConfig) -> bool {
        self.lane_count < before.lane_count || self.link_rate < before.link_rate
    }
}
