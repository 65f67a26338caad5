// Licensed under the Apache-2.0 license

use crate::error::DpTxError;
use video_common::msa::DerivedMsa;
use video_common::{VideoMode, VideoTiming};

pub const MAX_STREAMS: usize = 4;

/// Bits per color component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    not(target_arch = "riscv32"),
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "u8", into = "u8")
)]
#[repr(u8)]
pub enum Bpc {
    Six = 6,
    Eight = 8,
    Ten = 10,
    Twelve = 12,
    Sixteen = 16,
}

impl Bpc {
    pub fn bits(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for Bpc {
    type Error = DpTxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(Bpc::Six),
            8 => Ok(Bpc::Eight),
            10 => Ok(Bpc::Ten),
            12 => Ok(Bpc::Twelve),
            16 => Ok(Bpc::Sixteen),
            _ => Err(DpTxError::InvalidParameter),
        }
    }
}

impl From<Bpc> for u8 {
    fn from(bpc: Bpc) -> u8 {
        bpc as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComponentFormat {
    #[default]
    Rgb,
    YCbCr422,
    YCbCr444,
    YCbCr420,
}

/// Bits per pixel carried on the link for a color format and depth.
pub fn bits_per_pixel(format: ComponentFormat, bpc: Bpc) -> u32 {
    match format {
        ComponentFormat::YCbCr422 => bpc.bits() * 2,
        ComponentFormat::YCbCr420 => bpc.bits() * 15 / 10,
        ComponentFormat::Rgb | ComponentFormat::YCbCr444 => bpc.bits() * 3,
    }
}

/// Stream slot number, 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId(u8);

impl StreamId {
    pub const STREAM1: StreamId = StreamId(1);
    pub const ALL: [StreamId; MAX_STREAMS] = [StreamId(1), StreamId(2), StreamId(3), StreamId(4)];

    pub fn new(id: u8) -> Option<Self> {
        (1..=MAX_STREAMS as u8)
            .contains(&id)
            .then_some(StreamId(id))
    }

    pub fn id(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-stream tables.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum UserPixelWidth {
    #[default]
    One = 1,
    Two = 2,
    Four = 4,
}

impl UserPixelWidth {
    pub fn width(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for UserPixelWidth {
    type Error = DpTxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UserPixelWidth::One),
            2 => Ok(UserPixelWidth::Two),
            4 => Ok(UserPixelWidth::Four),
            _ => Err(DpTxError::InvalidParameter),
        }
    }
}

/// Main stream attributes of one stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub bpc: Bpc,
    pub component_format: ComponentFormat,
    pub pixel_clock_hz: u64,
    pub user_pixel_width: UserPixelWidth,
    /// Set when the user pinned `user_pixel_width`; mode-driven defaults are
    /// then not applied.
    pub override_user_pixel_width: bool,
    pub synchronous_clock_mode: bool,
    /// Standard mode in use, `None` for a custom timing.
    pub video_mode: Option<VideoMode>,
    pub timing: VideoTiming,
    pub frame_rate: u32,
    pub dynamic_range: u8,
    pub colorimetry: u8,
    pub m_vid: u32,
    pub n_vid: u32,
    pub h_start: u16,
    pub v_start: u16,
}

impl Default for StreamDescriptor {
    fn default() -> Self {
        Self {
            bpc: Bpc::Eight,
            component_format: ComponentFormat::Rgb,
            pixel_clock_hz: 0,
            user_pixel_width: UserPixelWidth::One,
            override_user_pixel_width: false,
            synchronous_clock_mode: false,
            video_mode: None,
            timing: VideoTiming::default(),
            frame_rate: 0,
            dynamic_range: 0,
            colorimetry: 0,
            m_vid: 0,
            n_vid: 0,
            h_start: 0,
            v_start: 0,
        }
    }
}

impl StreamDescriptor {
    /// Resets the stream attributes. Component format and a user-pinned
    /// pixel width survive the reset.
    pub fn clear(&mut self) {
        let component_format = self.component_format;
        let pinned_width = self
            .override_user_pixel_width
            .then_some(self.user_pixel_width);
        *self = StreamDescriptor {
            component_format,
            ..Default::default()
        };
        if let Some(width) = pinned_width {
            self.user_pixel_width = width;
            self.override_user_pixel_width = true;
        }
    }

    pub fn apply_standard_mode(&mut self, mode: VideoMode) {
        self.video_mode = Some(mode);
        self.timing = *mode.timing();
        self.frame_rate = mode.frame_rate();
        self.pixel_clock_hz = mode.pixel_clock_hz();
    }

    pub fn apply_custom_msa(&mut self, derived: &DerivedMsa) {
        self.video_mode = None;
        self.timing = derived.timing;
        self.frame_rate = derived.frame_rate;
        self.pixel_clock_hz = derived.pixel_clock_hz;
    }

    /// Applies a mode-driven pixel width unless the user pinned one.
    pub fn default_user_pixel_width(&mut self, width: UserPixelWidth) {
        if !self.override_user_pixel_width {
            self.user_pixel_width = width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_pixel() {
        let expected: [(Bpc, u32, u32, u32); 5] = [
            (Bpc::Six, 18, 12, 9),
            (Bpc::Eight, 24, 16, 12),
            (Bpc::Ten, 30, 20, 15),
            (Bpc::Twelve, 36, 24, 18),
            (Bpc::Sixteen, 48, 32, 24),
        ];
        for (bpc, rgb, ycbcr422, ycbcr420) in expected {
            assert_eq!(bits_per_pixel(ComponentFormat::Rgb, bpc), rgb);
            assert_eq!(bits_per_pixel(ComponentFormat::YCbCr444, bpc), rgb);
            assert_eq!(bits_per_pixel(ComponentFormat::YCbCr422, bpc), ycbcr422);
            assert_eq!(bits_per_pixel(ComponentFormat::YCbCr420, bpc), ycbcr420);
        }
    }

    #[test]
    fn test_stream_id() {
        assert_eq!(StreamId::new(0), None);
        assert_eq!(StreamId::new(5), None);
        assert_eq!(StreamId::new(4).map(StreamId::index), Some(3));
    }

    #[test]
    fn test_clear_keeps_user_choices() {
        let mut desc = StreamDescriptor {
            component_format: ComponentFormat::YCbCr422,
            user_pixel_width: UserPixelWidth::Two,
            override_user_pixel_width: true,
            ..Default::default()
        };
        desc.apply_standard_mode(VideoMode::Uhd2p60);
        desc.synchronous_clock_mode = true;
        desc.clear();
        assert_eq!(desc.component_format, ComponentFormat::YCbCr422);
        assert_eq!(desc.user_pixel_width, UserPixelWidth::Two);
        assert_eq!(desc.pixel_clock_hz, 0);
        assert!(!desc.synchronous_clock_mode);

        desc.default_user_pixel_width(UserPixelWidth::Four);
        assert_eq!(desc.user_pixel_width, UserPixelWidth::Two);
    }
}
