// Licensed under the Apache-2.0 license

use crate::timing::VideoTiming;

/// Standard video modes known to the transmitter.
///
/// Variants are declared in ascending resolution order; comparisons between
/// modes follow that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VideoMode {
    Vga60,
    Svga60,
    Xga60,
    Hd720p60,
    Sxga60,
    Fhd1080i60,
    Fhd1080p30,
    Fhd1080p60,
    Wuxga60,
    Uhd2p60,
    Qhd1440p60,
    Uhd2160p30,
    Uhd2160p60,
    Dci4kp60,
}

/// How the caller selects the video mode for a configuration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoModeRequest {
    /// Use the preferred timing advertised in the sink EDID.
    EdidPreferred,
    /// Use the timing already populated in the stream descriptors.
    Custom,
    Standard(VideoMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoModeInfo {
    pub mode: VideoMode,
    pub name: &'static str,
    pub frame_rate: u32,
    pub timing: VideoTiming,
}

const fn entry(
    mode: VideoMode,
    name: &'static str,
    frame_rate: u32,
    timing: VideoTiming,
) -> VideoModeInfo {
    VideoModeInfo {
        mode,
        name,
        frame_rate,
        timing,
    }
}

// Indexed by `VideoMode as usize`.
static VIDEO_MODE_TABLE: [VideoModeInfo; 14] = [
    entry(
        VideoMode::Vga60,
        "640x480@60Hz",
        60,
        VideoTiming::progressive([640, 16, 96, 48], [480, 10, 2, 33], false, false),
    ),
    entry(
        VideoMode::Svga60,
        "800x600@60Hz",
        60,
        VideoTiming::progressive([800, 40, 128, 88], [600, 1, 4, 23], true, true),
    ),
    entry(
        VideoMode::Xga60,
        "1024x768@60Hz",
        60,
        VideoTiming::progressive([1024, 24, 136, 160], [768, 3, 6, 29], false, false),
    ),
    entry(
        VideoMode::Hd720p60,
        "1280x720@60Hz",
        60,
        VideoTiming::progressive([1280, 110, 40, 220], [720, 5, 5, 20], true, true),
    ),
    entry(
        VideoMode::Sxga60,
        "1280x1024@60Hz",
        60,
        VideoTiming::progressive([1280, 48, 112, 248], [1024, 1, 3, 38], true, true),
    ),
    entry(
        VideoMode::Fhd1080i60,
        "1920x1080@60Hz (I)",
        60,
        VideoTiming::interlaced([1920, 88, 44, 148], [540, 2, 5, 15], [2, 5, 16], true, true),
    ),
    entry(
        VideoMode::Fhd1080p30,
        "1920x1080@30Hz",
        30,
        VideoTiming::progressive([1920, 88, 44, 148], [1080, 4, 5, 36], true, true),
    ),
    entry(
        VideoMode::Fhd1080p60,
        "1920x1080@60Hz",
        60,
        VideoTiming::progressive([1920, 88, 44, 148], [1080, 4, 5, 36], true, true),
    ),
    entry(
        VideoMode::Wuxga60,
        "1920x1200@60Hz (RB)",
        60,
        VideoTiming::progressive([1920, 48, 32, 80], [1200, 3, 6, 26], true, false),
    ),
    entry(
        VideoMode::Uhd2p60,
        "1920x2160@60Hz",
        60,
        VideoTiming::progressive([1920, 88, 44, 148], [2160, 8, 10, 72], true, true),
    ),
    entry(
        VideoMode::Qhd1440p60,
        "2560x1440@60Hz (RB)",
        60,
        VideoTiming::progressive([2560, 48, 32, 80], [1440, 3, 5, 33], true, false),
    ),
    entry(
        VideoMode::Uhd2160p30,
        "3840x2160@30Hz",
        30,
        VideoTiming::progressive([3840, 176, 88, 296], [2160, 8, 10, 72], true, true),
    ),
    entry(
        VideoMode::Uhd2160p60,
        "3840x2160@60Hz",
        60,
        VideoTiming::progressive([3840, 176, 88, 296], [2160, 8, 10, 72], true, true),
    ),
    entry(
        VideoMode::Dci4kp60,
        "4096x2160@60Hz",
        60,
        VideoTiming::progressive([4096, 88, 88, 128], [2160, 8, 10, 72], true, true),
    ),
];

impl VideoMode {
    /// Half-width mode driven on each tile of a two-tile 3840x2160 display.
    pub const PER_TILE_UHD: VideoMode = VideoMode::Uhd2p60;

    pub fn info(self) -> &'static VideoModeInfo {
        &VIDEO_MODE_TABLE[self as usize]
    }

    pub fn timing(self) -> &'static VideoTiming {
        &self.info().timing
    }

    pub fn frame_rate(self) -> u32 {
        self.info().frame_rate
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn resolution(self) -> (u16, u16) {
        let timing = self.timing();
        (timing.h_active, timing.v_active)
    }

    pub fn pixel_clock_hz(self) -> u64 {
        self.timing().pixel_clock_hz(self.frame_rate())
    }

    /// Finds the table entry matching the given raster and refresh rate.
    ///
    /// # Arguments
    /// * `h_active` - Active pixels per line.
    /// * `v_active` - Active lines per frame (per field when interlaced).
    /// * `frame_rate` - Refresh rate in Hz.
    /// * `interlaced` - Whether the raster is interlaced.
    ///
    /// # Returns
    /// The matching mode, or `None` when the timing is not in the table.
    pub fn lookup(
        h_active: u16,
        v_active: u16,
        frame_rate: u32,
        interlaced: bool,
    ) -> Option<VideoMode> {
        VIDEO_MODE_TABLE
            .iter()
            .find(|info| {
                info.timing.h_active == h_active
                    && info.timing.v_active == v_active
                    && info.frame_rate == frame_rate
                    && info.timing.interlaced == interlaced
            })
            .map(|info| info.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_indexed_by_mode() {
        for (index, info) in VIDEO_MODE_TABLE.iter().enumerate() {
            assert_eq!(info.mode as usize, index);
        }
    }

    #[test]
    fn test_pixel_clocks() {
        assert_eq!(VideoMode::Uhd2160p60.pixel_clock_hz(), 594_000_000);
        assert_eq!(VideoMode::Uhd2p60.pixel_clock_hz(), 297_000_000);
        assert_eq!(VideoMode::Fhd1080p60.pixel_clock_hz(), 148_500_000);
        assert_eq!(VideoMode::Fhd1080i60.pixel_clock_hz(), 74_250_000);
        assert_eq!(VideoMode::Hd720p60.pixel_clock_hz(), 74_250_000);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(
            VideoMode::lookup(3840, 2160, 60, false),
            Some(VideoMode::Uhd2160p60)
        );
        assert_eq!(
            VideoMode::lookup(1920, 540, 60, true),
            Some(VideoMode::Fhd1080i60)
        );
        assert_eq!(VideoMode::lookup(1920, 1080, 60, true), None);
        assert_eq!(VideoMode::lookup(1366, 768, 60, false), None);
    }

    #[test]
    fn test_ordering() {
        assert!(VideoMode::Fhd1080p60 <= VideoMode::PER_TILE_UHD);
        assert!(VideoMode::Uhd2160p60 > VideoMode::PER_TILE_UHD);
        assert!(VideoMode::Vga60 < VideoMode::Dci4kp60);
    }
}
