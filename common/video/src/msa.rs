// Licensed under the Apache-2.0 license

use crate::timing::VideoTiming;

/// Main stream attributes supplied directly by the caller instead of a
/// standard mode. Porches are derived from the start positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomMsa {
    pub m_vid: u32,
    pub n_vid: u32,
    pub h_active: u16,
    pub h_total: u16,
    pub h_start: u16,
    pub h_sync_width: u16,
    pub h_sync_polarity: bool,
    pub v_active: u16,
    pub v_total: u16,
    pub v_start: u16,
    pub v_sync_width: u16,
    pub v_sync_polarity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsaError {
    ZeroNVid,
    ZeroTotal,
    /// Start positions do not fit inside the totals.
    InconsistentTiming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedMsa {
    pub timing: VideoTiming,
    pub pixel_clock_hz: u64,
    pub frame_rate: u32,
}

fn round_frame_rate(frame_rate: u32) -> u32 {
    match frame_rate {
        59 | 61 => 60,
        29 | 31 => 30,
        74 | 76 => 75,
        other => other,
    }
}

impl CustomMsa {
    /// Derives the stream timing carried by this MSA on a link running at
    /// `link_rate_code` (units of 270 Mbps).
    ///
    /// The pixel clock is `link_rate_code * 27 * MVid / NVid` MHz, truncated to
    /// whole MHz. The refresh rate is rounded up and snapped to 30, 60 or 75 Hz
    /// when within one of them.
    pub fn derive(&self, link_rate_code: u8) -> Result<DerivedMsa, MsaError> {
        if self.n_vid == 0 {
            return Err(MsaError::ZeroNVid);
        }
        if self.h_total == 0 || self.v_total == 0 {
            return Err(MsaError::ZeroTotal);
        }

        let h_front_porch = self
            .h_total
            .checked_sub(self.h_start)
            .and_then(|v| v.checked_sub(self.h_active))
            .ok_or(MsaError::InconsistentTiming)?;
        let h_back_porch = self
            .h_start
            .checked_sub(self.h_sync_width)
            .ok_or(MsaError::InconsistentTiming)?;
        let v_front_porch = self
            .v_total
            .checked_sub(self.v_start)
            .and_then(|v| v.checked_sub(self.v_active))
            .ok_or(MsaError::InconsistentTiming)?;
        let v_back_porch = self
            .v_start
            .checked_sub(self.v_sync_width)
            .ok_or(MsaError::InconsistentTiming)?;

        let clock_mhz = link_rate_code as u64 * 27 * self.m_vid as u64 / self.n_vid as u64;
        let pixel_clock_hz = clock_mhz * 1_000_000;
        let clocks_per_frame = self.h_total as u64 * self.v_total as u64;
        let frame_rate = round_frame_rate(pixel_clock_hz.div_ceil(clocks_per_frame) as u32);

        let timing = VideoTiming {
            h_active: self.h_active,
            h_front_porch,
            h_sync_width: self.h_sync_width,
            h_back_porch,
            h_total: self.h_total,
            h_sync_polarity: self.h_sync_polarity,
            v_active: self.v_active,
            f0_pv_front_porch: v_front_porch,
            f0_pv_sync_width: self.v_sync_width,
            f0_pv_back_porch: v_back_porch,
            f0_pv_total: self.v_total,
            v_sync_polarity: self.v_sync_polarity,
            ..Default::default()
        };

        Ok(DerivedMsa {
            timing,
            pixel_clock_hz,
            frame_rate,
        })
    }
}
