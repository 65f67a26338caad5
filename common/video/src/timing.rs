// Licensed under the Apache-2.0 license

/// Canonical raster timing of a video stream.
///
/// Vertical fields are kept per field. Progressive timings only use field 0;
/// interlaced timings carry the second field in the `f1_*` members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoTiming {
    pub h_active: u16,
    pub h_front_porch: u16,
    pub h_sync_width: u16,
    pub h_back_porch: u16,
    pub h_total: u16,
    pub h_sync_polarity: bool,
    pub v_active: u16,
    pub f0_pv_front_porch: u16,
    pub f0_pv_sync_width: u16,
    pub f0_pv_back_porch: u16,
    pub f0_pv_total: u16,
    pub f1_v_front_porch: u16,
    pub f1_v_sync_width: u16,
    pub f1_v_back_porch: u16,
    pub f1_v_total: u16,
    pub v_sync_polarity: bool,
    pub interlaced: bool,
}

impl VideoTiming {
    /// Builds a progressive timing from active/porch/sync widths. Totals are derived.
    pub const fn progressive(h: [u16; 4], v: [u16; 4], h_pol: bool, v_pol: bool) -> Self {
        Self {
            h_active: h[0],
            h_front_porch: h[1],
            h_sync_width: h[2],
            h_back_porch: h[3],
            h_total: h[0] + h[1] + h[2] + h[3],
            h_sync_polarity: h_pol,
            v_active: v[0],
            f0_pv_front_porch: v[1],
            f0_pv_sync_width: v[2],
            f0_pv_back_porch: v[3],
            f0_pv_total: v[0] + v[1] + v[2] + v[3],
            f1_v_front_porch: 0,
            f1_v_sync_width: 0,
            f1_v_back_porch: 0,
            f1_v_total: 0,
            v_sync_polarity: v_pol,
            interlaced: false,
        }
    }

    /// Builds an interlaced timing. `v` holds the per-field active height and the
    /// field 0 porches, `f1` the field 1 front porch, sync and back porch.
    pub const fn interlaced(
        h: [u16; 4],
        v: [u16; 4],
        f1: [u16; 3],
        h_pol: bool,
        v_pol: bool,
    ) -> Self {
        let mut timing = Self::progressive(h, v, h_pol, v_pol);
        timing.f1_v_front_porch = f1[0];
        timing.f1_v_sync_width = f1[1];
        timing.f1_v_back_porch = f1[2];
        timing.f1_v_total = v[0] + f1[0] + f1[1] + f1[2];
        timing.interlaced = true;
        timing
    }

    pub fn h_blank(&self) -> u16 {
        self.h_total - self.h_active
    }

    pub fn v_blank(&self) -> u16 {
        self.f0_pv_total - self.v_active
    }

    /// Lines per frame, both fields for interlaced timings.
    pub fn lines_per_frame(&self) -> u32 {
        if self.interlaced {
            self.f0_pv_total as u32 + self.f1_v_total as u32
        } else {
            self.f0_pv_total as u32
        }
    }

    /// Pixel clock needed to scan this timing at `frame_rate` frames per second.
    pub fn pixel_clock_hz(&self, frame_rate: u32) -> u64 {
        let clocks = self.h_total as u64 * self.lines_per_frame() as u64 * frame_rate as u64;
        if self.interlaced {
            clocks / 2
        } else {
            clocks
        }
    }
}
