// Licensed under the Apache-2.0 license

//! Preferred timing decode from a base EDID block.
//!
//! Only the first detailed timing descriptor (the preferred timing) is
//! interpreted. Everything else in the block is left to the caller.

use crate::modes::VideoMode;
use crate::timing::VideoTiming;
use bitfield::bitfield;
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const EDID_BLOCK_SIZE: usize = 128;
pub const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
pub const PREFERRED_TIMING_OFFSET: usize = 0x36;
pub const DETAILED_TIMING_SIZE: usize = 18;

const PIXEL_CLOCK_UNIT_HZ: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdidError {
    BufferTooShort,
    InvalidHeader,
    ChecksumMismatch,
    /// The descriptor slot holds a display descriptor, not a timing.
    ZeroPixelClock,
}

bitfield! {
    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy)]
    #[repr(C)]
    pub struct ActiveBlankHigh(u8);
    impl Debug;
    u8;
    pub blank_high, _: 3, 0;
    pub active_high, _: 7, 4;
}

bitfield! {
    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy)]
    #[repr(C)]
    pub struct VerticalPorchSyncLow(u8);
    impl Debug;
    u8;
    pub sync_low, _: 3, 0;
    pub front_porch_low, _: 7, 4;
}

bitfield! {
    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy)]
    #[repr(C)]
    pub struct PorchSyncHigh(u8);
    impl Debug;
    u8;
    pub v_sync_high, _: 1, 0;
    pub v_front_porch_high, _: 3, 2;
    pub h_sync_high, _: 5, 4;
    pub h_front_porch_high, _: 7, 6;
}

bitfield! {
    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy)]
    #[repr(C)]
    pub struct SignalFlags(u8);
    impl Debug;
    u8;
    pub h_sync_positive, _: 1, 1;
    pub v_sync_positive, _: 2, 2;
    pub sync_type, _: 4, 3;
    pub stereo, _: 6, 5;
    pub interlaced, _: 7, 7;
}

/// Digital separate sync; the only sync type that carries polarity bits.
const SYNC_TYPE_DIGITAL_SEPARATE: u8 = 0b11;

/// 18-byte detailed timing descriptor.
#[repr(C)]
#[derive(Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy)]
pub struct DetailedTimingDescriptor {
    pub pixel_clock: U16<LittleEndian>,
    pub h_active_low: u8,
    pub h_blank_low: u8,
    pub h_high: ActiveBlankHigh,
    pub v_active_low: u8,
    pub v_blank_low: u8,
    pub v_high: ActiveBlankHigh,
    pub h_front_porch_low: u8,
    pub h_sync_low: u8,
    pub v_porch_sync_low: VerticalPorchSyncLow,
    pub porch_sync_high: PorchSyncHigh,
    pub h_image_size_low: u8,
    pub v_image_size_low: u8,
    pub image_size_high: u8,
    pub h_border: u8,
    pub v_border: u8,
    pub flags: SignalFlags,
}

fn join(high: u8, low: u8, low_bits: u32) -> u16 {
    ((high as u16) << low_bits) | low as u16
}

impl DetailedTimingDescriptor {
    pub fn pixel_clock_hz(&self) -> u64 {
        self.pixel_clock.get() as u64 * PIXEL_CLOCK_UNIT_HZ
    }

    pub fn h_active(&self) -> u16 {
        join(self.h_high.active_high(), self.h_active_low, 8)
    }

    pub fn h_blank(&self) -> u16 {
        join(self.h_high.blank_high(), self.h_blank_low, 8)
    }

    pub fn v_active(&self) -> u16 {
        join(self.v_high.active_high(), self.v_active_low, 8)
    }

    pub fn v_blank(&self) -> u16 {
        join(self.v_high.blank_high(), self.v_blank_low, 8)
    }

    pub fn h_front_porch(&self) -> u16 {
        join(
            self.porch_sync_high.h_front_porch_high(),
            self.h_front_porch_low,
            8,
        )
    }

    pub fn h_sync_width(&self) -> u16 {
        join(self.porch_sync_high.h_sync_high(), self.h_sync_low, 8)
    }

    pub fn v_front_porch(&self) -> u16 {
        join(
            self.porch_sync_high.v_front_porch_high(),
            self.v_porch_sync_low.front_porch_low(),
            4,
        )
    }

    pub fn v_sync_width(&self) -> u16 {
        join(
            self.porch_sync_high.v_sync_high(),
            self.v_porch_sync_low.sync_low(),
            4,
        )
    }

    pub fn is_interlaced(&self) -> bool {
        self.flags.interlaced() != 0
    }

    /// Canonical timing for field 0. Back porches absorb whatever blanking
    /// remains after the front porch and sync pulse.
    pub fn timing(&self) -> VideoTiming {
        let digital_separate = self.flags.sync_type() == SYNC_TYPE_DIGITAL_SEPARATE;
        let h_active = self.h_active();
        let h_blank = self.h_blank();
        let v_active = self.v_active();
        let v_blank = self.v_blank();
        let h_front_porch = self.h_front_porch();
        let h_sync_width = self.h_sync_width();
        let v_front_porch = self.v_front_porch();
        let v_sync_width = self.v_sync_width();

        VideoTiming {
            h_active,
            h_front_porch,
            h_sync_width,
            h_back_porch: h_blank.saturating_sub(h_front_porch + h_sync_width),
            h_total: h_active + h_blank,
            h_sync_polarity: digital_separate && self.flags.h_sync_positive() != 0,
            v_active,
            f0_pv_front_porch: v_front_porch,
            f0_pv_sync_width: v_sync_width,
            f0_pv_back_porch: v_blank.saturating_sub(v_front_porch + v_sync_width),
            f0_pv_total: v_active + v_blank,
            v_sync_polarity: digital_separate && self.flags.v_sync_positive() != 0,
            interlaced: self.is_interlaced(),
            ..Default::default()
        }
    }
}

/// Result of decoding the preferred timing descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferredTiming {
    pub timing: VideoTiming,
    pub pixel_clock_hz: u64,
    /// Refresh rate after sink quirk correction.
    pub frame_rate: u32,
    /// Matching standard mode, `None` if the timing is not in the mode table.
    pub mode: Option<VideoMode>,
}

/// Some sinks report 59 Hz for a 60 Hz preferred timing.
fn coerce_frame_rate(frame_rate: u32) -> u32 {
    if frame_rate == 59 {
        60
    } else {
        frame_rate
    }
}

pub fn verify_header(edid: &[u8]) -> Result<(), EdidError> {
    let header = edid
        .get(..EDID_HEADER.len())
        .ok_or(EdidError::BufferTooShort)?;
    if header != EDID_HEADER {
        return Err(EdidError::InvalidHeader);
    }
    Ok(())
}

/// All 128 bytes of a block sum to zero modulo 256.
pub fn verify_checksum(edid: &[u8]) -> Result<(), EdidError> {
    let block = edid
        .get(..EDID_BLOCK_SIZE)
        .ok_or(EdidError::BufferTooShort)?;
    let sum = block.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte));
    if sum != 0 {
        return Err(EdidError::ChecksumMismatch);
    }
    Ok(())
}

/// Returns the preferred timing descriptor of a base EDID block.
pub fn preferred_timing_descriptor(edid: &[u8]) -> Result<DetailedTimingDescriptor, EdidError> {
    if edid.len() < EDID_BLOCK_SIZE {
        return Err(EdidError::BufferTooShort);
    }
    DetailedTimingDescriptor::read_from_bytes(
        &edid[PREFERRED_TIMING_OFFSET..PREFERRED_TIMING_OFFSET + DETAILED_TIMING_SIZE],
    )
    .map_err(|_| EdidError::BufferTooShort)
}

/// Decodes the preferred timing of a base EDID block and resolves it to a
/// standard video mode.
///
/// # Arguments
/// * `edid` - At least one 128-byte EDID block.
///
/// # Returns
/// The decoded timing. An unknown timing is not an error: `mode` is `None`
/// and the caller picks the fallback.
pub fn decode_preferred_timing(edid: &[u8]) -> Result<PreferredTiming, EdidError> {
    let dtd = preferred_timing_descriptor(edid)?;
    let pixel_clock_hz = dtd.pixel_clock_hz();
    let timing = dtd.timing();
    let clocks_per_frame = timing.h_total as u64 * timing.f0_pv_total as u64;
    if pixel_clock_hz == 0 || clocks_per_frame == 0 {
        return Err(EdidError::ZeroPixelClock);
    }

    let frame_rate = coerce_frame_rate((pixel_clock_hz / clocks_per_frame) as u32);
    let mode = VideoMode::lookup(
        timing.h_active,
        timing.v_active,
        frame_rate,
        timing.interlaced,
    );

    Ok(PreferredTiming {
        timing,
        pixel_clock_hz,
        frame_rate,
        mode,
    })
}

/// Standard mode matching the preferred timing, or `None` if it cannot be
/// decoded or is not in the mode table.
pub fn preferred_video_mode(edid: &[u8]) -> Option<VideoMode> {
    decode_preferred_timing(edid).ok().and_then(|t| t.mode)
}
