// Licensed under the Apache-2.0 license

//! Link bandwidth admission.
//!
//! Nothing here touches hardware; every check can be run speculatively and
//! must be repeated whenever the link is retrained.

use crate::fixed_point::{interpolate_slots, round_up_to_multiple, Eighths, Ratio};
use crate::link::LinkConfig;
use crate::session::TransportMode;
use crate::stream::MAX_STREAMS;
use log::{debug, info, warn};
use thiserror::Error;

/// SST transfer unit size in symbols.
pub const TRANSFER_UNIT_SIZE: u64 = 64;
/// Time slots available to streams in one MTP; slot 0 carries the MTP header.
pub const MAX_TIME_SLOTS: u32 = 63;
/// PBN includes a 0.6% margin for downspread.
const PBN_MARGIN_PER_MILLE: u64 = 1006;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("requested lane count or link rate exceeds sink capabilities")]
    ExceedsCapability,
    #[error("link is oversubscribed")]
    Oversubscribed,
}

/// Time slots reserved per stream slot, committed to the payload table after
/// admission succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadAllocation {
    pub per_stream_time_slots: [u32; MAX_STREAMS],
    pub total_time_slots: u32,
}

impl PayloadAllocation {
    pub fn new(per_stream_time_slots: [u32; MAX_STREAMS]) -> Result<Self, AdmissionError> {
        let total_time_slots = per_stream_time_slots.iter().sum();
        if total_time_slots > MAX_TIME_SLOTS {
            warn!(
                "MST link oversubscribed: {} time slots requested, {} available",
                total_time_slots, MAX_TIME_SLOTS
            );
            return Err(AdmissionError::Oversubscribed);
        }
        Ok(Self {
            per_stream_time_slots,
            total_time_slots,
        })
    }
}

/// Bandwidth demand of one MST stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSlots {
    pub pbn: u64,
    pub target: Eighths,
    pub time_slots: u32,
}

/// Video parameters to admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub bits_per_pixel: u32,
    pub pixel_clock_hz: u64,
    /// Payload datapath width of the transmitter, 2 or 4.
    pub payload_data_width: u8,
    /// Stream slots currently enabled; only consulted for MST.
    pub enabled_streams: [bool; MAX_STREAMS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    SingleStream,
    MultiStream(PayloadAllocation),
}

pub fn check_capability(link: &LinkConfig) -> Result<(), AdmissionError> {
    if link.link_rate > link.max_link_rate {
        warn!(
            "Requested link rate {:?} exceeds maximum {:?}",
            link.link_rate, link.max_link_rate
        );
        return Err(AdmissionError::ExceedsCapability);
    }
    if link.lane_count > link.max_lane_count {
        warn!(
            "Requested lane count {} exceeds maximum {}",
            link.lane_count.count(),
            link.max_lane_count.count()
        );
        return Err(AdmissionError::ExceedsCapability);
    }
    Ok(())
}

/// Average bytes per transfer unit, scaled by 1000.
pub fn sst_average_bytes_per_tu(
    link: &LinkConfig,
    bits_per_pixel: u32,
    pixel_clock_hz: u64,
) -> u64 {
    let video_bw = pixel_clock_hz / 1000 * bits_per_pixel as u64 / 8;
    let link_bw = link.bandwidth();
    debug!(
        "SST link bandwidth {} Kbps, video bandwidth {} Kbps",
        link_bw * 1000,
        video_bw
    );
    video_bw * TRANSFER_UNIT_SIZE / link_bw
}

pub fn admit_single_stream(
    link: &LinkConfig,
    bits_per_pixel: u32,
    pixel_clock_hz: u64,
) -> Result<(), AdmissionError> {
    check_capability(link)?;
    let average = sst_average_bytes_per_tu(link, bits_per_pixel, pixel_clock_hz);
    if average > TRANSFER_UNIT_SIZE * 1000 {
        warn!(
            "SST link oversubscribed: {} average bytes per TU (x1000)",
            average
        );
        return Err(AdmissionError::Oversubscribed);
    }
    Ok(())
}

/// Computes the PBN and time slots one stream needs on `link`.
///
/// Peak pixel bandwidth in MBytes/s is `pclk * bpp / 8e6`; it is carried as
/// the exact numerator `pclk * bpp` so no precision is lost before rounding.
pub fn mst_stream_slots(
    link: &LinkConfig,
    bits_per_pixel: u32,
    pixel_clock_hz: u64,
    payload_data_width: u8,
) -> StreamSlots {
    const PEAK_DEN: u64 = 8 * 1_000_000;
    let peak_num = pixel_clock_hz * bits_per_pixel as u64;
    let link_bw = link.bandwidth();

    let pbn = Ratio::new(peak_num * PBN_MARGIN_PER_MILLE * 64, PEAK_DEN * 1000 * 54).ceil();
    let average = Ratio::new(64 * peak_num, PEAK_DEN * link_bw);
    let maximum = Ratio::new(54 * pbn, link_bw);
    let target = interpolate_slots(average, maximum);

    let multiple = if payload_data_width == 4 { 4 } else { 2 };
    let time_slots = round_up_to_multiple(target.ceil() as u32, multiple);
    debug!(
        "MST PBN {} target {}.{}/8 time slots {}",
        pbn,
        target.whole(),
        target.fraction(),
        time_slots
    );

    StreamSlots {
        pbn,
        target,
        time_slots,
    }
}

pub fn admit_multi_stream(
    link: &LinkConfig,
    request: &AdmissionRequest,
) -> Result<PayloadAllocation, AdmissionError> {
    check_capability(link)?;
    let slots = mst_stream_slots(
        link,
        request.bits_per_pixel,
        request.pixel_clock_hz,
        request.payload_data_width,
    );
    let mut per_stream = [0u32; MAX_STREAMS];
    for (slot, enabled) in per_stream.iter_mut().zip(request.enabled_streams) {
        if enabled {
            *slot = slots.time_slots;
        }
    }
    PayloadAllocation::new(per_stream)
}

/// Checks whether the link can carry the request in the given transport mode.
pub fn admit(
    link: &LinkConfig,
    mode: TransportMode,
    request: &AdmissionRequest,
) -> Result<Admission, AdmissionError> {
    info!(
        "Checking {:?} bandwidth: {} lanes at {:?}",
        mode,
        link.lane_count.count(),
        link.link_rate
    );
    match mode {
        TransportMode::SingleStream => {
            admit_single_stream(link, request.bits_per_pixel, request.pixel_clock_hz)
                .map(|_| Admission::SingleStream)
        }
        TransportMode::MultiStream => admit_multi_stream(link, request).map(Admission::MultiStream),
    }
}
