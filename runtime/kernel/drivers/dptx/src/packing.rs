// Licensed under the Apache-2.0 license

use crate::link::LinkRate;
use crate::stream::{Bpc, UserPixelWidth};
use log::debug;

/// Decides the VIDEO_PACKING_CLOCK_CONTROL bit for deep-color streams on a
/// 4-wide payload datapath.
///
/// # Returns
/// `None` when the bit does not apply and must be left untouched, otherwise
/// whether the packing clock is slower than the link clock.
pub fn packing_clock_slower(
    payload_data_width: u8,
    bpc: Bpc,
    pixel_clock_hz: u64,
    user_pixel_width: UserPixelWidth,
    link_rate: LinkRate,
) -> Option<bool> {
    if payload_data_width != 4 || bpc <= Bpc::Ten || pixel_clock_hz == 0 {
        return None;
    }
    let packing_clk = pixel_clock_hz / user_pixel_width.width() as u64;
    let link_clk = link_rate.bit_rate_hz() / payload_data_width as u64 / 10;
    debug!(
        "Packing clock {} Hz, link clock {} Hz",
        packing_clk, link_clk
    );
    Some(packing_clk < link_clk)
}
