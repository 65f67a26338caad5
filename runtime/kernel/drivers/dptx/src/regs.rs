// Licensed under the Apache-2.0 license

//! DisplayPort TX core register offsets and fields.

use tock_registers::register_bitfields;

pub const LINK_BW_SET: u32 = 0x000;
pub const LANE_COUNT_SET: u32 = 0x004;
pub const SOFT_RESET: u32 = 0x01C;
pub const VIDEO_PACKING_CLOCK_CONTROL: u32 = 0x090;
pub const INTERRUPT_MASK: u32 = 0x144;
pub const PHY_VOLTAGE_DIFF_LANE_0: u32 = 0x220;
pub const PHY_POSTCURSOR_LANE_0: u32 = 0x24C;
pub const AUDIO_CONTROL: u32 = 0x300;

register_bitfields! {
    u32,
    pub SoftReset [
        VIDEO_STREAM1 OFFSET(0) NUMBITS(1) [],
        VIDEO_STREAM2 OFFSET(1) NUMBITS(1) [],
        VIDEO_STREAM3 OFFSET(2) NUMBITS(1) [],
        VIDEO_STREAM4 OFFSET(3) NUMBITS(1) [],
        HDCP OFFSET(8) NUMBITS(1) [],
    ],
    pub InterruptMask [
        HPD_PULSE_DETECTED OFFSET(4) NUMBITS(1) [],
    ],
    pub PhyVoltageDiff [
        LEVEL OFFSET(0) NUMBITS(5) [],
    ],
    pub PhyPostcursor [
        LEVEL OFFSET(0) NUMBITS(5) [],
    ],
    pub PackingClockControl [
        PACKING_CLOCK_SLOWER OFFSET(0) NUMBITS(1) [],
    ],
    pub AudioControl [
        ENABLE OFFSET(0) NUMBITS(1) [],
    ],
}
