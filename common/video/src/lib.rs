// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv32", no_std)]

pub mod edid;
pub mod modes;
pub mod msa;
pub mod timing;

pub use modes::{VideoMode, VideoModeRequest};
pub use timing::VideoTiming;
