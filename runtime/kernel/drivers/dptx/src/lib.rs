// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv32", no_std)]

pub mod bandwidth;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod hil;
pub mod link;
pub mod packing;
pub mod regs;
pub mod session;
pub mod start;
pub mod stream;
pub mod subsystem;
pub mod topology;
pub mod training;
pub mod training_sm;

pub use error::DpTxError;
pub use session::{LinkSession, TransportMode};
pub use subsystem::DpTxSubsystem;
