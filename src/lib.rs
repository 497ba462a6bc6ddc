// src/lib.rs

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod common;
pub mod modem;

// Re-export key types for convenience
pub use common::{AtCommand, GsmStatus, ModemConfig, ModemError, ReceiveStatus};
pub use modem::{AtModem, Bringup, SessionManager};
