// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod command;
pub mod config;
pub mod error;
pub mod hal_traits;
pub mod log;
pub mod response;
pub mod timing;
pub mod types;

// --- Re-export key types/traits/functions for easier access ---

// From command.rs
pub use command::{AtCommand, CommandLine, COMMAND_LINE_CAPACITY};

// From config.rs
pub use config::{ConfigError, ModemConfig};

// From error.rs
pub use error::{ModemError, Precondition};

// From hal_traits.rs
pub use hal_traits::{ModemClock, ModemInterface, ModemSerial};
#[cfg(feature = "std")]
pub use hal_traits::StdClock;

// From log.rs
pub use self::log::{LogFacade, ModemLog};

// From response/mod.rs
pub use response::{AtResult, ReceiveStatus, ResponseBuffer, RESPONSE_BUFFER_CAPACITY};

// From timing.rs (constants - users can access via common::timing::*)
pub use timing::TimeoutPair;

// From types.rs
pub use types::{CommLineStatus, DataMode, GsmStatus, SmsStatus};
