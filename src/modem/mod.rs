// src/modem/mod.rs

mod bringup;
mod dispatcher;
mod receiver;
mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use bringup::Bringup;
pub use session::{AttachOutcome, HttpRequest, SessionManager, SmsReadout, SMS_MAX_LEN};

use crate::common::{
    hal_traits::{ModemClock, ModemSerial},
    log::{LogFacade, ModemLog},
    response::ResponseBuffer,
    CommLineStatus, DataMode, GsmStatus,
};

/// Default HTTP `User-Agent`.
pub const DEFAULT_USER_AGENT: &str = "RPI_cam-system";

/// Owns the serial interface and the response buffer; frames responses and
/// dispatches AT commands.
///
/// Bring-up and the session layer drive the modem through a `&mut AtModem`.
#[derive(Debug)]
pub struct AtModem<IF, L = LogFacade>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    interface: IF,
    buffer: ResponseBuffer,
    comm_status: CommLineStatus,
    gsm_status: GsmStatus,
    data_mode: DataMode,
    log: L,
}

impl<IF> AtModem<IF, LogFacade>
where
    IF: ModemSerial + ModemClock,
{
    pub fn new(interface: IF) -> Self {
        Self::with_logger(interface, LogFacade)
    }
}

impl<IF, L> AtModem<IF, L>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    pub fn with_logger(interface: IF, log: L) -> Self {
        AtModem {
            interface,
            buffer: ResponseBuffer::new(),
            comm_status: CommLineStatus::Free,
            gsm_status: GsmStatus::Idle,
            data_mode: DataMode::NonTransparent,
            log,
        }
    }

    /// Most recently framed response.
    pub fn response(&self) -> &ResponseBuffer {
        &self.buffer
    }

    pub fn comm_status(&self) -> CommLineStatus {
        self.comm_status
    }

    pub fn set_comm_status(&mut self, status: CommLineStatus) {
        self.comm_status = status;
    }

    pub fn gsm_status(&self) -> GsmStatus {
        self.gsm_status
    }

    pub fn set_gsm_status(&mut self, status: GsmStatus) {
        self.gsm_status = status;
    }

    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    pub fn set_data_mode(&mut self, mode: DataMode) {
        self.data_mode = mode;
    }

    pub fn logger(&self) -> &L {
        &self.log
    }

    pub fn interface(&self) -> &IF {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut IF {
        &mut self.interface
    }

    /// Blocking delay on the interface clock.
    pub fn delay_ms(&mut self, ms: u32) {
        self.interface.delay_ms(ms);
    }

    pub fn release(self) -> (IF, L) {
        (self.interface, self.log)
    }
}
