// src/modem/session/mod.rs

//! Application-facing operations: GPRS attach/detach, TCP sessions, HTTP
//! exchanges, SMS and identity queries.
//!
//! Every operation is a fixed sequence of AT commands. A sequence stops at
//! the first stage whose reply is missing or wrong and reports that stage in
//! the returned [`ModemError`].

mod gprs;
mod http;
mod identity;
mod sms;
mod tcp;

pub use gprs::AttachOutcome;
pub use http::HttpRequest;
pub use sms::{SmsReadout, SMS_MAX_LEN};

use super::{AtModem, Bringup, DEFAULT_USER_AGENT};
use crate::common::{
    config::ModemConfig,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Level, LogFacade, ModemLog},
    GsmStatus,
};
use embedded_hal::digital::OutputPin;

/// Capacity of the stored HTTP `User-Agent`.
pub const USER_AGENT_CAPACITY: usize = 48;

/// Owns the AT engine and the bring-up lines for the lifetime of the device
/// connection.
#[derive(Debug)]
pub struct SessionManager<IF, ON, RST, L = LogFacade>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    modem: AtModem<IF, L>,
    bringup: Bringup<ON, RST>,
    initialized: bool,
    user_agent: heapless::String<USER_AGENT_CAPACITY>,
}

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    pub fn new(modem: AtModem<IF, L>, bringup: Bringup<ON, RST>) -> Self {
        let mut user_agent = heapless::String::new();
        // Fits: the default is shorter than the capacity.
        let _ = user_agent.push_str(DEFAULT_USER_AGENT);
        SessionManager {
            modem,
            bringup,
            initialized: false,
            user_agent,
        }
    }

    /// Runs the power-on sequence. Session operations are rejected until
    /// this has succeeded once.
    pub fn bring_up(&mut self) -> Result<(), ModemError<IF::Error>> {
        let result = self.bringup.run(&mut self.modem);
        self.initialized = result.is_ok();
        result
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn gsm_status(&self) -> GsmStatus {
        self.modem.gsm_status()
    }

    pub fn modem(&self) -> &AtModem<IF, L> {
        &self.modem
    }

    pub fn modem_mut(&mut self) -> &mut AtModem<IF, L> {
        &mut self.modem
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_user_agent(&mut self, agent: &str) -> Result<(), ModemError<IF::Error>> {
        if agent.is_empty() {
            return Err(Precondition::MissingArgument.into());
        }
        let mut stored = heapless::String::new();
        stored.push_str(agent).map_err(|_| ModemError::BufferOverflow {
            needed: agent.len(),
            got: USER_AGENT_CAPACITY,
        })?;
        self.user_agent = stored;
        Ok(())
    }

    /// [`attach_gprs`](Self::attach_gprs) with the credentials and data mode
    /// from `config`. A configured SIM PIN is entered first if the SIM asks
    /// for it.
    pub fn attach_configured(
        &mut self,
        config: &ModemConfig<'_>,
    ) -> Result<AttachOutcome, ModemError<IF::Error>> {
        if !config.sim_pin.is_empty() {
            self.unlock_sim(config.sim_pin)?;
        }
        if !config.user_agent.is_empty() {
            self.set_user_agent(config.user_agent)?;
        }
        self.attach_gprs(config.apn, config.username, config.password, config.transparent)
    }

    pub fn http_get_configured(
        &mut self,
        config: &ModemConfig<'_>,
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        self.http_get(config.server_host, config.server_port, config.server_path, out)
    }

    pub fn http_post_configured(
        &mut self,
        config: &ModemConfig<'_>,
        body: &[u8],
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        self.http_post(config.server_host, config.server_port, config.server_path, body, out)
    }

    /// Best-effort teardown: drops the GPRS session if one is up. The
    /// hardware stays owned; see [`into_parts`](Self::into_parts).
    pub fn shutdown(&mut self) -> Result<(), ModemError<IF::Error>> {
        if !self.modem.gsm_status().has_gprs() {
            return Ok(());
        }
        let result = self.detach_gprs();
        if let Err(e) = &result {
            modem_log!(self.modem.log, Level::Warn, "detach during shutdown failed: {}", e);
        }
        result
    }

    pub fn into_parts(self) -> (AtModem<IF, L>, Bringup<ON, RST>) {
        (self.modem, self.bringup)
    }

    fn require_initialized(&self) -> Result<(), ModemError<IF::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(Precondition::NotInitialized.into())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::common::log::recording::RecordingLog;
    use crate::modem::mock::{MockInterface, MockPin, PinLog};

    pub const OK: &str = "\r\nOK\r\n";

    pub type TestSession = SessionManager<MockInterface, MockPin, MockPin, RecordingLog>;

    /// Scripts the bring-up replies on top of `mock`.
    pub fn answer_bringup(mock: &mut MockInterface) {
        mock.reply("AT+CSCLK=0", OK)
            .reply("AT\r\n", OK)
            .reply("ATE0", OK)
            .reply("AT+CLIP=1", OK)
            .reply("AT+CMEE=0", OK)
            .reply("AT+CMGF=1", OK);
    }

    pub fn session(mock: MockInterface) -> TestSession {
        let pins = PinLog::default();
        let bringup = Bringup::new(MockPin::new("on", &pins), MockPin::new("reset", &pins));
        SessionManager::new(AtModem::with_logger(mock, RecordingLog::default()), bringup)
    }

    /// Session that has completed bring-up, with the write history cleared.
    pub fn ready_session(mut mock: MockInterface) -> TestSession {
        answer_bringup(&mut mock);
        let mut s = session(mock);
        s.bring_up().unwrap();
        s.modem.interface.clear_history();
        s
    }

    /// Session in `status` without running any GPRS sequence.
    pub fn session_in(mock: MockInterface, status: GsmStatus) -> TestSession {
        let mut s = ready_session(mock);
        s.modem.set_gsm_status(status);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::modem::mock::MockInterface;

    #[test]
    fn test_bring_up_marks_initialized() {
        let mut mock = MockInterface::new();
        answer_bringup(&mut mock);
        let mut s = session(mock);
        assert!(!s.is_initialized());

        s.bring_up().unwrap();
        assert!(s.is_initialized());
        assert_eq!(s.gsm_status(), GsmStatus::Ready);
    }

    #[test]
    fn test_failed_bring_up_leaves_session_uninitialized() {
        let mut s = session(MockInterface::new());
        assert!(s.bring_up().is_err());
        assert!(!s.is_initialized());

        let err = s.imei().unwrap_err();
        assert!(matches!(err, ModemError::PreconditionFailed(Precondition::NotInitialized)));
    }

    #[test]
    fn test_user_agent_bounds() {
        let mut s = session(MockInterface::new());
        assert_eq!(s.user_agent(), DEFAULT_USER_AGENT);

        s.set_user_agent("probe-7").unwrap();
        assert_eq!(s.user_agent(), "probe-7");

        let long = "x".repeat(USER_AGENT_CAPACITY + 1);
        let err = s.set_user_agent(&long).unwrap_err();
        assert!(matches!(err, ModemError::BufferOverflow { needed, got } if needed == USER_AGENT_CAPACITY + 1 && got == USER_AGENT_CAPACITY));
        assert_eq!(s.user_agent(), "probe-7");
    }

    #[test]
    fn test_shutdown_without_gprs_is_silent() {
        let mut s = ready_session(MockInterface::new());
        s.shutdown().unwrap();
        assert!(s.modem.interface.written.is_empty());
        let (modem, _bringup) = s.into_parts();
        assert_eq!(modem.gsm_status(), GsmStatus::Ready);
    }

    #[test]
    fn test_shutdown_detaches() {
        let mut mock = MockInterface::new();
        mock.reply("AT+CIPSHUT", "\r\nSHUT OK\r\n").reply("AT+CGATT=0", OK);
        let mut s = session_in(mock, GsmStatus::Attached);

        s.shutdown().unwrap();

        assert_eq!(s.gsm_status(), GsmStatus::Ready);
        assert!(s.modem.interface.sent("AT+CGATT=0"));
    }
}
