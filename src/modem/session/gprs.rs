// src/modem/session/gprs.rs

use super::SessionManager;
use crate::common::{
    command::AtCommand,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Compact, Level, ModemLog},
    response::ReceiveStatus,
    timing, CommLineStatus, DataMode, GsmStatus,
};
use embedded_hal::digital::OutputPin;

/// Result of a successful [`SessionManager::attach_gprs`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// A new PDP context was started and an IP address assigned.
    Connected,
    /// The modem still held an IP address from an earlier session. Leftover
    /// TCP state was torn down; no new context was started.
    StaleSessionCleared,
}

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    /// Attaches to the packet service and brings up an IP connection.
    ///
    /// `transparent` selects the data mode used by later TCP sessions. On a
    /// failing stage the GSM status is left as it was.
    pub fn attach_gprs(
        &mut self,
        apn: &str,
        user: &str,
        password: &str,
        transparent: bool,
    ) -> Result<AttachOutcome, ModemError<IF::Error>> {
        self.require_initialized()?;
        if self.modem.gsm_status().has_tcp_session() {
            return Err(Precondition::WrongGsmStatus.into());
        }

        modem_log!(self.modem.log, Level::Debug, "establishing GPRS connection");
        self.modem.set_comm_status(CommLineStatus::AtCommand);
        let result = self.attach_sequence(apn, user, password, transparent);
        self.modem.set_comm_status(CommLineStatus::Free);

        match &result {
            Ok(AttachOutcome::Connected) => {
                modem_log!(self.modem.log, Level::Info, "GPRS attached");
            }
            Ok(AttachOutcome::StaleSessionCleared) => {
                modem_log!(self.modem.log, Level::Warn, "modem already had an IP address, stale session cleared");
            }
            Err(e) => {
                modem_log!(self.modem.log, Level::Error, "GPRS attach failed: {}", e);
            }
        }
        result
    }

    fn attach_sequence(
        &mut self,
        apn: &str,
        user: &str,
        password: &str,
        transparent: bool,
    ) -> Result<AttachOutcome, ModemError<IF::Error>> {
        let modem = &mut self.modem;

        modem.delay_ms(timing::ATTACH_SETTLE_MS);
        modem.receive(timing::QUICK_DRAIN, None)?;

        modem.step(&AtCommand::DataMode { transparent }, timing::DATA_MODE, "OK")?;
        modem.set_data_mode(DataMode::from_transparent(transparent));

        modem.step(&AtCommand::GprsAttach { attach: true }, timing::GPRS_ATTACH, "OK")?;

        // Without an address the modem answers ERROR.
        match modem.exchange(&AtCommand::LocalIp, timing::IP_QUERY, Some("ERROR"))? {
            ReceiveStatus::FinishedMatch | ReceiveStatus::Finished => {}
            ReceiveStatus::FinishedMismatch => {
                modem_log!(modem.log, Level::Debug, "already have an IP: {}", Compact(modem.response().as_bytes()));

                modem.exchange(&AtCommand::TcpClose, timing::QUICK_DRAIN, None)?;
                modem.delay_ms(timing::STALE_CLOSE_SETTLE_MS);
                let status = modem.exchange(&AtCommand::TcpServerOff, timing::LISTENER_TEARDOWN, Some("OK"))?;
                if !status.is_success() {
                    modem_log!(modem.log, Level::Debug, "no listener to tear down");
                }
                return Ok(AttachOutcome::StaleSessionCleared);
            }
            ReceiveStatus::TimeoutError => {
                modem_log!(modem.log, Level::Error, "ip query: no response from modem");
                return Err(ModemError::NoResponse { stage: "ip query" });
            }
        }

        modem_log!(modem.log, Level::Debug, "creating new connection");
        modem.step(&AtCommand::BearerShut, timing::BEARER_SHUT, "SHUT OK")?;
        modem.delay_ms(timing::BEARER_SHUT_SETTLE_MS);

        modem.step(&AtCommand::StartTask { apn, user, password }, timing::PDP_START, "OK")?;
        modem_log!(modem.log, Level::Debug, "connected to APN");
        modem.delay_ms(timing::PDP_START_SETTLE_MS);

        modem.step(&AtCommand::BringUpWireless, timing::IP_BRINGUP, "OK")?;
        modem.delay_ms(timing::IP_BRINGUP_SETTLE_MS);

        match modem.exchange(&AtCommand::LocalIp, timing::IP_QUERY, Some("ERROR"))? {
            ReceiveStatus::FinishedMismatch => {
                modem_log!(modem.log, Level::Debug, "IP address was assigned");
                modem.set_gsm_status(GsmStatus::Attached);
                Ok(AttachOutcome::Connected)
            }
            ReceiveStatus::TimeoutError => Err(ModemError::NoResponse { stage: "ip assignment" }),
            ReceiveStatus::FinishedMatch | ReceiveStatus::Finished => {
                modem_log!(modem.log, Level::Error, "no IP address after connection: {}", Compact(modem.response().as_bytes()));
                Err(ModemError::UnexpectedResponse { stage: "ip assignment" })
            }
        }
    }

    /// Closes any TCP session, releases the bearer and detaches from the
    /// packet service. Succeeds immediately when nothing is attached.
    pub fn detach_gprs(&mut self) -> Result<(), ModemError<IF::Error>> {
        self.require_initialized()?;
        if self.modem.gsm_status() == GsmStatus::Idle {
            return Ok(());
        }

        if self.modem.gsm_status().has_tcp_session() {
            if let Err(e) = self.disconnect_tcp() {
                modem_log!(self.modem.log, Level::Warn, "TCP disconnect before detach failed: {}", e);
            }
        }

        self.modem.set_comm_status(CommLineStatus::AtCommand);
        let result = self.detach_sequence();
        self.modem.set_comm_status(CommLineStatus::Free);

        match result {
            Ok(()) => {
                modem_log!(self.modem.log, Level::Info, "GPRS connection closed");
                self.modem.set_gsm_status(GsmStatus::Ready);
                Ok(())
            }
            Err(e) => {
                self.modem.set_gsm_status(GsmStatus::Error);
                Err(e)
            }
        }
    }

    fn detach_sequence(&mut self) -> Result<(), ModemError<IF::Error>> {
        self.modem.step(&AtCommand::BearerShut, timing::BEARER_SHUT, "SHUT OK")?;
        self.modem.step(&AtCommand::GprsAttach { attach: false }, timing::GPRS_ATTACH, "OK")
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::modem::mock::MockInterface;

    const NO_IP: &str = "\r\nERROR\r\n";

    fn attach_replies(mock: &mut MockInterface) {
        mock.reply("AT+CIPMODE", OK)
            .reply("AT+CGATT=1", OK)
            .reply("AT+CIPSHUT", "\r\nSHUT OK\r\n")
            .reply("AT+CSTT", OK)
            .reply("AT+CIICR", OK);
    }

    #[test]
    fn test_attach_creates_new_connection() {
        let mut mock = MockInterface::new();
        attach_replies(&mut mock);
        mock.reply_once("AT+CIFSR", NO_IP);
        mock.reply("AT+CIFSR", "\r\n10.64.12.7\r\n");
        let mut s = ready_session(mock);

        let outcome = s.attach_gprs("internet", "user", "pass", false).unwrap();

        assert_eq!(outcome, AttachOutcome::Connected);
        assert_eq!(s.gsm_status(), GsmStatus::Attached);
        assert_eq!(s.modem.data_mode(), DataMode::NonTransparent);
        assert_eq!(s.modem.comm_status(), CommLineStatus::Free);
        let iface = &s.modem.interface;
        assert!(iface.sent("AT+CSTT=\"internet\",\"user\",\"pass\"\r\n"));
        let order = ["AT+CIPMODE=0", "AT+CGATT=1", "AT+CIFSR", "AT+CIPSHUT", "AT+CSTT", "AT+CIICR"]
            .map(|p| iface.position(p).unwrap());
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(iface.count_sent("AT+CIFSR"), 2);
    }

    #[test]
    fn test_attach_with_existing_ip_skips_context_start() {
        let mut mock = MockInterface::new();
        attach_replies(&mut mock);
        mock.reply("AT+CIFSR", "\r\n10.64.12.7\r\n")
            .reply("AT+CIPCLOSE", "\r\nERROR\r\n")
            .reply("AT+CIPSERVER=0", "\r\nERROR\r\n");
        let mut s = ready_session(mock);

        let outcome = s.attach_gprs("internet", "", "", true).unwrap();

        assert_eq!(outcome, AttachOutcome::StaleSessionCleared);
        assert_eq!(s.gsm_status(), GsmStatus::Ready);
        assert_eq!(s.modem.data_mode(), DataMode::Transparent);
        let iface = &s.modem.interface;
        assert!(iface.sent("AT+CIPCLOSE"));
        assert!(iface.sent("AT+CIPSERVER=0"));
        assert!(!iface.sent("AT+CIPSHUT"));
        assert!(!iface.sent("AT+CSTT"));
        assert!(!iface.sent("AT+CIICR"));
    }

    #[test]
    fn test_attach_stops_at_failing_stage() {
        let mut mock = MockInterface::new();
        mock.reply("AT+CIPMODE", OK).reply("AT+CGATT=1", "\r\nERROR\r\n");
        let mut s = ready_session(mock);

        let err = s.attach_gprs("internet", "", "", false).unwrap_err();

        assert!(matches!(err, ModemError::UnexpectedResponse { stage: "gprs attach" }));
        assert_eq!(s.gsm_status(), GsmStatus::Ready);
        assert!(!s.modem.interface.sent("AT+CIFSR"));
        assert!(s.modem.logger().contains(Level::Error, "gprs attach"));
    }

    #[test]
    fn test_attach_without_ip_after_bringup_fails() {
        let mut mock = MockInterface::new();
        attach_replies(&mut mock);
        mock.reply("AT+CIFSR", NO_IP);
        let mut s = ready_session(mock);

        let err = s.attach_gprs("internet", "", "", false).unwrap_err();

        assert!(matches!(err, ModemError::UnexpectedResponse { stage: "ip assignment" }));
        assert_eq!(s.gsm_status(), GsmStatus::Ready);
    }

    #[test]
    fn test_attach_silent_ip_query_is_no_response() {
        let mut mock = MockInterface::new();
        mock.reply("AT+CIPMODE", OK).reply("AT+CGATT=1", OK);
        let mut s = ready_session(mock);

        let err = s.attach_gprs("internet", "", "", false).unwrap_err();
        assert!(matches!(err, ModemError::NoResponse { stage: "ip query" }));
        assert!(!s.modem.interface.sent("AT+CIPCLOSE"));
    }

    #[test]
    fn test_attach_requires_bring_up() {
        let mut s = session(MockInterface::new());
        let err = s.attach_gprs("internet", "", "", false).unwrap_err();
        assert!(matches!(err, ModemError::PreconditionFailed(Precondition::NotInitialized)));
        assert!(s.modem.interface.written.is_empty());
    }

    #[test]
    fn test_detach_when_idle_is_noop() {
        let mut s = session_in(MockInterface::new(), GsmStatus::Idle);
        s.detach_gprs().unwrap();
        assert!(s.modem.interface.written.is_empty());
    }

    #[test]
    fn test_detach_closes_tcp_first() {
        let mut mock = MockInterface::new();
        mock.reply("AT+CIPCLOSE", "\r\nCLOSE OK\r\n")
            .reply("AT+CIPSHUT", "\r\nSHUT OK\r\n")
            .reply("AT+CGATT=0", OK);
        let mut s = session_in(mock, GsmStatus::TcpClientConnected);

        s.detach_gprs().unwrap();

        assert_eq!(s.gsm_status(), GsmStatus::Ready);
        let iface = &s.modem.interface;
        assert!(iface.position("AT+CIPCLOSE").unwrap() < iface.position("AT+CIPSHUT").unwrap());
        assert!(iface.position("AT+CIPSHUT").unwrap() < iface.position("AT+CGATT=0").unwrap());
    }

    #[test]
    fn test_detach_failure_sets_error() {
        let mut mock = MockInterface::new();
        mock.reply("AT+CIPSHUT", "\r\nSHUT OK\r\n").reply("AT+CGATT=0", "\r\nERROR\r\n");
        let mut s = session_in(mock, GsmStatus::Attached);

        let err = s.detach_gprs().unwrap_err();

        assert!(matches!(err, ModemError::UnexpectedResponse { stage: "gprs detach" }));
        assert_eq!(s.gsm_status(), GsmStatus::Error);
    }

    #[test]
    fn test_detach_bearer_release_timeout_sets_error() {
        let mut s = session_in(MockInterface::new(), GsmStatus::Attached);

        let err = s.detach_gprs().unwrap_err();

        assert!(matches!(err, ModemError::NoResponse { stage: "bearer shut" }));
        assert_eq!(s.gsm_status(), GsmStatus::Error);
        assert!(!s.modem.interface.sent("AT+CGATT=0"));
    }
}
