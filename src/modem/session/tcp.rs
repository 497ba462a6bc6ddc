// src/modem/session/tcp.rs

use super::SessionManager;
use crate::common::{
    command::AtCommand,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Compact, Level, ModemLog},
    response::{ReceiveStatus, ResponseBuffer},
    timing, CommLineStatus, GsmStatus,
};
use crate::modem::receiver::ESCAPE_SEQUENCE;
use embedded_hal::digital::OutputPin;

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    /// Opens a TCP client connection. In non-transparent mode the send
    /// window is primed as well, so the modem is waiting at its `>` prompt
    /// when this returns.
    pub fn connect_tcp(&mut self, server: &str, port: u16) -> Result<(), ModemError<IF::Error>> {
        self.require_initialized()?;
        if server.is_empty() {
            return Err(Precondition::MissingArgument.into());
        }
        if !self.modem.gsm_status().has_gprs() {
            modem_log!(self.modem.log, Level::Error, "no GPRS connection");
            return Err(Precondition::WrongGsmStatus.into());
        }

        self.modem.set_comm_status(CommLineStatus::AtCommand);
        match self.connect_sequence(server, port) {
            Ok(()) => {
                modem_log!(self.modem.log, Level::Debug, "connected to server {}:{}", server, port);
                self.modem.set_gsm_status(GsmStatus::TcpClientConnected);
                self.modem.set_comm_status(CommLineStatus::Data);
                Ok(())
            }
            Err(e) => {
                self.modem.set_comm_status(CommLineStatus::Free);
                Err(e)
            }
        }
    }

    fn connect_sequence(&mut self, server: &str, port: u16) -> Result<(), ModemError<IF::Error>> {
        let modem = &mut self.modem;
        let transparent = modem.data_mode().is_transparent();

        modem.step(&AtCommand::TcpStart { host: server, port }, timing::TCP_CONNECT, "OK")?;

        // The connect result usually trails the command's OK. In transparent
        // mode the marker is a prefix of CONNECT FAIL, so refusals go first.
        let connected = if transparent { "CONNECT" } else { "CONNECT OK" };
        if connect_refused(modem.response()) {
            modem_log!(modem.log, Level::Warn, "connection refused: {}", Compact(modem.response().as_bytes()));
            return Err(ModemError::UnexpectedResponse { stage: "tcp connect" });
        }
        if !modem.response().contains(connected) {
            modem_log!(modem.log, Level::Trace, "resp: {}", Compact(modem.response().as_bytes()));
            let status = modem.receive(timing::TCP_CONNECT_CONFIRM, Some(connected))?;
            if connect_refused(modem.response()) {
                modem_log!(modem.log, Level::Warn, "connection refused: {}", Compact(modem.response().as_bytes()));
                return Err(ModemError::UnexpectedResponse { stage: "tcp connect confirm" });
            }
            modem.check_stage(status, "tcp connect confirm")?;
        }
        modem.delay_ms(timing::TCP_CONNECT_SETTLE_MS);

        // CIPSEND only exists in non-transparent mode.
        if !transparent {
            modem.step(&AtCommand::TcpSend, timing::SEND_PROMPT, ">")?;
            modem_log!(modem.log, Level::Debug, "opened connection for data sending");
        }
        Ok(())
    }

    /// Closes the active TCP session. A transparent session is escaped to
    /// command mode first. The close itself is best effort: a missing
    /// confirmation is logged and the session is considered gone.
    pub fn disconnect_tcp(&mut self) -> Result<(), ModemError<IF::Error>> {
        self.require_initialized()?;
        let prior = self.modem.gsm_status();
        if !prior.has_tcp_session() {
            modem_log!(self.modem.log, Level::Info, "no TCP session to close");
            return Err(Precondition::WrongGsmStatus.into());
        }

        self.modem.set_comm_status(CommLineStatus::AtCommand);
        let result = self.close_sequence();
        self.modem.set_comm_status(CommLineStatus::Free);
        result?;

        self.modem.set_gsm_status(if prior == GsmStatus::TcpClientConnected {
            GsmStatus::Attached
        } else {
            GsmStatus::TcpServerWait
        });
        Ok(())
    }

    fn close_sequence(&mut self) -> Result<(), ModemError<IF::Error>> {
        if self.modem.data_mode().is_transparent() && !self.escape_data_mode()?.is_success() {
            modem_log!(self.modem.log, Level::Warn, "modem did not confirm leaving data mode");
        }

        let status = self.modem.exchange(&AtCommand::TcpClose, timing::TCP_CLOSE, Some("CLOSE OK"))?;
        if status.is_failure() {
            modem_log!(self.modem.log, Level::Warn, "TCP close not confirmed: {}", Compact(self.modem.response().as_bytes()));
        }
        Ok(())
    }

    /// Leaves transparent data mode: guard time, `+++`, then wait for the
    /// modem's `OK`.
    pub(super) fn escape_data_mode(&mut self) -> Result<ReceiveStatus, ModemError<IF::Error>> {
        self.modem.delay_ms(timing::ESCAPE_GUARD_MS);
        self.modem.write_bytes(ESCAPE_SEQUENCE)?;
        self.modem.receive(timing::ESCAPE_CONFIRM, Some("OK"))
    }
}

fn connect_refused(response: &ResponseBuffer) -> bool {
    response.contains("CONNECT FAIL") || response.contains("ERROR")
}
