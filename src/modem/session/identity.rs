// src/modem/session/identity.rs

use super::SessionManager;
use crate::common::{
    command::AtCommand,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Level, ModemLog},
    response::ReceiveStatus,
    timing, GsmStatus,
};
use embedded_hal::digital::OutputPin;

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    /// Module serial number (`AT+GSN`).
    pub fn imei(&mut self) -> Result<&str, ModemError<IF::Error>> {
        self.require_initialized()?;
        self.query_line(&AtCommand::Imei, Some("OK"))
    }

    /// SIM card identifier (`AT+CCID`). Only asked while `Ready`.
    pub fn ccid(&mut self) -> Result<&str, ModemError<IF::Error>> {
        self.require_initialized()?;
        if self.modem.gsm_status() != GsmStatus::Ready {
            return Err(Precondition::WrongGsmStatus.into());
        }
        self.query_line(&AtCommand::Ccid, Some("OK"))
    }

    /// Address assigned by the network (`AT+CIFSR`).
    pub fn local_ip(&mut self) -> Result<&str, ModemError<IF::Error>> {
        self.require_initialized()?;
        if !self.modem.gsm_status().has_gprs() {
            return Err(Precondition::WrongGsmStatus.into());
        }
        // The address comes without a final OK; ERROR means none is assigned.
        let status = self.modem.exchange(&AtCommand::LocalIp, timing::IP_QUERY, Some("ERROR"))?;
        match status {
            ReceiveStatus::FinishedMismatch => self.info_text("ip query"),
            ReceiveStatus::TimeoutError => {
                modem_log!(self.modem.log, Level::Error, "ip query: no response from modem");
                Err(ModemError::NoResponse { stage: "ip query" })
            }
            ReceiveStatus::FinishedMatch | ReceiveStatus::Finished => {
                modem_log!(self.modem.log, Level::Warn, "no IP address assigned");
                Err(ModemError::UnexpectedResponse { stage: "ip query" })
            }
        }
    }

    /// Enters `pin` if the SIM is waiting for one.
    ///
    /// Returns `true` when the PIN was entered, `false` when the SIM was
    /// already unlocked. Any other lock state (PUK, PH-SIM, ...) is an
    /// `UnexpectedResponse`.
    pub fn unlock_sim(&mut self, pin: &str) -> Result<bool, ModemError<IF::Error>> {
        self.require_initialized()?;
        if pin.is_empty() {
            return Err(Precondition::MissingArgument.into());
        }

        self.modem.step(&AtCommand::PinQuery, timing::SIM_PIN, "+CPIN:")?;
        let response = self.modem.response();
        if response.contains("READY") {
            return Ok(false);
        }
        if !response.contains("SIM PIN") {
            modem_log!(self.modem.log, Level::Error, "SIM is locked in an unsupported state");
            return Err(ModemError::UnexpectedResponse { stage: "pin query" });
        }

        self.modem.step(&AtCommand::PinEnter { pin }, timing::SIM_PIN, "OK")?;
        modem_log!(self.modem.log, Level::Info, "SIM unlocked");
        Ok(true)
    }

    fn query_line(
        &mut self,
        command: &AtCommand<'_>,
        expected: Option<&str>,
    ) -> Result<&str, ModemError<IF::Error>> {
        let status = self.modem.exchange(command, timing::IDENTITY_QUERY, expected)?;
        self.modem.check_stage(status, command.name())?;
        self.info_text(command.name())
    }

    fn info_text(&self, stage: &'static str) -> Result<&str, ModemError<IF::Error>> {
        self.modem
            .response()
            .info_line()
            .and_then(|line| core::str::from_utf8(line).ok())
            .ok_or(ModemError::UnexpectedResponse { stage })
    }
}
