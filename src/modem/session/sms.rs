// src/modem/session/sms.rs

use super::SessionManager;
use crate::common::{
    command::AtCommand,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Level, ModemLog},
    response::ReceiveStatus,
    timing, CommLineStatus, GsmStatus, SmsStatus,
};
use crate::modem::receiver::CTRL_Z;
use embedded_hal::digital::OutputPin;

/// Longest text accepted by [`SessionManager::send_sms`].
pub const SMS_MAX_LEN: usize = 159;

/// Stored message as reported by `AT+CMGR`.
///
/// Sender and body are not split out; `raw` is the full modem response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SmsReadout<'a> {
    pub status: SmsStatus,
    pub raw: &'a [u8],
}

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    /// Sends a text message, trying up to `SMS_SEND_ATTEMPTS` times.
    ///
    /// Only allowed while the comm line is free and the GSM status is
    /// `Idle`.
    pub fn send_sms(&mut self, number: &str, text: &str) -> Result<(), ModemError<IF::Error>> {
        if number.is_empty() {
            modem_log!(self.modem.log, Level::Error, "number to send SMS is missing");
            return Err(Precondition::MissingArgument.into());
        }
        if text.len() > SMS_MAX_LEN {
            modem_log!(self.modem.log, Level::Error, "can not send message longer than {} characters", SMS_MAX_LEN);
            return Err(Precondition::SmsTooLong.into());
        }
        self.require_initialized()?;
        if self.modem.comm_status() != CommLineStatus::Free {
            modem_log!(self.modem.log, Level::Warn, "comm line is not free");
            return Err(Precondition::CommLineBusy.into());
        }
        if self.modem.gsm_status() != GsmStatus::Idle {
            modem_log!(self.modem.log, Level::Warn, "GSM status is not idle");
            return Err(Precondition::WrongGsmStatus.into());
        }

        modem_log!(self.modem.log, Level::Debug, "trying to send SMS to number {}", number);
        self.modem.set_comm_status(CommLineStatus::AtCommand);
        let result = self.sms_attempts(number, text);
        self.modem.set_comm_status(CommLineStatus::Free);

        match &result {
            Ok(()) => modem_log!(self.modem.log, Level::Info, "SMS was sent successfully"),
            Err(e) => modem_log!(self.modem.log, Level::Error, "SMS was not sent: {}", e),
        }
        result
    }

    fn sms_attempts(&mut self, number: &str, text: &str) -> Result<(), ModemError<IF::Error>> {
        let recipient = AtCommand::SmsSend { number };
        let mut failed = (ReceiveStatus::TimeoutError, recipient.name());

        for _ in 0..timing::SMS_SEND_ATTEMPTS {
            let prompt = self.modem.exchange(&recipient, timing::SMS_PROMPT, Some(">"))?;
            if prompt != ReceiveStatus::FinishedMatch {
                failed = (prompt, recipient.name());
                continue;
            }

            self.modem.write_bytes(text.as_bytes())?;
            self.modem.write_bytes(&[CTRL_Z])?;

            let confirm = self.modem.receive(timing::SMS_SEND_CONFIRM, Some("+CMGS"))?;
            if confirm == ReceiveStatus::FinishedMatch {
                return Ok(());
            }
            failed = (confirm, "sms confirm");
        }

        let (status, stage) = failed;
        self.modem.check_stage(status, stage)
    }

    /// Reads the message stored at `position` (1-based).
    ///
    /// An empty slot is `SmsStatus::NoSms`, not an error; a modem that does
    /// not answer is `NoResponse`.
    pub fn get_sms(&mut self, position: u8) -> Result<SmsReadout<'_>, ModemError<IF::Error>> {
        if position == 0 {
            modem_log!(self.modem.log, Level::Error, "can not access SMS position 0");
            return Err(Precondition::InvalidSmsPosition.into());
        }
        self.require_initialized()?;
        if self.modem.comm_status() != CommLineStatus::Free {
            modem_log!(self.modem.log, Level::Warn, "comm line is not free");
            return Err(Precondition::CommLineBusy.into());
        }

        self.modem.set_comm_status(CommLineStatus::AtCommand);
        let result = self
            .modem
            .exchange(&AtCommand::SmsRead { index: position }, timing::SMS_READ, Some("+CMGR"));
        self.modem.set_comm_status(CommLineStatus::Free);

        let status = match result? {
            ReceiveStatus::TimeoutError => {
                modem_log!(self.modem.log, Level::Error, "sms read: no response from modem");
                return Err(ModemError::NoResponse { stage: "sms read" });
            }
            // OK or ERROR without a +CMGR header: nothing stored there.
            ReceiveStatus::FinishedMismatch => SmsStatus::NoSms,
            ReceiveStatus::FinishedMatch | ReceiveStatus::Finished => {
                SmsStatus::classify(self.modem.response().as_bytes())
            }
        };

        Ok(SmsReadout {
            status,
            raw: self.modem.response().as_bytes(),
        })
    }
}
