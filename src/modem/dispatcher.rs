// src/modem/dispatcher.rs

use super::AtModem;
use crate::common::{
    command::AtCommand,
    error::ModemError,
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Compact, Level, ModemLog},
    response::{AtResult, ReceiveStatus},
    timing::{self, TimeoutPair},
};

impl<IF, L> AtModem<IF, L>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    /// Sends one AT command line and waits for its response, retrying up to
    /// `retry_count` attempts in total with a fixed gap between attempts.
    ///
    /// An attempt succeeds on `Finished`, or on `FinishedMatch` when
    /// `expected` is given. An empty command is rejected without touching
    /// the transport.
    pub fn send(
        &mut self,
        command: &str,
        timeouts: TimeoutPair,
        expected: Option<&str>,
        retry_count: u8,
    ) -> Result<AtResult, ModemError<IF::Error>> {
        if command.is_empty() {
            modem_log!(self.log, Level::Error, "AT command is missing!");
            return Ok(AtResult::NoResponse);
        }

        for attempt in 0..retry_count {
            if attempt > 0 {
                self.interface.delay_ms(timing::RETRY_GAP_MS);
            }

            modem_log!(self.log, Level::Trace, "tx: {}", command);
            self.write_line(command.as_bytes())?;

            if self.receive(timeouts, expected)?.is_success() {
                return Ok(AtResult::Ok);
            }
            modem_log!(
                self.log,
                Level::Debug,
                "'{}' attempt {}/{} failed",
                command,
                attempt + 1,
                retry_count
            );
        }

        Ok(AtResult::NoResponse)
    }

    /// [`send`](Self::send) for a typed command.
    pub fn send_command(
        &mut self,
        command: &AtCommand<'_>,
        timeouts: TimeoutPair,
        expected: Option<&str>,
        retry_count: u8,
    ) -> Result<AtResult, ModemError<IF::Error>> {
        let line = command.format_into()?;
        self.send(line.as_str(), timeouts, expected, retry_count)
    }

    /// Single write of `command` followed by one receive. No retries.
    pub fn exchange(
        &mut self,
        command: &AtCommand<'_>,
        timeouts: TimeoutPair,
        expected: Option<&str>,
    ) -> Result<ReceiveStatus, ModemError<IF::Error>> {
        let line = command.format_into()?;
        modem_log!(self.log, Level::Trace, "tx: {}", line.as_str());
        self.write_line(line.as_bytes())?;
        self.receive(timeouts, expected)
    }

    /// One stage of a multi-step operation: [`exchange`](Self::exchange)
    /// and turn a failure status into an error naming the stage.
    pub fn step(
        &mut self,
        command: &AtCommand<'_>,
        timeouts: TimeoutPair,
        expected: &str,
    ) -> Result<(), ModemError<IF::Error>> {
        let status = self.exchange(command, timeouts, Some(expected))?;
        self.check_stage(status, command.name())
    }

    /// Maps {TimeoutError, FinishedMismatch} to `NoResponse` /
    /// `UnexpectedResponse` and logs the failing stage.
    pub fn check_stage(
        &self,
        status: ReceiveStatus,
        stage: &'static str,
    ) -> Result<(), ModemError<IF::Error>> {
        match status {
            ReceiveStatus::TimeoutError => {
                modem_log!(self.log, Level::Error, "{}: no response from modem", stage);
                Err(ModemError::NoResponse { stage })
            }
            ReceiveStatus::FinishedMismatch => {
                modem_log!(
                    self.log,
                    Level::Error,
                    "{}: unexpected response '{}'",
                    stage,
                    Compact(self.buffer.as_bytes())
                );
                Err(ModemError::UnexpectedResponse { stage })
            }
            ReceiveStatus::Finished | ReceiveStatus::FinishedMatch => Ok(()),
        }
    }

    /// Switches local command echo.
    pub fn set_echo(&mut self, on: bool) -> Result<AtResult, ModemError<IF::Error>> {
        self.send_command(
            &AtCommand::Echo { on },
            timing::PARAMETER,
            Some("OK"),
            timing::PARAMETER_RETRIES,
        )
    }
}
