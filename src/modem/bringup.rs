// src/modem/bringup.rs

use super::AtModem;
use crate::common::{
    command::AtCommand,
    error::ModemError,
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Level, ModemLog},
    response::AtResult,
    timing, CommLineStatus, GsmStatus,
};
use embedded_hal::digital::OutputPin;

/// Probe reply, framed by the line terminator so `OK` inside other text
/// does not count.
const PROBE_OK: &str = "OK\r\n";

/// Power-on and initial-parameter sequence for the modem.
///
/// Owns the power-key and reset lines; borrows the [`AtModem`] only while
/// the sequence runs.
#[derive(Debug)]
pub struct Bringup<ON, RST> {
    power_key: ON,
    reset: RST,
}

impl<ON, RST> Bringup<ON, RST>
where
    ON: OutputPin,
    RST: OutputPin,
{
    pub fn new(power_key: ON, reset: RST) -> Self {
        Bringup { power_key, reset }
    }

    pub fn into_pins(self) -> (ON, RST) {
        (self.power_key, self.reset)
    }

    /// Brings the modem to `GsmStatus::Ready`.
    ///
    /// Probes with `AT`, pulsing the power key while the modem stays silent,
    /// then disables echo and applies the caller-ID, error-format and SMS
    /// text-mode parameters. A modem that never answers is reported as
    /// `NoResponse`; the caller decides whether to try again.
    pub fn run<IF, L>(&mut self, modem: &mut AtModem<IF, L>) -> Result<(), ModemError<IF::Error>>
    where
        IF: ModemSerial + ModemClock,
        L: ModemLog,
    {
        modem.set_comm_status(CommLineStatus::AtCommand);
        modem.set_gsm_status(GsmStatus::Idle);

        let result = self.power_on(modem);
        modem.set_comm_status(CommLineStatus::Free);
        result?;

        modem.receive(timing::QUICK_DRAIN, None)?;
        self.apply_parameters(modem)?;

        modem.set_gsm_status(GsmStatus::Ready);
        modem_log!(modem.log, Level::Info, "modem is ready");
        Ok(())
    }

    fn power_on<IF, L>(&mut self, modem: &mut AtModem<IF, L>) -> Result<(), ModemError<IF::Error>>
    where
        IF: ModemSerial + ModemClock,
        L: ModemLog,
    {
        // Keep the module out of reset for the whole sequence.
        self.reset.set_low().map_err(|_| ModemError::HardwareUnavailable)?;

        // Best effort: a sleeping module may miss this one.
        modem.send_command(
            &AtCommand::SlowClock { enabled: false },
            timing::PROBE,
            Some(PROBE_OK),
            1,
        )?;

        let mut loops = 0;
        let mut no_response = false;
        for _ in 0..timing::PROBE_LOOPS {
            loops += 1;
            let probe = modem.send_command(
                &AtCommand::Probe,
                timing::PROBE,
                Some(PROBE_OK),
                timing::PROBE_RETRIES,
            )?;

            if probe == AtResult::NoResponse {
                modem_log!(modem.log, Level::Debug, "no response, pulsing power key");
                self.pulse_power_key(modem)?;
                no_response = true;
                modem.receive(timing::PROBE_DRAIN, None)?;
            } else {
                modem_log!(modem.log, Level::Debug, "modem answered, next step to init device");
                no_response = false;
                modem.receive(timing::PROBE_DRAIN, None)?;
                break;
            }
        }

        let confirmed_on = modem.send_command(
            &AtCommand::Probe,
            timing::PROBE,
            Some(PROBE_OK),
            timing::PROBE_RETRIES,
        )? == AtResult::Ok;

        if loops == timing::PROBE_LOOPS && no_response {
            modem_log!(modem.log, Level::Error, "modem does not answer");
            self.pulse_power_key(modem)?;
            return Err(ModemError::NoResponse { stage: "power-on probe" });
        }

        if !confirmed_on {
            modem_log!(modem.log, Level::Error, "modem answered once but did not confirm power-on");
            return Err(ModemError::NoResponse { stage: "power-on confirm" });
        }

        modem_log!(modem.log, Level::Debug, "modem started");
        Ok(())
    }

    fn apply_parameters<IF, L>(&mut self, modem: &mut AtModem<IF, L>) -> Result<(), ModemError<IF::Error>>
    where
        IF: ModemSerial + ModemClock,
        L: ModemLog,
    {
        modem.set_comm_status(CommLineStatus::AtCommand);
        let result = send_parameters(modem);
        modem.set_comm_status(CommLineStatus::Free);
        result
    }

    fn pulse_power_key<IF, L>(&mut self, modem: &mut AtModem<IF, L>) -> Result<(), ModemError<IF::Error>>
    where
        IF: ModemSerial + ModemClock,
        L: ModemLog,
    {
        self.power_key.set_high().map_err(|_| ModemError::HardwareUnavailable)?;
        modem.delay_ms(timing::POWER_PULSE_MS);
        self.power_key.set_low().map_err(|_| ModemError::HardwareUnavailable)?;
        modem.delay_ms(timing::BOOT_WAIT_MS);
        Ok(())
    }
}

/// Parameters are best effort: a refusal is logged and the sequence goes on.
fn send_parameters<IF, L>(modem: &mut AtModem<IF, L>) -> Result<(), ModemError<IF::Error>>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    if modem.set_echo(false)? == AtResult::NoResponse {
        modem_log!(modem.log, Level::Warn, "echo could not be disabled");
    }
    for cmd in [
        AtCommand::CallerId { enabled: true },
        AtCommand::ErrorFormat { level: 0 },
        AtCommand::SmsTextMode,
    ] {
        let result = modem.send_command(&cmd, timing::PARAMETER, Some("OK"), timing::PARAMETER_RETRIES)?;
        if result == AtResult::NoResponse {
            modem_log!(modem.log, Level::Warn, "{} was not accepted", cmd.name());
        }
    }
    Ok(())
}
