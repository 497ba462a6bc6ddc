//! AT command definitions for the SIM900 command interpreter.
//!
//! Only the subset the engine issues is modelled. Each variant renders the
//! command line *without* its CR LF terminator; the dispatcher appends it.

use core::fmt::{self, Write};

use arrayvec::ArrayString;

use super::ModemError;

/// Capacity of a formatted command line. The longest line is `AT+CSTT` with
/// APN, user and password.
pub const COMMAND_LINE_CAPACITY: usize = 160;

pub type CommandLine = ArrayString<COMMAND_LINE_CAPACITY>;

/// Represents one AT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// Bare `AT` - liveness probe.
    Probe,
    /// `ATE0` / `ATE1` - local command echo.
    Echo { on: bool },
    /// `AT+CSCLK=n` - slow clock (sleep) mode.
    SlowClock { enabled: bool },
    /// `AT+CLIP=1` - caller line identification notifications.
    CallerId { enabled: bool },
    /// `AT+CMEE=n` - error result format (0 = plain `ERROR`).
    ErrorFormat { level: u8 },
    /// `AT+CMGF=1` - SMS text mode.
    SmsTextMode,
    /// `AT+CIPMODE=n` - transparent (1) or command-mode (0) TCP data.
    DataMode { transparent: bool },
    /// `AT+CGATT=n` - packet service attach/detach.
    GprsAttach { attach: bool },
    /// `AT+CIFSR` - local IP address.
    LocalIp,
    /// `AT+CIPCLOSE` - close the TCP connection.
    TcpClose,
    /// `AT+CIPSERVER=0` - stop listening as a TCP server.
    TcpServerOff,
    /// `AT+CIPSHUT` - deactivate the GPRS PDP context.
    BearerShut,
    /// `AT+CSTT="apn","user","pwd"` - start task with APN credentials.
    StartTask {
        apn: &'a str,
        user: &'a str,
        password: &'a str,
    },
    /// `AT+CIICR` - bring up the wireless connection.
    BringUpWireless,
    /// `AT+CIPSTART="TCP","host",port`.
    TcpStart { host: &'a str, port: u16 },
    /// `AT+CIPSEND` - open the send window, modem answers with `>`.
    TcpSend,
    /// `AT+CIPSTATUS` - connection state.
    TcpStatus,
    /// `ATO` - return to data mode from transparent command mode.
    ReturnToData,
    /// `AT+CMGS="number"` - send SMS, modem answers with `>`.
    SmsSend { number: &'a str },
    /// `AT+CMGR=n` - read SMS at storage index.
    SmsRead { index: u8 },
    /// `AT+GSN` - IMEI.
    Imei,
    /// `AT+CCID` - SIM card identifier.
    Ccid,
    /// `AT+CPIN?` - SIM lock state.
    PinQuery,
    /// `AT+CPIN=pin`.
    PinEnter { pin: &'a str },
}

impl fmt::Display for AtCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Probe => f.write_str("AT"),
            AtCommand::Echo { on } => write!(f, "ATE{}", u8::from(*on)),
            AtCommand::SlowClock { enabled } => write!(f, "AT+CSCLK={}", u8::from(*enabled)),
            AtCommand::CallerId { enabled } => write!(f, "AT+CLIP={}", u8::from(*enabled)),
            AtCommand::ErrorFormat { level } => {
                if *level <= 2 {
                    write!(f, "AT+CMEE={}", level)
                } else {
                    Err(fmt::Error)
                }
            }
            AtCommand::SmsTextMode => f.write_str("AT+CMGF=1"),
            AtCommand::DataMode { transparent } => {
                write!(f, "AT+CIPMODE={}", u8::from(*transparent))
            }
            AtCommand::GprsAttach { attach } => write!(f, "AT+CGATT={}", u8::from(*attach)),
            AtCommand::LocalIp => f.write_str("AT+CIFSR"),
            AtCommand::TcpClose => f.write_str("AT+CIPCLOSE"),
            AtCommand::TcpServerOff => f.write_str("AT+CIPSERVER=0"),
            AtCommand::BearerShut => f.write_str("AT+CIPSHUT"),
            AtCommand::StartTask {
                apn,
                user,
                password,
            } => {
                // Quotes would terminate the argument early on the modem side.
                if [apn, user, password].iter().any(|s| s.contains('"')) {
                    return Err(fmt::Error);
                }
                write!(f, "AT+CSTT=\"{}\",\"{}\",\"{}\"", apn, user, password)
            }
            AtCommand::BringUpWireless => f.write_str("AT+CIICR"),
            AtCommand::TcpStart { host, port } => {
                if host.is_empty() || host.contains('"') {
                    return Err(fmt::Error);
                }
                write!(f, "AT+CIPSTART=\"TCP\",\"{}\",{}", host, port)
            }
            AtCommand::TcpSend => f.write_str("AT+CIPSEND"),
            AtCommand::TcpStatus => f.write_str("AT+CIPSTATUS"),
            AtCommand::ReturnToData => f.write_str("ATO"),
            AtCommand::SmsSend { number } => {
                if number.is_empty() || number.contains('"') {
                    return Err(fmt::Error);
                }
                write!(f, "AT+CMGS=\"{}\"", number)
            }
            AtCommand::SmsRead { index } => {
                // Storage positions are 1-based.
                if *index == 0 {
                    Err(fmt::Error)
                } else {
                    write!(f, "AT+CMGR={}", index)
                }
            }
            AtCommand::Imei => f.write_str("AT+GSN"),
            AtCommand::Ccid => f.write_str("AT+CCID"),
            AtCommand::PinQuery => f.write_str("AT+CPIN?"),
            AtCommand::PinEnter { pin } => {
                if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(fmt::Error);
                }
                write!(f, "AT+CPIN={}", pin)
            }
        }
    }
}

impl AtCommand<'_> {
    /// Renders the command line into a fixed-capacity buffer.
    pub fn format_into<E: fmt::Debug>(&self) -> Result<CommandLine, ModemError<E>> {
        let mut line = CommandLine::new();
        write!(line, "{}", self)
            .map_err(|_| ModemError::CommandFormat("AT command does not fit or has invalid arguments"))?;
        Ok(line)
    }

    /// Short human-readable name used in log lines and error stages.
    pub fn name(&self) -> &'static str {
        match self {
            AtCommand::Probe => "probe",
            AtCommand::Echo { .. } => "echo",
            AtCommand::SlowClock { .. } => "sleep mode",
            AtCommand::CallerId { .. } => "caller id",
            AtCommand::ErrorFormat { .. } => "error format",
            AtCommand::SmsTextMode => "sms text mode",
            AtCommand::DataMode { .. } => "data mode",
            AtCommand::GprsAttach { attach: true } => "gprs attach",
            AtCommand::GprsAttach { attach: false } => "gprs detach",
            AtCommand::LocalIp => "ip query",
            AtCommand::TcpClose => "tcp close",
            AtCommand::TcpServerOff => "tcp server off",
            AtCommand::BearerShut => "bearer shut",
            AtCommand::StartTask { .. } => "pdp start",
            AtCommand::BringUpWireless => "ip bring-up",
            AtCommand::TcpStart { .. } => "tcp connect",
            AtCommand::TcpSend => "send prompt",
            AtCommand::TcpStatus => "tcp status",
            AtCommand::ReturnToData => "return to data mode",
            AtCommand::SmsSend { .. } => "sms recipient",
            AtCommand::SmsRead { .. } => "sms read",
            AtCommand::Imei => "imei",
            AtCommand::Ccid => "ccid",
            AtCommand::PinQuery => "pin query",
            AtCommand::PinEnter { .. } => "pin entry",
        }
    }
}
