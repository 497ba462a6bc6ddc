// src/modem/receiver.rs

use super::AtModem;
use crate::common::{
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Compact, Level, ModemLog},
    response::{Append, ReceiveStatus},
    timing::{self, TimeoutPair},
};
use core::fmt::{self, Write};
use nb::Result as NbResult;

/// Line terminator appended to every AT command.
pub(crate) const CRLF: &[u8] = b"\r\n";
/// End-of-data marker for command-mode sends and SMS bodies.
pub(crate) const CTRL_Z: u8 = 0x1A;
/// Transparent-mode escape back to command mode.
pub(crate) const ESCAPE_SEQUENCE: &[u8] = b"+++";

// Implementation block for I/O related helpers
impl<IF, L> AtModem<IF, L>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, or fails once `timeout_ms` has passed.
    pub(super) fn execute_blocking_io_with_timeout<FN, T>(
        &mut self,
        timeout_ms: u32,
        mut f: FN,
    ) -> Result<T, ModemError<IF::Error>>
    where
        FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
    {
        let start = self.interface.now_ms();

        loop {
            match f(&mut self.interface) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    if self.interface.now_ms().wrapping_sub(start) >= timeout_ms {
                        modem_log!(self.log, Level::Error, "serial transport stalled for {} ms", timeout_ms);
                        return Err(ModemError::HardwareUnavailable);
                    }
                    self.interface.delay_ms(timing::POLL_INTERVAL_MS);
                }
                Err(nb::Error::Other(e)) => return Err(ModemError::Io(e)),
            }
        }
    }

    /// Writes raw bytes to the modem.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), ModemError<IF::Error>> {
        for byte in data {
            self.execute_blocking_io_with_timeout(timing::WRITE_BYTE_TIMEOUT_MS, |iface| {
                iface.write_byte(*byte)
            })?;
        }
        Ok(())
    }

    /// Writes `data` followed by CR LF.
    pub fn write_line(&mut self, data: &[u8]) -> Result<(), ModemError<IF::Error>> {
        self.write_bytes(data)?;
        self.write_bytes(CRLF)
    }

    /// Streams the `Display` output of `item` straight to the transport.
    pub fn write_display<D: fmt::Display>(&mut self, item: &D) -> Result<(), ModemError<IF::Error>> {
        let mut bridge = SerialBridge { modem: self, error: None };
        match write!(bridge, "{}", item) {
            Ok(()) => Ok(()),
            Err(fmt::Error) => Err(bridge
                .error
                .take()
                .unwrap_or(ModemError::CommandFormat("value could not be rendered"))),
        }
    }

    /// Frames one response using the first-byte/silence timeout pair.
    ///
    /// The receive buffer of the transport is flushed first, so only bytes
    /// that arrive after the call are considered. When `expected` is given a
    /// finished response is classified by substring containment; a timeout
    /// is never reclassified.
    pub fn receive(
        &mut self,
        timeouts: TimeoutPair,
        expected: Option<&str>,
    ) -> Result<ReceiveStatus, ModemError<IF::Error>> {
        self.interface.discard_input().map_err(ModemError::Io)?;
        self.buffer.clear();

        let mut mark = self.interface.now_ms();
        let mut rx_started = false;

        let status = loop {
            let available = self.interface.bytes_available();

            if !rx_started {
                if available == 0 {
                    if self.interface.now_ms().wrapping_sub(mark) >= timeouts.first_byte_ms {
                        modem_log!(self.log, Level::Debug, "reception timeout after {} ms", timeouts.first_byte_ms);
                        self.buffer.clear();
                        break ReceiveStatus::TimeoutError;
                    }
                    self.interface.delay_ms(timing::POLL_INTERVAL_MS);
                    continue;
                }
                rx_started = true;
            }

            if available > 0 {
                mark = self.interface.now_ms();
                self.drain_available(available)?;
            }

            if self.interface.now_ms().wrapping_sub(mark) >= timeouts.silence_ms {
                break ReceiveStatus::Finished;
            }
            self.interface.delay_ms(timing::POLL_INTERVAL_MS);
        };

        if self.buffer.dropped() > 0 {
            modem_log!(
                self.log,
                Level::Warn,
                "response exceeded buffer, dropped {} bytes",
                self.buffer.dropped()
            );
        }

        let status = match (status, expected) {
            (ReceiveStatus::Finished, Some(needle)) => {
                if self.buffer.contains(needle) {
                    ReceiveStatus::FinishedMatch
                } else {
                    modem_log!(
                        self.log,
                        Level::Debug,
                        "received '{}', expected '{}'",
                        Compact(self.buffer.as_bytes()),
                        Compact(needle.as_bytes())
                    );
                    ReceiveStatus::FinishedMismatch
                }
            }
            (other, _) => other,
        };

        if status != ReceiveStatus::TimeoutError {
            modem_log!(self.log, Level::Trace, "rx: {}", Compact(self.buffer.as_bytes()));
        }
        Ok(status)
    }

    fn drain_available(&mut self, mut count: usize) -> Result<(), ModemError<IF::Error>> {
        while count > 0 {
            count -= 1;
            match self.interface.read_byte() {
                Ok(byte) => {
                    if self.buffer.push(byte) == Append::Dropped {
                        modem_log!(self.log, Level::Trace, "received byte {:#04x} is out of range", byte);
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(ModemError::Io(e)),
            }
        }
        Ok(())
    }

    /// Reads raw payload bytes (e.g. an HTTP reply) into `out`.
    ///
    /// Unlike [`receive`](Self::receive) this does not flush the transport
    /// first and bypasses the response buffer. Stops on silence or when
    /// `out` is full. NUL bytes are skipped. Returns the number of bytes
    /// stored; zero means nothing arrived in time.
    pub fn read_raw(
        &mut self,
        out: &mut [u8],
        timeouts: TimeoutPair,
    ) -> Result<usize, ModemError<IF::Error>> {
        if out.is_empty() {
            return Err(Precondition::MissingArgument.into());
        }
        modem_log!(self.log, Level::Debug, "waiting for incoming data from device");

        let mut mark = self.interface.now_ms();
        let mut stored = 0;
        let mut rx_started = false;

        while stored < out.len() {
            if self.interface.bytes_available() == 0 {
                let limit = if rx_started { timeouts.silence_ms } else { timeouts.first_byte_ms };
                if self.interface.now_ms().wrapping_sub(mark) >= limit {
                    break;
                }
                self.interface.delay_ms(timing::POLL_INTERVAL_MS);
                continue;
            }

            match self.interface.read_byte() {
                Ok(0) => {}
                Ok(byte) => {
                    out[stored] = byte;
                    stored += 1;
                }
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(e)) => return Err(ModemError::Io(e)),
            }
            rx_started = true;
            mark = self.interface.now_ms();
        }

        modem_log!(self.log, Level::Debug, "incoming data: {}", Compact(&out[..stored]));
        Ok(stored)
    }
}

/// `fmt::Write` over the modem transport; keeps the I/O error that aborted
/// formatting.
struct SerialBridge<'m, IF, L>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    modem: &'m mut AtModem<IF, L>,
    error: Option<ModemError<IF::Error>>,
}

impl<IF, L> Write for SerialBridge<'_, IF, L>
where
    IF: ModemSerial + ModemClock,
    L: ModemLog,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.modem.write_bytes(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}
