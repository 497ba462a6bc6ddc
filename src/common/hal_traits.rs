// src/common/hal_traits.rs

use core::fmt::Debug;

/// Abstraction for the monotonic millisecond clock and blocking delays.
///
/// The counter is allowed to wrap; the engine only ever compares
/// `now.wrapping_sub(start)` against a timeout.
pub trait ModemClock {
    /// Current value of the monotonic millisecond counter.
    fn now_ms(&self) -> u32;

    /// Block for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Abstraction for the half-duplex serial link to the modem.
///
/// Opening the device (path, baud rate, parity) happens before the value is
/// handed to the engine; closing it is done by dropping it.
pub trait ModemSerial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> usize;

    /// Attempts to read a single byte from the serial interface.
    ///
    /// Returns `Ok(byte)` if a byte was read, or `Err(nb::Error::WouldBlock)`
    /// if no byte is available yet.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if the transmit buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Drops everything sitting in the receive buffer.
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}

/// Bundles an independent serial port and clock into one interface value.
///
/// The engine is generic over a single `IF: ModemSerial + ModemClock`; on
/// hosts where the two come from different places this joins them.
#[derive(Debug)]
pub struct ModemInterface<S, C> {
    pub serial: S,
    pub clock: C,
}

impl<S, C> ModemInterface<S, C> {
    pub fn new(serial: S, clock: C) -> Self {
        ModemInterface { serial, clock }
    }

    pub fn into_parts(self) -> (S, C) {
        (self.serial, self.clock)
    }
}

impl<S: ModemSerial, C> ModemSerial for ModemInterface<S, C> {
    type Error = S::Error;

    fn bytes_available(&mut self) -> usize {
        self.serial.bytes_available()
    }

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.serial.read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.serial.write_byte(byte)
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.serial.discard_input()
    }
}

impl<S, C: ModemClock> ModemClock for ModemInterface<S, C> {
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.delay_ms(ms)
    }
}

/// `ModemClock` backed by `std::time::Instant`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        StdClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl ModemClock for StdClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::mock::MockInterface;
    use crate::modem::AtModem;

    #[test]
    fn test_interface_joins_serial_and_clock() {
        // The serial side keeps its own clock; only the joined clock is driven.
        let iface = ModemInterface::new(MockInterface::new(), MockInterface::starting_at(1_000));
        let mut modem = AtModem::new(iface);

        modem.interface_mut().clock.delay_ms(250);
        assert_eq!(modem.interface().now_ms(), 1_250);

        modem.interface_mut().serial.stage(0, b"\r\nOK\r\n");
        assert_eq!(modem.interface_mut().bytes_available(), 6);
        modem.interface_mut().discard_input().unwrap();
        assert_eq!(modem.interface_mut().bytes_available(), 0);

        let (serial, clock) = modem.release().0.into_parts();
        assert!(serial.written.is_empty());
        assert_eq!(clock.now_ms(), 1_250);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_std_clock_advances() {
        let mut clock = StdClock::new();
        let start = clock.now_ms();
        clock.delay_ms(5);
        assert!(clock.now_ms().wrapping_sub(start) >= 5);
    }
}
