// src/modem/mock.rs

//! Scripted stand-ins for the serial line, clock and GPIO used by the unit
//! tests. Time only moves when the engine sleeps.

use crate::common::hal_traits::{ModemClock, ModemSerial};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockError;

/// Reply fired when a written unit starts with `trigger`.
#[derive(Debug, Clone)]
struct Rule {
    trigger: Vec<u8>,
    reply: Vec<u8>,
    delay_ms: u64,
    remaining: Option<usize>,
    active_from: u64,
    follow_up: bool,
}

/// Default latency between a command and the modem's reply.
const REPLY_DELAY_MS: u64 = 20;

#[derive(Debug, Default)]
pub struct MockInterface {
    time: u64,
    rx: VecDeque<(u64, u8)>,
    rules: Vec<Rule>,
    unit: Vec<u8>,
    /// Every byte written, in order.
    pub written: Vec<u8>,
    /// Completed written units (lines, Ctrl-Z, `+++`) with the time they ended.
    pub units: Vec<(u32, Vec<u8>)>,
    pub fail_reads: bool,
    pub block_writes: bool,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u32) -> Self {
        MockInterface {
            time: u64::from(ms),
            ..Self::default()
        }
    }

    /// Makes `bytes` arrive `offset_ms` from now.
    pub fn stage(&mut self, offset_ms: u32, bytes: &[u8]) {
        let at = self.time + u64::from(offset_ms);
        self.schedule(at, bytes);
    }

    pub fn reply(&mut self, trigger: &str, reply: &str) -> &mut Self {
        self.add_rule(trigger, reply.as_bytes(), REPLY_DELAY_MS, None, 0)
    }

    pub fn reply_once(&mut self, trigger: &str, reply: &str) -> &mut Self {
        self.add_rule(trigger, reply.as_bytes(), REPLY_DELAY_MS, Some(1), 0)
    }

    pub fn reply_after(&mut self, trigger: &str, reply: &str, delay_ms: u32) -> &mut Self {
        self.add_rule(trigger, reply.as_bytes(), u64::from(delay_ms), None, 0)
    }

    /// Rule that only answers once the clock has reached `from_ms`.
    pub fn reply_from(&mut self, trigger: &str, reply: &str, from_ms: u32) -> &mut Self {
        self.add_rule(trigger, reply.as_bytes(), REPLY_DELAY_MS, None, u64::from(from_ms))
    }

    /// Extra reply fired alongside whichever rule answers `trigger`, e.g. an
    /// HTTP body trailing the modem's `SEND OK`.
    pub fn also_reply_after(&mut self, trigger: &str, reply: &str, delay_ms: u32) -> &mut Self {
        self.add_rule(trigger, reply.as_bytes(), u64::from(delay_ms), None, 0);
        if let Some(rule) = self.rules.last_mut() {
            rule.follow_up = true;
        }
        self
    }

    fn add_rule(
        &mut self,
        trigger: &str,
        reply: &[u8],
        delay_ms: u64,
        remaining: Option<usize>,
        active_from: u64,
    ) -> &mut Self {
        self.rules.push(Rule {
            trigger: trigger.as_bytes().to_vec(),
            reply: reply.to_vec(),
            delay_ms,
            remaining,
            active_from,
            follow_up: false,
        });
        self
    }

    fn schedule(&mut self, at: u64, bytes: &[u8]) {
        for &b in bytes {
            self.rx.push_back((at, b));
        }
        self.rx.make_contiguous().sort_by_key(|(t, _)| *t);
    }

    fn ready(&self) -> usize {
        self.rx.iter().take_while(|(t, _)| *t <= self.time).count()
    }

    fn unit_complete(&mut self) {
        let unit = core::mem::take(&mut self.unit);
        let now = self.time;
        let mut replies = Vec::new();
        if let Some(rule) = self.rules.iter_mut().find(|r| {
            !r.follow_up && r.remaining != Some(0) && r.active_from <= now && unit.starts_with(&r.trigger)
        }) {
            if let Some(n) = rule.remaining.as_mut() {
                *n -= 1;
            }
            replies.push((now + rule.delay_ms, rule.reply.clone()));
        }
        replies.extend(
            self.rules
                .iter()
                .filter(|r| r.follow_up && unit.starts_with(&r.trigger))
                .map(|r| (now + r.delay_ms, r.reply.clone())),
        );
        for (at, reply) in replies {
            self.schedule(at, &reply);
        }
        self.units.push((self.time as u32, unit));
    }

    /// Number of written units starting with `prefix`.
    pub fn count_sent(&self, prefix: &str) -> usize {
        self.units
            .iter()
            .filter(|(_, u)| u.starts_with(prefix.as_bytes()))
            .count()
    }

    pub fn sent(&self, prefix: &str) -> bool {
        self.count_sent(prefix) > 0
    }

    pub fn sent_times(&self, prefix: &str) -> Vec<u32> {
        self.units
            .iter()
            .filter(|(_, u)| u.starts_with(prefix.as_bytes()))
            .map(|(t, _)| *t)
            .collect()
    }

    /// Position of the first unit starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.units.iter().position(|(_, u)| u.starts_with(prefix.as_bytes()))
    }

    pub fn clear_history(&mut self) {
        self.written.clear();
        self.units.clear();
    }
}

impl ModemClock for MockInterface {
    fn now_ms(&self) -> u32 {
        self.time as u32
    }

    fn delay_ms(&mut self, ms: u32) {
        self.time += u64::from(ms);
    }
}

impl ModemSerial for MockInterface {
    type Error = MockError;

    fn bytes_available(&mut self) -> usize {
        self.ready()
    }

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        if self.ready() == 0 {
            return Err(nb::Error::WouldBlock);
        }
        if self.fail_reads {
            return Err(nb::Error::Other(MockError));
        }
        match self.rx.pop_front() {
            Some((_, b)) => Ok(b),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.block_writes {
            return Err(nb::Error::WouldBlock);
        }
        self.written.push(byte);
        if byte == 0x1A {
            // Ctrl-Z is a unit of its own so payload and terminator can be
            // scripted separately.
            if !self.unit.is_empty() {
                self.unit_complete();
            }
            self.unit.push(byte);
            self.unit_complete();
            return Ok(());
        }
        self.unit.push(byte);
        if self.unit.ends_with(b"+++") {
            let head = self.unit.len() - 3;
            if head > 0 {
                let escape = self.unit.split_off(head);
                self.unit_complete();
                self.unit = escape;
            }
            self.unit_complete();
        } else if byte == b'\n' {
            self.unit_complete();
        }
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        let ready = self.ready();
        self.rx.drain(..ready);
        Ok(())
    }
}

/// Shared record of GPIO transitions: (pin name, level).
pub type PinLog = Rc<RefCell<Vec<(&'static str, bool)>>>;

#[derive(Debug)]
pub struct MockPin {
    name: &'static str,
    log: PinLog,
    pub fail: bool,
}

impl MockPin {
    pub fn new(name: &'static str, log: &PinLog) -> Self {
        MockPin {
            name,
            log: Rc::clone(log),
            fail: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = MockPinError;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockPinError);
        }
        self.log.borrow_mut().push((self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockPinError);
        }
        self.log.borrow_mut().push((self.name, true));
        Ok(())
    }
}
