// src/common/log.rs

use core::fmt;

pub use ::log::Level;

/// Log target used by [`LogFacade`].
pub const LOG_TARGET: &str = "gprs_modem";

/// Sink for the engine's diagnostic messages.
///
/// The engine receives one at construction instead of reaching for a global,
/// so a test can hand in a recorder and inspect what was reported.
pub trait ModemLog {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Forwards to the `log` crate facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl ModemLog for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        ::log::log!(target: LOG_TARGET, level, "{}", args);
    }
}

impl<L: ModemLog + ?Sized> ModemLog for &L {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }
}

/// `modem_log!(sink, Level::Debug, "fmt", args..)`
macro_rules! modem_log {
    ($sink:expr, $level:expr, $($arg:tt)+) => {
        $crate::common::log::ModemLog::log(&$sink, $level, format_args!($($arg)+))
    };
}
pub(crate) use modem_log;

/// Renders response bytes for log lines: CR/LF become spaces, other
/// non-printables become `.`.
pub struct Compact<'a>(pub &'a [u8]);

impl fmt::Display for Compact<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for &b in self.0 {
            let c = match b {
                b'\r' | b'\n' => ' ',
                0x20..=0x7e => b as char,
                _ => '.',
            };
            f.write_char(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::cell::RefCell;
    use std::string::{String, ToString};
    use std::vec::Vec;

    /// Test sink that keeps every message.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        pub entries: RefCell<Vec<(Level, String)>>,
    }

    impl RecordingLog {
        pub fn contains(&self, level: Level, needle: &str) -> bool {
            self.entries
                .borrow()
                .iter()
                .any(|(l, msg)| *l == level && msg.contains(needle))
        }
    }

    impl ModemLog for RecordingLog {
        fn log(&self, level: Level, args: fmt::Arguments<'_>) {
            self.entries.borrow_mut().push((level, args.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingLog;
    use super::*;

    #[test]
    fn test_compact_rendering() {
        let rendered = std::format!("{}", Compact(b"\r\nOK\r\n\x1a"));
        assert_eq!(rendered, "  OK  .");
    }

    #[test]
    fn test_macro_reaches_sink() {
        let sink = RecordingLog::default();
        modem_log!(sink, Level::Warn, "dropped {} bytes", 3);
        assert!(sink.contains(Level::Warn, "dropped 3 bytes"));
    }
}
