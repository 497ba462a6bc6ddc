// src/common/error.rs

/// Requirement that was not met when an operation was invoked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    #[error("modem has not completed bring-up")]
    NotInitialized,
    #[error("operation not allowed in the current GSM status")]
    WrongGsmStatus,
    #[error("communication line is busy")]
    CommLineBusy,
    #[error("required argument is missing or empty")]
    MissingArgument,
    #[error("SMS storage positions start at 1")]
    InvalidSmsPosition,
    #[error("SMS text is longer than the modem accepts")]
    SmsTooLong,
}

#[derive(Debug, thiserror::Error)]
pub enum ModemError<E = ()>
where
    E: core::fmt::Debug,
{
    /// Underlying I/O error from the serial implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// Nothing was received within the first-byte timeout.
    #[error("no response from modem during {stage}")]
    NoResponse { stage: &'static str },

    /// A response arrived but did not contain the expected marker.
    #[error("unexpected response from modem during {stage}")]
    UnexpectedResponse { stage: &'static str },

    /// Caller-provided buffer or command line was too small.
    #[error("Buffer overflow: needed {needed}, got {got}")]
    BufferOverflow { needed: usize, got: usize },

    #[error("precondition failed: {0}")]
    PreconditionFailed(Precondition),

    /// Transport or GPIO could not be driven.
    #[error("modem hardware unavailable")]
    HardwareUnavailable,

    /// A command could not be formatted into its line buffer.
    #[error("Command formatting failed: {0}")]
    CommandFormat(&'static str),
}

impl<E: core::fmt::Debug> From<Precondition> for ModemError<E> {
    fn from(p: Precondition) -> Self {
        ModemError::PreconditionFailed(p)
    }
}

impl<E: core::fmt::Debug> ModemError<E> {
    /// Stage name carried by `NoResponse`/`UnexpectedResponse`.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            ModemError::NoResponse { stage } | ModemError::UnexpectedResponse { stage } => {
                Some(stage)
            }
            _ => None,
        }
    }
}
