// src/common/response/status.rs

/// Result of framing one modem response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// Bytes arrived and the line then went silent.
    Finished,
    /// Finished, and the expected substring is present.
    FinishedMatch,
    /// Finished, but the expected substring is absent.
    FinishedMismatch,
    /// Nothing arrived within the first-byte timeout.
    TimeoutError,
}

impl ReceiveStatus {
    /// True for `Finished` and `FinishedMatch`.
    pub fn is_success(self) -> bool {
        matches!(self, ReceiveStatus::Finished | ReceiveStatus::FinishedMatch)
    }

    /// Membership in {TimeoutError, FinishedMismatch}.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ReceiveStatus::TimeoutError | ReceiveStatus::FinishedMismatch
        )
    }
}

/// Result of one dispatched command, after retries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AtResult {
    Ok,
    NoResponse,
}
