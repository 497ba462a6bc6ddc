// src/common/types.rs

/// Who currently owns the serial line. Advisory only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CommLineStatus {
    #[default]
    Free,
    AtCommand,
    Data,
}

/// Network-side state of the modem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GsmStatus {
    #[default]
    Idle,
    Ready,
    Attached,
    Error,
    TcpServerWait,
    TcpServerConnected,
    TcpClientConnected,
}

impl GsmStatus {
    /// A PDP context is up and a TCP connection may be opened.
    pub fn has_gprs(self) -> bool {
        matches!(
            self,
            GsmStatus::Attached
                | GsmStatus::TcpServerWait
                | GsmStatus::TcpServerConnected
                | GsmStatus::TcpClientConnected
        )
    }

    pub fn has_tcp_session(self) -> bool {
        matches!(
            self,
            GsmStatus::TcpServerConnected | GsmStatus::TcpClientConnected
        )
    }
}

/// How TCP payload is framed on the serial line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DataMode {
    /// Each payload is preceded by a `>` prompt and terminated with Ctrl-Z.
    #[default]
    NonTransparent,
    /// The serial line is the socket; `+++` escapes back to command mode.
    Transparent,
}

impl DataMode {
    pub fn from_transparent(transparent: bool) -> Self {
        if transparent {
            DataMode::Transparent
        } else {
            DataMode::NonTransparent
        }
    }

    pub fn is_transparent(self) -> bool {
        self == DataMode::Transparent
    }
}

/// Classification of an SMS storage slot, from the `+CMGR` header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SmsStatus {
    /// Slot empty or the modem refused the index.
    NoSms,
    Unread,
    Read,
    /// Stored/sent or otherwise unrecognised state.
    Other,
}

impl SmsStatus {
    /// Classifies a `+CMGR` response by its status marker.
    pub fn classify(response: &[u8]) -> Self {
        use super::response::contains_bytes;

        if contains_bytes(response, b"REC UNREAD") {
            SmsStatus::Unread
        } else if contains_bytes(response, b"REC READ") {
            SmsStatus::Read
        } else {
            SmsStatus::Other
        }
    }
}
