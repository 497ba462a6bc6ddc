// src/common/response/buffer.rs

use heapless::Vec;

/// Capacity of the response buffer, matching the SIM900 driver's comm buffer.
pub const RESPONSE_BUFFER_CAPACITY: usize = 200;

/// Outcome of appending a byte to a [`ResponseBuffer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Append {
    Stored,
    /// Buffer was full; the byte was dropped.
    Dropped,
}

/// Fixed-capacity holder for the most recently framed modem response.
///
/// Bytes past capacity are dropped, never written. Because the content is
/// always an explicit slice, substring checks cannot run past the data.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    data: Vec<u8, RESPONSE_BUFFER_CAPACITY>,
    dropped: usize,
}

impl ResponseBuffer {
    pub const fn new() -> Self {
        ResponseBuffer {
            data: Vec::new(),
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.dropped = 0;
    }

    /// Appends one byte, truncating at capacity.
    pub fn push(&mut self, byte: u8) -> Append {
        match self.data.push(byte) {
            Ok(()) => Append::Stored,
            Err(_) => {
                self.dropped += 1;
                Append::Dropped
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes discarded since the last `clear`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn contains(&self, needle: &str) -> bool {
        contains_bytes(&self.data, needle.as_bytes())
    }

    /// Content as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.data).ok()
    }

    /// First non-empty line that is not a final result code.
    ///
    /// For query commands (`AT+GSN`, `AT+CIFSR`, ...) this is the value the
    /// modem reported, with echo already disabled.
    pub fn info_line(&self) -> Option<&[u8]> {
        self.data
            .split(|&b| b == b'\n')
            .map(trim_line)
            .find(|line| !line.is_empty() && *line != b"OK" && *line != b"ERROR")
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

/// Byte-level substring test. An empty needle is always contained.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
