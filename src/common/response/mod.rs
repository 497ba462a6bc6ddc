// src/common/response/mod.rs

mod buffer;
mod status;

pub use buffer::{contains_bytes, Append, ResponseBuffer, RESPONSE_BUFFER_CAPACITY};
pub use status::{AtResult, ReceiveStatus};
