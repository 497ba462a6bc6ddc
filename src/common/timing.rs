// src/common/timing.rs

// Every receive takes two independent limits: how long to wait for the first
// byte, and how long a gap between bytes ends the response. The values below
// are sized to the SIM900's observed latency for each operation.

/// First-byte timeout and inter-byte silence timeout for one receive, in ms.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeoutPair {
    pub first_byte_ms: u32,
    pub silence_ms: u32,
}

impl TimeoutPair {
    pub const fn from_millis(first_byte_ms: u32, silence_ms: u32) -> Self {
        TimeoutPair {
            first_byte_ms,
            silence_ms,
        }
    }
}

// === Dispatcher ===

/// Pause between consecutive attempts of the same command.
pub const RETRY_GAP_MS: u32 = 500;
/// Sleep between polls of the transport while waiting for bytes.
pub const POLL_INTERVAL_MS: u32 = 1;
/// Upper bound for the transport to accept a single outgoing byte.
pub const WRITE_BYTE_TIMEOUT_MS: u32 = 100;

// === Bring-up (Sec 4.3) ===

pub const PROBE: TimeoutPair = TimeoutPair::from_millis(500, 100);
/// Drains whatever the modem prints while settling after a probe.
pub const PROBE_DRAIN: TimeoutPair = TimeoutPair::from_millis(1000, 1000);
pub const PARAMETER: TimeoutPair = TimeoutPair::from_millis(500, 50);
/// Short drain of unsolicited output before parameters are applied.
pub const QUICK_DRAIN: TimeoutPair = TimeoutPair::from_millis(50, 50);
/// Power-key held asserted.
pub const POWER_PULSE_MS: u32 = 2_000;
/// Boot time after the power-key pulse.
pub const BOOT_WAIT_MS: u32 = 10_000;
pub const PROBE_LOOPS: usize = 3;
pub const PROBE_RETRIES: u8 = 5;
pub const PARAMETER_RETRIES: u8 = 5;

// === GPRS attach/detach ===

/// Quiet period before touching the packet service after registration.
pub const ATTACH_SETTLE_MS: u32 = 5_000;
pub const DATA_MODE: TimeoutPair = TimeoutPair::from_millis(500, 50);
pub const GPRS_ATTACH: TimeoutPair = TimeoutPair::from_millis(5_000, 50);
pub const IP_QUERY: TimeoutPair = TimeoutPair::from_millis(5_000, 50);
pub const BEARER_SHUT: TimeoutPair = TimeoutPair::from_millis(500, 50);
pub const PDP_START: TimeoutPair = TimeoutPair::from_millis(500, 50);
/// Wireless bring-up routinely takes several seconds on the SIM900.
pub const IP_BRINGUP: TimeoutPair = TimeoutPair::from_millis(10_000, 50);
pub const LISTENER_TEARDOWN: TimeoutPair = TimeoutPair::from_millis(5_000, 50);
pub const STALE_CLOSE_SETTLE_MS: u32 = 2_000;
pub const BEARER_SHUT_SETTLE_MS: u32 = 1_000;
pub const PDP_START_SETTLE_MS: u32 = 5_000;
pub const IP_BRINGUP_SETTLE_MS: u32 = 1_000;

// === TCP ===

pub const TCP_CONNECT: TimeoutPair = TimeoutPair::from_millis(1_000, 200);
/// Second wait when the connect reply did not yet carry the connect marker.
pub const TCP_CONNECT_CONFIRM: TimeoutPair = TimeoutPair::from_millis(15_000, 200);
pub const TCP_CONNECT_SETTLE_MS: u32 = 3_000;
pub const SEND_PROMPT: TimeoutPair = TimeoutPair::from_millis(5_000, 200);
pub const TCP_STATUS: TimeoutPair = TimeoutPair::from_millis(500, 50);
pub const TCP_CLOSE: TimeoutPair = TimeoutPair::from_millis(1_000, 50);
/// Required line silence around the `+++` escape in transparent mode.
pub const ESCAPE_GUARD_MS: u32 = 1_000;
pub const ESCAPE_CONFIRM: TimeoutPair = TimeoutPair::from_millis(2_000, 100);
pub const TCP_CONNECT_ATTEMPTS: usize = 3;

// === HTTP ===

pub const GET_SEND_CONFIRM: TimeoutPair = TimeoutPair::from_millis(10_000, 10);
pub const POST_SEND_CONFIRM: TimeoutPair = TimeoutPair::from_millis(10_000, 100);
/// Gap between the send confirmation and the start of the raw body read.
pub const RESPONSE_SETTLE_MS: u32 = 50;
/// Raw body read: wait for the server, then stop after this much silence.
pub const RAW_READ: TimeoutPair = TimeoutPair::from_millis(10_000, 100);

// === SMS ===

pub const SMS_PROMPT: TimeoutPair = TimeoutPair::from_millis(1_000, 500);
pub const SMS_SEND_CONFIRM: TimeoutPair = TimeoutPair::from_millis(7_000, 5_000);
pub const SMS_READ: TimeoutPair = TimeoutPair::from_millis(5_000, 100);
pub const SMS_SEND_ATTEMPTS: usize = 3;

// === Identity queries ===

pub const IDENTITY_QUERY: TimeoutPair = TimeoutPair::from_millis(5_000, 50);
pub const SIM_PIN: TimeoutPair = TimeoutPair::from_millis(5_000, 100);
