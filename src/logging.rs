//! # Logging
//!
//! Thin wrapper around `env_logger`/`log`, plus a rate-limiting throttle for
//! the high-frequency, expected-noise log lines (CRC failures, dropped
//! candidates) so a noisy RF environment cannot swamp the log.

use std::time::Instant;

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    let _ = env_logger::builder()
        .format_timestamp_micros()
        .try_init();
}

/// Rate-limiting structure for log messages within a sliding window.
#[derive(Debug)]
pub struct LogThrottle {
    window_ms: u64,
    cap: u32,
    count: u32,
    window_start: Instant,
}

impl LogThrottle {
    /// Creates a throttle allowing at most `cap` messages per `window_ms`.
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Returns `true` if the caller should log now, `false` if throttled.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start).as_millis() as u64 > self.window_ms {
            self.window_start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count <= self.cap
    }
}
