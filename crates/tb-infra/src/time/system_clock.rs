use std::time::Instant;

use once_cell::sync::Lazy;

use tb_core::ports::ClockPort;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic milliseconds since process start. Guard expiries compare
/// against this, so wall-clock steps and suspend/resume must not move it
/// backwards.
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> i64 {
        PROCESS_START.elapsed().as_millis() as i64
    }
}
