/// Monotonic milliseconds. Only deltas are meaningful, so implementations
/// must not be affected by wall-clock steps.
pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> i64;
}
