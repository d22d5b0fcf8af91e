//! Generation counter, write fingerprint and restore guard.

/// Monotonic counter that coalesces bursts of clipboard-change
/// notifications into a single debounced evaluation.
///
/// Every observed change ticks the counter; the debounce task captures the
/// value at schedule time and proceeds only if no newer change superseded
/// it. Stale tasks are no-ops, so no explicit timer cancellation is needed.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: u64,
    scheduled: u64,
}

impl GenerationCounter {
    /// Record a new clipboard change and return the generation a debounce
    /// task scheduled now should capture.
    pub fn tick(&mut self) -> u64 {
        self.current += 1;
        self.scheduled = self.current;
        self.scheduled
    }

    /// Whether a captured generation is still the latest scheduled one.
    pub fn is_current(&self, captured: u64) -> bool {
        captured == self.scheduled
    }
}

/// Content hash of the last text this process wrote to the clipboard.
///
/// The next change notification whose content matches is an echo of our own
/// write and is consumed exactly once, never fed to the trim pipeline.
#[derive(Debug, Default)]
pub struct WriteFingerprint {
    hash: Option<String>,
}

impl WriteFingerprint {
    /// Arm the fingerprint right before writing to the clipboard.
    pub fn arm(&mut self, hash: String) {
        self.hash = Some(hash);
    }

    /// One-shot echo check: on a match the fingerprint is cleared.
    pub fn consume_if_match(&mut self, incoming: &str) -> bool {
        match self.hash.as_deref() {
            Some(armed) if armed == incoming => {
                self.hash = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.hash.is_some()
    }
}

/// Shields a manual swap-and-restore sequence from re-evaluation.
///
/// Unlike the write fingerprint this matches repeatedly until expiry,
/// distinguishing "text we are about to restore" from "our last write".
#[derive(Debug, Clone)]
pub struct RestoreGuard {
    hash: String,
    expires_at_ms: i64,
}

impl RestoreGuard {
    pub fn new(hash: String, expires_at_ms: i64) -> Self {
        Self {
            hash,
            expires_at_ms,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }

    /// Whether an incoming hash should be ignored. Does not clear state.
    pub fn shields(&self, incoming: &str, now_ms: i64) -> bool {
        !self.is_expired(now_ms) && self.hash == incoming
    }
}
