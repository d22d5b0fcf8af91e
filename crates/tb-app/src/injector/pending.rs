use std::collections::HashMap;

use tb_core::portal::NegotiationStep;

/// Correlation table for outstanding portal requests, keyed by request
/// path with one-shot consumption.
///
/// The path is predicted from the handle token before the call; the call's
/// synchronous return may carry a different path, in which case the entry
/// is re-keyed under the actual one.
#[derive(Debug, Default)]
pub struct PendingRequests {
    by_path: HashMap<String, NegotiationStep>,
}

impl PendingRequests {
    pub fn insert(&mut self, request_path: String, step: NegotiationStep) {
        self.by_path.insert(request_path, step);
    }

    /// Consume the entry for a response path. Unmatched paths yield `None`.
    pub fn take(&mut self, request_path: &str) -> Option<NegotiationStep> {
        self.by_path.remove(request_path)
    }

    /// Move an entry from the predicted path to the one the broker actually
    /// returned. No-op when they agree or the predicted entry is already
    /// consumed (the response can beat the call return).
    pub fn rekey(&mut self, expected: &str, actual: &str) {
        if expected == actual {
            return;
        }
        if let Some(step) = self.by_path.remove(expected) {
            self.by_path.insert(actual.to_string(), step);
        }
    }

    pub fn clear(&mut self) {
        self.by_path.clear();
    }
}
