use anyhow::Result;

use crate::trim::{Aggressiveness, TrimOptions, TrimOutcome};

/// Pure text transformation. Stateless between calls and fast enough to run
/// inside one event-loop turn; the watcher still re-validates its generation
/// after every invocation in case it is not.
pub trait TrimEnginePort: Send + Sync {
    fn trim(
        &self,
        input: &str,
        aggressiveness: Aggressiveness,
        options: &TrimOptions,
    ) -> Result<TrimOutcome>;
}
