//! Loop-breaking primitives for the clipboard watcher.
//!
//! The clipboard is a single shared mutable resource and our own writes come
//! back to us as change notifications. Three small, independent pieces of
//! state break the feedback loop; their check order in the evaluation
//! pipeline is restore guard first, then write fingerprint, then the
//! auto-trim gate.

pub mod guard;
pub mod summary;

pub use guard::{GenerationCounter, RestoreGuard, WriteFingerprint};
pub use summary::summarize;
