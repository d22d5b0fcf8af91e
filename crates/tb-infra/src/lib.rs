//! # tb-infra
//!
//! Infrastructure adapters with no desktop dependency: file-backed settings,
//! system clock, content hashing, and the built-in trim engine.

pub mod hashing;
pub mod settings;
pub mod time;
pub mod trim;

pub use hashing::Sha256Hasher;
pub use settings::FileSettingsRepository;
pub use time::SystemClock;
pub use trim::BasicTrimEngine;
