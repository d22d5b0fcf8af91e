//! # tb-core
//!
//! Core domain models and business logic for Trimboard.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

pub mod portal;
pub mod ports;
pub mod settings;
pub mod trim;
pub mod watcher;

pub use portal::{InjectOutcome, SessionState};
pub use trim::{Aggressiveness, TrimOptions, TrimOutcome, TrimReason};
