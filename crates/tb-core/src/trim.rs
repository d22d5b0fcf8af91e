//! Trim engine contract types.
//!
//! The transformation algorithm itself lives behind
//! [`crate::ports::TrimEnginePort`]; these are the value types every
//! implementation speaks.

use serde::{Deserialize, Serialize};

/// Trim intensity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggressiveness {
    Low,
    Normal,
    High,
}

impl Aggressiveness {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggressiveness::Low => "low",
            Aggressiveness::Normal => "normal",
            Aggressiveness::High => "high",
        }
    }
}

/// Option flags passed to the trim engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimOptions {
    pub keep_blank_lines: bool,
    pub strip_box_chars: bool,
    pub trim_prompts: bool,
    pub max_lines: usize,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            keep_blank_lines: false,
            strip_box_chars: true,
            trim_prompts: true,
            max_lines: 10,
        }
    }
}

/// What the engine reports it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimReason {
    Flattened,
    PromptStripped,
    BoxCharsRemoved,
    BackslashMerged,
    SkippedTooLarge,
}

impl TrimReason {
    pub fn describe(self) -> &'static str {
        match self {
            TrimReason::Flattened => "flattened to one line",
            TrimReason::PromptStripped => "shell prompts stripped",
            TrimReason::BoxCharsRemoved => "box-drawing characters removed",
            TrimReason::BackslashMerged => "backslash continuations merged",
            TrimReason::SkippedTooLarge => "skipped (too many lines)",
        }
    }
}

/// Engine output: possibly rewritten text plus a changed flag and reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimOutcome {
    pub output: String,
    pub changed: bool,
    pub reason: Option<TrimReason>,
}

impl TrimOutcome {
    /// Pass-through result for input the engine left alone.
    pub fn unchanged(input: &str) -> Self {
        Self {
            output: input.to_string(),
            changed: false,
            reason: None,
        }
    }
}
