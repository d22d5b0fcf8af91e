use serde::{Deserialize, Serialize};

use crate::trim::{Aggressiveness, TrimOptions};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Clipboard watcher preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimSettings {
    pub auto_trim_enabled: bool,
    pub keep_blank_lines: bool,
    pub strip_box_chars: bool,
    pub trim_prompts: bool,
    pub max_lines: usize,
    pub aggressiveness: Aggressiveness,

    /// Quiet period after a clipboard change before evaluation runs.
    pub debounce_delay_ms: u64,

    /// How long a manual swap keeps the trimmed text on the clipboard
    /// before the previous content is written back.
    pub paste_restore_delay_ms: u64,

    /// Pause between swapping the clipboard and injecting the paste chord.
    pub paste_inject_delay_ms: u64,
}

impl TrimSettings {
    pub fn trim_options(&self) -> TrimOptions {
        TrimOptions {
            keep_blank_lines: self.keep_blank_lines,
            strip_box_chars: self.strip_box_chars,
            trim_prompts: self.trim_prompts,
            max_lines: self.max_lines,
        }
    }
}

/// Portal-related persisted state.
///
/// 门户相关的持久化状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortalSettings {
    /// Opaque credential issued by the portal on a successful Start;
    /// replayed on SelectDevices to skip repeated consent prompts.
    pub restore_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub trim: TrimSettings,

    #[serde(default)]
    pub portal: PortalSettings,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}
