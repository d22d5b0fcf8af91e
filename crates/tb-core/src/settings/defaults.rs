use super::model::*;
use crate::trim::Aggressiveness;

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            auto_trim_enabled: true,
            keep_blank_lines: false,
            strip_box_chars: true,
            trim_prompts: true,
            max_lines: 10,
            aggressiveness: Aggressiveness::Normal,
            debounce_delay_ms: 80,
            paste_restore_delay_ms: 1200,
            paste_inject_delay_ms: 120,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            trim: TrimSettings::default(),
            portal: PortalSettings::default(),
        }
    }
}
