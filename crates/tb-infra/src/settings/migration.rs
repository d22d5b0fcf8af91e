use tb_core::settings::{Settings, CURRENT_SCHEMA_VERSION};

/// Forward-migrates persisted settings to the current schema.
///
/// V1 is the only schema so far; this is the hook future versions chain
/// their upgrades through.
pub struct SettingsMigrator;

impl SettingsMigrator {
    pub fn new() -> Self {
        Self
    }

    pub fn migrate_to_latest(&self, mut settings: Settings) -> Settings {
        settings.schema_version = CURRENT_SCHEMA_VERSION;
        settings
    }
}

impl Default for SettingsMigrator {
    fn default() -> Self {
        Self::new()
    }
}
