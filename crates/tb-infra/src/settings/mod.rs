mod file_repo;
mod migration;

pub use file_repo::FileSettingsRepository;
pub use migration::SettingsMigrator;
