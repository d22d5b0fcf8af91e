pub mod defaults;
pub mod model;

pub use model::{PortalSettings, Settings, TrimSettings, CURRENT_SCHEMA_VERSION};
