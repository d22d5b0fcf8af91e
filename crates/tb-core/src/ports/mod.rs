//! Port interfaces between the application layer and the outside world.
//!
//! Each external collaborator gets one narrow trait: the system clipboard,
//! the trim engine, the settings store, the RemoteDesktop portal, and the
//! portal permission store. Adapters live in `tb-infra` / `tb-platform`;
//! the services in `tb-app` depend only on these traits.

mod clipboard;
mod clock;
mod hash;
mod injector;
mod permission_store;
mod remote_input;
mod settings;
mod trim_engine;

pub use clipboard::LocalClipboardPort;
pub use clock::ClockPort;
pub use hash::ContentHashPort;
pub use injector::PasteInjectorPort;
pub use permission_store::PermissionStorePort;
pub use remote_input::{BrokerSignal, RemoteInputPort};
pub use settings::SettingsPort;
pub use trim_engine::TrimEnginePort;
