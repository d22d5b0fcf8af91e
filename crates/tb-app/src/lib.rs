//! # tb-app
//!
//! Application services for Trimboard: the debounced clipboard watcher and
//! the portal paste injector. Both depend only on the ports in `tb-core`;
//! adapters are wired in by the binary.

pub mod events;
pub mod injector;
pub mod watcher;

pub use events::{app_event_channel, AppEvent, AppEventReceiver, AppEventSender};
pub use injector::PortalInjector;
pub use watcher::TrimWatcher;
