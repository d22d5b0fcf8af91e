pub mod clipboard;
pub mod event_bus;
pub mod portal;

pub use clipboard::{spawn_clipboard_watch, SystemClipboard, WatchHandle};
pub use event_bus::{platform_event_channel, PlatformEvent, PlatformEventReceiver, PlatformEventSender};
pub use portal::{
    PortalPermissionStore, PortalRemoteInput, UnavailablePermissionStore, UnavailableRemoteInput,
};
