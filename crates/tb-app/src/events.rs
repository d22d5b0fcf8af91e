use tokio::sync::broadcast;

use tb_core::portal::preauth::{PreauthState, PreauthStatus};
use tb_core::SessionState;

/// State-changed notifications fanned out to UI listeners (tray menu,
/// control interface). Lagging receivers drop old events; everything here
/// is re-queryable from the owning service.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Auto-trim rewrote the clipboard.
    ClipboardTrimmed { summary: String, reason: String },
    /// A user preference changed and was persisted.
    SettingsChanged,
    /// The portal session negotiation moved.
    SessionStateChanged { state: SessionState },
    /// The preauthorization flow moved.
    PreauthChanged {
        state: PreauthState,
        status: PreauthStatus,
    },
}

pub type AppEventSender = broadcast::Sender<AppEvent>;
pub type AppEventReceiver = broadcast::Receiver<AppEvent>;

pub fn app_event_channel(capacity: usize) -> (AppEventSender, AppEventReceiver) {
    broadcast::channel(capacity)
}
