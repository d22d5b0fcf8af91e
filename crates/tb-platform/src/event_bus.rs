use tokio::sync::mpsc;

/// 平台事件 / Events emitted by platform adapters toward the application layer.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// The system clipboard content changed. The payload is intentionally
    /// absent: consumers re-read the clipboard when they actually evaluate,
    /// so rapid bursts collapse onto the latest content.
    ClipboardChanged,
}

pub type PlatformEventSender = mpsc::Sender<PlatformEvent>;
pub type PlatformEventReceiver = mpsc::Receiver<PlatformEvent>;

pub fn platform_event_channel(capacity: usize) -> (PlatformEventSender, PlatformEventReceiver) {
    mpsc::channel(capacity)
}
