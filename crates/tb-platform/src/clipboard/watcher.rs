use anyhow::Result;
use clipboard_rs::{
    ClipboardHandler, ClipboardWatcher as RsClipboardWatcher, ClipboardWatcherContext,
    WatcherShutdown,
};
use tokio::task::JoinHandle;

use crate::event_bus::{PlatformEvent, PlatformEventSender};

/// Bridges clipboard-rs change callbacks onto the platform event bus.
///
/// The callback runs on the watcher's own OS thread, so it only forwards a
/// marker event; the application re-reads the clipboard when it evaluates.
struct ChangeForwarder {
    sender: PlatformEventSender,
}

impl ClipboardHandler for ChangeForwarder {
    fn on_clipboard_change(&mut self) {
        if let Err(e) = self.sender.try_send(PlatformEvent::ClipboardChanged) {
            // A full channel means a burst of changes is already queued;
            // dropping the marker loses nothing because the payload is
            // re-read on evaluation.
            log::debug!("clipboard change event not forwarded: {}", e);
        }
    }
}

/// Handle for a running clipboard watch, used to stop it on shutdown.
pub struct WatchHandle {
    shutdown: Option<WatcherShutdown>,
    join: JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.stop();
        }
        if let Err(e) = (&mut self.join).await {
            log::warn!("clipboard watch task ended abnormally: {}", e);
        }
    }
}

/// Starts the OS clipboard watch on a blocking task and returns a handle
/// for stopping it. Change notifications arrive on `sender`.
pub fn spawn_clipboard_watch(sender: PlatformEventSender) -> Result<WatchHandle> {
    let mut watcher_ctx = ClipboardWatcherContext::new()
        .map_err(|e| anyhow::anyhow!("failed to create watcher context: {}", e))?;

    let shutdown = watcher_ctx
        .add_handler(ChangeForwarder { sender })
        .get_shutdown_channel();

    let join = tokio::task::spawn_blocking(move || {
        log::info!("start clipboard watch");
        watcher_ctx.start_watch();
        log::info!("clipboard watch stopped");
    });

    Ok(WatchHandle {
        shutdown: Some(shutdown),
        join,
    })
}
