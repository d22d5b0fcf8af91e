mod watcher;

pub use watcher::{spawn_clipboard_watch, WatchHandle};

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use clipboard_rs::{Clipboard, ClipboardContext};
#[cfg(target_os = "linux")]
use clipboard_rs::ClipboardContextX11Options;

use tb_core::ports::LocalClipboardPort;

/// 系统剪贴板适配器 / System clipboard adapter.
///
/// Wraps a `ClipboardContext` behind a mutex so the same handle can be
/// shared between the change handler thread and async callers.
pub struct SystemClipboard {
    inner: Arc<Mutex<ClipboardContext>>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "linux")]
        let ctx = ClipboardContext::new_with_options(ClipboardContextX11Options { read_timeout: None })
            .map_err(|e| anyhow::anyhow!("failed to create clipboard context: {}", e))?;
        #[cfg(not(target_os = "linux"))]
        let ctx = ClipboardContext::new()
            .map_err(|e| anyhow::anyhow!("failed to create clipboard context: {}", e))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(ctx)),
        })
    }
}

#[async_trait]
impl LocalClipboardPort for SystemClipboard {
    async fn get_text(&self) -> Result<String> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard mutex poisoned"))?;
        guard
            .get_text()
            .map_err(|e| anyhow::anyhow!("failed to read clipboard text: {}", e))
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard mutex poisoned"))?;
        guard
            .set_text(text.to_owned())
            .map_err(|e| anyhow::anyhow!("failed to write clipboard text: {}", e))
    }
}
