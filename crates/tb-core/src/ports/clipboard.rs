use anyhow::Result;
use async_trait::async_trait;

/// System clipboard text access. Change notifications travel separately
/// through the platform event bus and fire for every mutation, including
/// our own writes.
#[async_trait]
pub trait LocalClipboardPort: Send + Sync {
    async fn get_text(&self) -> Result<String>;
    async fn set_text(&self, text: &str) -> Result<()>;
}
