use anyhow::Result;
use async_trait::async_trait;

/// Durable portal permission store (the mechanism behind
/// `flatpak permission-set`). Used for the one-time "grant permanently"
/// preauthorization flow, independent of the per-launch session.
#[async_trait]
pub trait PermissionStorePort: Send + Sync {
    fn is_available(&self) -> bool;

    /// Whether a durable remote-input grant exists for the app.
    async fn probe(&self, app_id: &str) -> Result<bool>;

    /// Write a durable remote-input grant for the app.
    async fn grant(&self, app_id: &str) -> Result<()>;
}
