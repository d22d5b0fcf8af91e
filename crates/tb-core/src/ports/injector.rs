use async_trait::async_trait;

use crate::portal::InjectOutcome;

/// The watcher-facing slice of the portal injector: fire a synthetic paste
/// chord into the focused window. Never blocks on permission prompts; an
/// unauthorized call kicks off negotiation and reports
/// [`InjectOutcome::PermissionRequired`].
#[async_trait]
pub trait PasteInjectorPort: Send + Sync {
    async fn inject_paste(&self) -> InjectOutcome;
}
