use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::portal::PortalResponse;

/// Out-of-band broker notifications, delivered on the channel returned by
/// [`RemoteInputPort::take_signals`].
#[derive(Debug, Clone)]
pub enum BrokerSignal {
    /// Correlated outcome of a privileged call, addressed by request path.
    Response {
        request_path: String,
        response: PortalResponse,
    },
    /// The broker closed a session.
    SessionClosed { session_handle: String },
}

/// RemoteDesktop privilege broker.
///
/// Every privileged call returns a request path synchronously; the actual
/// outcome arrives later as a [`BrokerSignal::Response`] on that path. The
/// returned path may legitimately differ from the one predicted by
/// [`RemoteInputPort::request_path`] — callers must watch both, preferring
/// the returned one.
#[async_trait]
pub trait RemoteInputPort: Send + Sync {
    /// Broker reachability, probed once at construction.
    fn is_available(&self) -> bool;

    /// Deterministically derive the expected request path for a locally
    /// generated handle token.
    fn request_path(&self, handle_token: &str) -> String;

    async fn create_session(
        &self,
        handle_token: &str,
        session_handle_token: &str,
    ) -> Result<String>;

    async fn select_devices(
        &self,
        session_handle: &str,
        handle_token: &str,
        device_types: u32,
        persist_mode: u32,
        restore_token: Option<&str>,
    ) -> Result<String>;

    async fn start(
        &self,
        session_handle: &str,
        handle_token: &str,
        parent_window: &str,
    ) -> Result<String>;

    /// Synthesize one key event. `pressed` maps to the broker's key state.
    async fn notify_keycode(&self, session_handle: &str, keycode: i32, pressed: bool)
        -> Result<()>;

    /// Watch a session for its `Closed` notification.
    async fn watch_session(&self, session_handle: &str) -> Result<()>;

    async fn close_session(&self, session_handle: &str) -> Result<()>;

    /// Take the broker signal stream. Yields `None` on every call after the
    /// first; exactly one consumer drives correlation.
    fn take_signals(&self) -> Option<mpsc::Receiver<BrokerSignal>>;
}
