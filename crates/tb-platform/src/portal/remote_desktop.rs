use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};
use zbus::{proxy, Connection, MatchRule, MessageStream};

use tb_core::portal::PortalResponse;
use tb_core::ports::{BrokerSignal, RemoteInputPort};

use super::{bus_name_has_owner, predicted_request_path, PORTAL_BUS_NAME};

const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";
const SESSION_INTERFACE: &str = "org.freedesktop.portal.Session";

#[proxy(
    interface = "org.freedesktop.portal.RemoteDesktop",
    default_service = "org.freedesktop.portal.Desktop",
    default_path = "/org/freedesktop/portal/desktop"
)]
trait RemoteDesktop {
    fn create_session(&self, options: HashMap<&str, Value<'_>>) -> zbus::Result<OwnedObjectPath>;

    fn select_devices(
        &self,
        session_handle: &ObjectPath<'_>,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<OwnedObjectPath>;

    fn start(
        &self,
        session_handle: &ObjectPath<'_>,
        parent_window: &str,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<OwnedObjectPath>;

    fn notify_keyboard_keycode(
        &self,
        session_handle: &ObjectPath<'_>,
        options: HashMap<&str, Value<'_>>,
        keycode: i32,
        state: u32,
    ) -> zbus::Result<()>;
}

/// RemoteDesktop broker adapter over the session bus.
///
/// Privileged calls go through the portal's request/response pattern: the
/// synchronous return is an `o` request path and the outcome arrives as a
/// `Response` signal on that path. Signals for every request object are
/// matched with one bus-wide rule because the paths are dynamic.
pub struct PortalRemoteInput {
    proxy: RemoteDesktopProxy<'static>,
    connection: Connection,
    unique_name: String,
    watched: Arc<Mutex<HashSet<String>>>,
    signals: Mutex<Option<mpsc::Receiver<BrokerSignal>>>,
}

impl PortalRemoteInput {
    /// Connects to the session bus and verifies the broker is reachable.
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session()
            .await
            .context("failed to connect to session bus")?;

        if !bus_name_has_owner(&connection, PORTAL_BUS_NAME).await {
            bail!("{} has no owner on the session bus", PORTAL_BUS_NAME);
        }

        let proxy = RemoteDesktopProxy::new(&connection)
            .await
            .context("failed to create RemoteDesktop proxy")?;

        let unique_name = connection
            .unique_name()
            .map(|n| n.to_string())
            .context("session bus connection has no unique name")?;

        let watched = Arc::new(Mutex::new(HashSet::new()));
        let (tx, rx) = mpsc::channel(32);

        let response_conn = connection.clone();
        let response_tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = forward_responses(response_conn, response_tx).await {
                log::error!("portal response listener failed: {}", e);
            }
        });

        let closed_conn = connection.clone();
        let closed_watched = watched.clone();
        tokio::spawn(async move {
            if let Err(e) = forward_session_closed(closed_conn, closed_watched, tx).await {
                log::error!("portal session-closed listener failed: {}", e);
            }
        });

        Ok(Self {
            proxy,
            connection,
            unique_name,
            watched,
            signals: Mutex::new(Some(rx)),
        })
    }
}

#[async_trait]
impl RemoteInputPort for PortalRemoteInput {
    fn is_available(&self) -> bool {
        true
    }

    fn request_path(&self, handle_token: &str) -> String {
        predicted_request_path(&self.unique_name, handle_token)
    }

    async fn create_session(
        &self,
        handle_token: &str,
        session_handle_token: &str,
    ) -> Result<String> {
        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("handle_token", Value::from(handle_token));
        options.insert("session_handle_token", Value::from(session_handle_token));

        let path = self
            .proxy
            .create_session(options)
            .await
            .context("CreateSession call failed")?;
        Ok(path.to_string())
    }

    async fn select_devices(
        &self,
        session_handle: &str,
        handle_token: &str,
        device_types: u32,
        persist_mode: u32,
        restore_token: Option<&str>,
    ) -> Result<String> {
        let session = ObjectPath::try_from(session_handle)
            .context("invalid session handle")?;

        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("handle_token", Value::from(handle_token));
        options.insert("types", Value::from(device_types));
        options.insert("persist_mode", Value::from(persist_mode));
        if let Some(token) = restore_token {
            options.insert("restore_token", Value::from(token));
        }

        let path = self
            .proxy
            .select_devices(&session, options)
            .await
            .context("SelectDevices call failed")?;
        Ok(path.to_string())
    }

    async fn start(
        &self,
        session_handle: &str,
        handle_token: &str,
        parent_window: &str,
    ) -> Result<String> {
        let session = ObjectPath::try_from(session_handle)
            .context("invalid session handle")?;

        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("handle_token", Value::from(handle_token));

        let path = self
            .proxy
            .start(&session, parent_window, options)
            .await
            .context("Start call failed")?;
        Ok(path.to_string())
    }

    async fn notify_keycode(
        &self,
        session_handle: &str,
        keycode: i32,
        pressed: bool,
    ) -> Result<()> {
        let session = ObjectPath::try_from(session_handle)
            .context("invalid session handle")?;
        let state = if pressed { 1 } else { 0 };
        self.proxy
            .notify_keyboard_keycode(&session, HashMap::new(), keycode, state)
            .await
            .context("NotifyKeyboardKeycode call failed")
    }

    async fn watch_session(&self, session_handle: &str) -> Result<()> {
        let mut watched = self
            .watched
            .lock()
            .map_err(|_| anyhow::anyhow!("watched-session set poisoned"))?;
        watched.insert(session_handle.to_string());
        Ok(())
    }

    async fn close_session(&self, session_handle: &str) -> Result<()> {
        let session = ObjectPath::try_from(session_handle)
            .context("invalid session handle")?;
        self.connection
            .call_method(
                Some(PORTAL_BUS_NAME),
                session,
                Some(SESSION_INTERFACE),
                "Close",
                &(),
            )
            .await
            .context("Session.Close call failed")?;
        if let Ok(mut watched) = self.watched.lock() {
            watched.remove(session_handle);
        }
        Ok(())
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<BrokerSignal>> {
        self.signals.lock().ok()?.take()
    }
}

/// Stand-in used when the broker is absent so the rest of the application
/// keeps a uniform shape. Every call fails; the session state machine pins
/// itself to `Unavailable` before any call is attempted.
pub struct UnavailableRemoteInput;

#[async_trait]
impl RemoteInputPort for UnavailableRemoteInput {
    fn is_available(&self) -> bool {
        false
    }

    fn request_path(&self, _handle_token: &str) -> String {
        String::new()
    }

    async fn create_session(&self, _: &str, _: &str) -> Result<String> {
        bail!("remote input broker unavailable")
    }

    async fn select_devices(
        &self,
        _: &str,
        _: &str,
        _: u32,
        _: u32,
        _: Option<&str>,
    ) -> Result<String> {
        bail!("remote input broker unavailable")
    }

    async fn start(&self, _: &str, _: &str, _: &str) -> Result<String> {
        bail!("remote input broker unavailable")
    }

    async fn notify_keycode(&self, _: &str, _: i32, _: bool) -> Result<()> {
        bail!("remote input broker unavailable")
    }

    async fn watch_session(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn close_session(&self, _: &str) -> Result<()> {
        Ok(())
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<BrokerSignal>> {
        None
    }
}

fn u32_field(results: &HashMap<String, OwnedValue>, key: &str) -> Option<u32> {
    results.get(key).and_then(|v| v.downcast_ref::<u32>().ok())
}

fn string_field(results: &HashMap<String, OwnedValue>, key: &str) -> Option<String> {
    let value = results.get(key)?;
    if let Ok(s) = value.downcast_ref::<&str>() {
        return Some(s.to_owned());
    }
    // Some broker implementations return the session handle as `o`.
    value
        .downcast_ref::<ObjectPath<'_>>()
        .ok()
        .map(|p| p.to_string())
}

async fn forward_responses(
    connection: Connection,
    tx: mpsc::Sender<BrokerSignal>,
) -> Result<()> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface(REQUEST_INTERFACE)?
        .member("Response")?
        .build();
    let mut stream = MessageStream::for_match_rule(rule, &connection, Some(32)).await?;

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                log::warn!("portal response stream error: {}", e);
                continue;
            }
        };

        let header = msg.header();
        let Some(request_path) = header.path().map(|p| p.to_string()) else {
            continue;
        };

        let (status, results): (u32, HashMap<String, OwnedValue>) =
            match msg.body().deserialize() {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("malformed portal response on {}: {}", request_path, e);
                    continue;
                }
            };

        let response = PortalResponse {
            status,
            session_handle: string_field(&results, "session_handle"),
            devices: u32_field(&results, "devices"),
            restore_token: string_field(&results, "restore_token"),
        };

        if tx
            .send(BrokerSignal::Response {
                request_path,
                response,
            })
            .await
            .is_err()
        {
            break;
        }
    }
    Ok(())
}

async fn forward_session_closed(
    connection: Connection,
    watched: Arc<Mutex<HashSet<String>>>,
    tx: mpsc::Sender<BrokerSignal>,
) -> Result<()> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface(SESSION_INTERFACE)?
        .member("Closed")?
        .build();
    let mut stream = MessageStream::for_match_rule(rule, &connection, Some(8)).await?;

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                log::warn!("portal session stream error: {}", e);
                continue;
            }
        };

        let header = msg.header();
        let Some(session_handle) = header.path().map(|p| p.to_string()) else {
            continue;
        };

        let is_watched = watched
            .lock()
            .map(|set| set.contains(&session_handle))
            .unwrap_or(false);
        if !is_watched {
            continue;
        }

        if tx
            .send(BrokerSignal::SessionClosed { session_handle })
            .await
            .is_err()
        {
            break;
        }
    }
    Ok(())
}
