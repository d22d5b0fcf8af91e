//! Portal paste injector service.
//!
//! 门户粘贴注入服务。
//!
//! Drives the pure negotiation machine in `tb-core`, owns the session
//! handle and the pending-request correlation table, executes the machine's
//! actions against the broker port, and performs the synthetic paste chords
//! once a session is ready.

mod pending;

pub use pending::PendingRequests;

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use tb_core::portal::preauth::{PreauthState, PreauthStatus, Preauthorization};
use tb_core::portal::state_machine::{transition, NegotiationStep, PortalAction, PortalEvent};
use tb_core::portal::{
    PortalResponse, DEVICE_KEYBOARD, KEY_INSERT, KEY_LEFT_CTRL, KEY_LEFT_SHIFT, KEY_V,
    PERSIST_MODE_PERSISTENT,
};
use tb_core::ports::{BrokerSignal, PasteInjectorPort, PermissionStorePort, RemoteInputPort, SettingsPort};
use tb_core::{InjectOutcome, SessionState};

use crate::events::{AppEvent, AppEventSender};

struct InjectorState {
    session: SessionState,
    session_handle: Option<String>,
    pending: PendingRequests,
    preauth: Preauthorization,
}

/// Permission/injection session manager.
pub struct PortalInjector {
    broker: Arc<dyn RemoteInputPort>,
    permission_store: Arc<dyn PermissionStorePort>,
    settings_repo: Arc<dyn SettingsPort>,
    events: AppEventSender,
    app_id: String,
    inner: Mutex<InjectorState>,
}

impl PortalInjector {
    pub fn new(
        broker: Arc<dyn RemoteInputPort>,
        permission_store: Arc<dyn PermissionStorePort>,
        settings_repo: Arc<dyn SettingsPort>,
        app_id: impl Into<String>,
        events: AppEventSender,
    ) -> Self {
        // Availability is decided once here; `Unavailable` stays sticky for
        // the process lifetime.
        let session = if broker.is_available() {
            SessionState::Idle
        } else {
            SessionState::Unavailable
        };
        let preauth = if permission_store.is_available() {
            Preauthorization::default()
        } else {
            Preauthorization::unavailable()
        };

        Self {
            broker,
            permission_store,
            settings_repo,
            events,
            app_id: app_id.into(),
            inner: Mutex::new(InjectorState {
                session,
                session_handle: None,
                pending: PendingRequests::default(),
                preauth,
            }),
        }
    }

    /// Start consuming broker signals. Idempotent; the broker hands out its
    /// signal stream exactly once.
    pub fn spawn_signal_loop(self: &Arc<Self>) {
        let Some(mut signals) = self.broker.take_signals() else {
            return;
        };
        let injector = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                match signal {
                    BrokerSignal::Response {
                        request_path,
                        response,
                    } => injector.on_response(request_path, response).await,
                    BrokerSignal::SessionClosed { session_handle } => {
                        injector.on_session_closed(session_handle).await
                    }
                }
            }
        });
    }

    /// Begin (or re-begin after a denial or error) the three-step
    /// negotiation. No-op while already requesting or ready.
    pub async fn request_permission(&self) {
        let mut inner = self.inner.lock().await;
        self.apply(&mut inner, PortalEvent::PermissionRequested).await;
    }

    pub async fn session_state(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    pub async fn preauth_state(&self) -> PreauthState {
        self.inner.lock().await.preauth.state()
    }

    pub async fn preauth_status(&self) -> PreauthStatus {
        self.inner.lock().await.preauth.status()
    }

    /// One-time startup probe for an existing durable grant.
    pub async fn probe_preauthorization(&self) {
        if !self.permission_store.is_available() {
            return;
        }
        let probed = match self.permission_store.probe(&self.app_id).await {
            Ok(present) => Some(present),
            Err(e) => {
                log::warn!("permission store probe failed: {:#}", e);
                None
            }
        };
        let mut inner = self.inner.lock().await;
        inner.preauth.record_probe(probed);
        self.emit_preauth(&inner);
    }

    /// Durably grant the permission without a live session, so the consent
    /// dialog never appears again. Independent of the session negotiation.
    pub async fn request_preauthorization(&self) {
        {
            let mut inner = self.inner.lock().await;
            if !inner.preauth.begin() {
                return;
            }
            self.emit_preauth(&inner);
        }

        let granted = self.permission_store.grant(&self.app_id).await;
        if let Err(e) = &granted {
            log::warn!("durable permission grant failed: {:#}", e);
        }

        let mut inner = self.inner.lock().await;
        inner.preauth.complete(granted.is_ok());
        self.emit_preauth(&inner);
    }

    async fn on_response(&self, request_path: String, response: PortalResponse) {
        let mut inner = self.inner.lock().await;
        let Some(step) = inner.pending.take(&request_path) else {
            log::debug!("unmatched portal response on {}", request_path);
            return;
        };
        self.apply(&mut inner, PortalEvent::ResponseReceived { step, response })
            .await;
    }

    async fn on_session_closed(&self, session_handle: String) {
        let mut inner = self.inner.lock().await;
        if inner.session_handle.as_deref() != Some(session_handle.as_str()) {
            return;
        }
        inner.session_handle = None;
        inner.pending.clear();
        self.apply(&mut inner, PortalEvent::SessionClosed).await;
    }

    /// Feed one event through the negotiation machine, executing its
    /// actions. A failed portal call produces a follow-up event, so this
    /// loops until the queue drains.
    async fn apply(&self, inner: &mut InjectorState, event: PortalEvent) {
        let mut queue = VecDeque::new();
        queue.push_back(event);

        while let Some(event) = queue.pop_front() {
            let (next, actions) = transition(&inner.session, event);
            let changed = next != inner.session;
            inner.session = next;
            if changed {
                log::info!("portal session state: {}", inner.session.label());
                self.emit_session(&inner.session);
            }
            for action in actions {
                if let Some(follow_up) = self.execute(inner, action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(
        &self,
        inner: &mut InjectorState,
        action: PortalAction,
    ) -> Option<PortalEvent> {
        match action {
            PortalAction::CloseSession => {
                inner.pending.clear();
                if let Some(handle) = inner.session_handle.take() {
                    if let Err(e) = self.broker.close_session(&handle).await {
                        log::warn!("failed to close stale portal session: {:#}", e);
                    }
                }
                None
            }

            PortalAction::SendCreateSession => {
                let handle_token = fresh_token();
                let session_token = fresh_token();
                let expected = self.broker.request_path(&handle_token);
                inner
                    .pending
                    .insert(expected.clone(), NegotiationStep::CreateSession);
                match self.broker.create_session(&handle_token, &session_token).await {
                    Ok(actual) => {
                        inner.pending.rekey(&expected, &actual);
                        None
                    }
                    Err(e) => {
                        inner.pending.take(&expected);
                        Some(PortalEvent::CallFailed {
                            step: NegotiationStep::CreateSession,
                            message: format!("CreateSession failed: {:#}", e),
                        })
                    }
                }
            }

            PortalAction::SendSelectDevices => {
                let Some(session) = inner.session_handle.clone() else {
                    return Some(PortalEvent::CallFailed {
                        step: NegotiationStep::SelectDevices,
                        message: "no session handle for SelectDevices".into(),
                    });
                };

                // Read once per negotiation attempt; a persisted token
                // skips the repeat consent prompt.
                let restore_token = match self.settings_repo.load().await {
                    Ok(settings) => settings.portal.restore_token,
                    Err(e) => {
                        log::warn!("failed to load restore token: {:#}", e);
                        None
                    }
                };

                let handle_token = fresh_token();
                let expected = self.broker.request_path(&handle_token);
                inner
                    .pending
                    .insert(expected.clone(), NegotiationStep::SelectDevices);
                match self
                    .broker
                    .select_devices(
                        &session,
                        &handle_token,
                        DEVICE_KEYBOARD,
                        PERSIST_MODE_PERSISTENT,
                        restore_token.as_deref(),
                    )
                    .await
                {
                    Ok(actual) => {
                        inner.pending.rekey(&expected, &actual);
                        None
                    }
                    Err(e) => {
                        inner.pending.take(&expected);
                        Some(PortalEvent::CallFailed {
                            step: NegotiationStep::SelectDevices,
                            message: format!("SelectDevices failed: {:#}", e),
                        })
                    }
                }
            }

            PortalAction::SendStart => {
                let Some(session) = inner.session_handle.clone() else {
                    return Some(PortalEvent::CallFailed {
                        step: NegotiationStep::Start,
                        message: "no session handle for Start".into(),
                    });
                };

                let handle_token = fresh_token();
                let expected = self.broker.request_path(&handle_token);
                inner.pending.insert(expected.clone(), NegotiationStep::Start);
                match self.broker.start(&session, &handle_token, "").await {
                    Ok(actual) => {
                        inner.pending.rekey(&expected, &actual);
                        None
                    }
                    Err(e) => {
                        inner.pending.take(&expected);
                        Some(PortalEvent::CallFailed {
                            step: NegotiationStep::Start,
                            message: format!("Start failed: {:#}", e),
                        })
                    }
                }
            }

            PortalAction::StoreSessionHandle { session_handle } => {
                inner.session_handle = Some(session_handle);
                None
            }

            PortalAction::WatchSessionClosed { session_handle } => {
                if let Err(e) = self.broker.watch_session(&session_handle).await {
                    log::warn!("failed to watch portal session: {:#}", e);
                }
                None
            }

            PortalAction::PersistRestoreToken { token } => {
                self.persist_restore_token(token).await;
                None
            }
        }
    }

    async fn persist_restore_token(&self, token: String) {
        let mut settings = match self.settings_repo.load().await {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("failed to load settings for restore token: {:#}", e);
                return;
            }
        };
        if settings.portal.restore_token.as_deref() == Some(token.as_str()) {
            return;
        }
        settings.portal.restore_token = Some(token);
        if let Err(e) = self.settings_repo.save(&settings).await {
            log::warn!("failed to persist restore token: {:#}", e);
        }
    }

    /// Press modifier, press key, release key, release modifier.
    async fn send_chord(&self, session: &str, modifier: i32, key: i32) -> Result<()> {
        self.broker.notify_keycode(session, modifier, true).await?;
        self.broker.notify_keycode(session, key, true).await?;
        self.broker.notify_keycode(session, key, false).await?;
        self.broker.notify_keycode(session, modifier, false).await?;
        Ok(())
    }

    fn emit_session(&self, state: &SessionState) {
        let _ = self.events.send(AppEvent::SessionStateChanged {
            state: state.clone(),
        });
    }

    fn emit_preauth(&self, inner: &InjectorState) {
        let _ = self.events.send(AppEvent::PreauthChanged {
            state: inner.preauth.state(),
            status: inner.preauth.status(),
        });
    }
}

#[async_trait]
impl PasteInjectorPort for PortalInjector {
    /// State-dispatched paste attempt. Never blocks on permission prompts:
    /// an unauthorized call kicks off negotiation and reports
    /// `PermissionRequired` so the caller can retry later.
    async fn inject_paste(&self) -> InjectOutcome {
        let mut inner = self.inner.lock().await;
        match inner.session.clone() {
            SessionState::Ready => {
                let Some(session) = inner.session_handle.clone() else {
                    inner.session = SessionState::Error {
                        message: "session ready but handle missing".into(),
                    };
                    self.emit_session(&inner.session);
                    return InjectOutcome::Failed;
                };

                match self.send_chord(&session, KEY_LEFT_SHIFT, KEY_INSERT).await {
                    Ok(()) => InjectOutcome::Injected,
                    Err(primary) => {
                        log::warn!(
                            "Shift+Insert injection failed, trying Ctrl+V: {:#}",
                            primary
                        );
                        match self.send_chord(&session, KEY_LEFT_CTRL, KEY_V).await {
                            Ok(()) => InjectOutcome::Injected,
                            Err(fallback) => {
                                inner.session = SessionState::Error {
                                    message: format!("keystroke injection failed: {:#}", fallback),
                                };
                                self.emit_session(&inner.session);
                                InjectOutcome::Failed
                            }
                        }
                    }
                }
            }
            SessionState::Unavailable => InjectOutcome::Unavailable,
            SessionState::Denied { .. } | SessionState::Requesting { .. } => {
                InjectOutcome::PermissionRequired
            }
            SessionState::Idle | SessionState::Error { .. } => {
                self.apply(&mut inner, PortalEvent::PermissionRequested).await;
                InjectOutcome::PermissionRequired
            }
        }
    }
}

fn fresh_token() -> String {
    format!("trimboard_{}", Uuid::new_v4().simple())
}
