//! Portal session negotiation state machine.
//!
//! 门户会话协商状态机。
//!
//! Pure transition function `(state, event) -> (new_state, actions[])` in the
//! same shape as the rest of the domain machines, so the three-step
//! CreateSession → SelectDevices → Start handshake is testable by injecting
//! responses without any bus connection. The injector service owns the
//! session handle string and the pending-request correlation table; the
//! machine only validates payloads and sequences the steps.

use super::{PortalResponse, SessionState, DEVICE_KEYBOARD};

/// One privileged call of the negotiation. Steps are strictly sequential;
/// exactly one is outstanding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    CreateSession,
    SelectDevices,
    Start,
}

impl NegotiationStep {
    pub fn label(self) -> &'static str {
        match self {
            NegotiationStep::CreateSession => "CreateSession",
            NegotiationStep::SelectDevices => "SelectDevices",
            NegotiationStep::Start => "Start",
        }
    }
}

/// Events that drive the negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalEvent {
    /// User (or a paste attempt from `Idle`/`Error`) asked for permission.
    PermissionRequested,
    /// The synchronous portal call itself failed; short-circuits the
    /// negotiation regardless of step.
    CallFailed { step: NegotiationStep, message: String },
    /// Correlated response arrived for the outstanding step.
    ResponseReceived {
        step: NegotiationStep,
        response: PortalResponse,
    },
    /// Broker reported the session closed. May arrive at any time,
    /// including mid-negotiation.
    SessionClosed,
}

/// Side-effects the injector service must execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalAction {
    /// Close and forget any existing session handle.
    CloseSession,
    SendCreateSession,
    SendSelectDevices,
    SendStart,
    /// Remember the broker-issued session handle.
    StoreSessionHandle { session_handle: String },
    /// Subscribe to the session's `Closed` notification.
    WatchSessionClosed { session_handle: String },
    /// Persist a fresh restore token to the settings store.
    PersistRestoreToken { token: String },
}

/// Single transition of the negotiation machine.
///
/// Unknown or stale combinations are no-ops: superseded responses are
/// one-shot consumed by the correlation table before they ever get here,
/// but the machine stays safe if one slips through.
pub fn transition(state: &SessionState, event: PortalEvent) -> (SessionState, Vec<PortalAction>) {
    match (state, event) {
        // `Unavailable` is sticky for the process lifetime.
        (SessionState::Unavailable, _) => (SessionState::Unavailable, vec![]),

        (_, PortalEvent::SessionClosed) => (SessionState::Idle, vec![]),

        (SessionState::Requesting { .. }, PortalEvent::PermissionRequested)
        | (SessionState::Ready, PortalEvent::PermissionRequested) => (state.clone(), vec![]),

        (_, PortalEvent::PermissionRequested) => (
            SessionState::Requesting {
                step: NegotiationStep::CreateSession,
            },
            vec![PortalAction::CloseSession, PortalAction::SendCreateSession],
        ),

        (SessionState::Requesting { step }, PortalEvent::CallFailed { step: failed, message })
            if *step == failed =>
        {
            (SessionState::Error { message }, vec![])
        }

        (
            SessionState::Requesting {
                step: NegotiationStep::CreateSession,
            },
            PortalEvent::ResponseReceived {
                step: NegotiationStep::CreateSession,
                response,
            },
        ) => handle_create_session(response),

        (
            SessionState::Requesting {
                step: NegotiationStep::SelectDevices,
            },
            PortalEvent::ResponseReceived {
                step: NegotiationStep::SelectDevices,
                response,
            },
        ) => {
            if !response.success() {
                return (
                    SessionState::Denied {
                        reason: "Portal device selection denied.".into(),
                    },
                    vec![],
                );
            }
            (
                SessionState::Requesting {
                    step: NegotiationStep::Start,
                },
                vec![PortalAction::SendStart],
            )
        }

        (
            SessionState::Requesting {
                step: NegotiationStep::Start,
            },
            PortalEvent::ResponseReceived {
                step: NegotiationStep::Start,
                response,
            },
        ) => handle_start(response),

        // Stale event for the current state.
        _ => (state.clone(), vec![]),
    }
}

fn handle_create_session(response: PortalResponse) -> (SessionState, Vec<PortalAction>) {
    if !response.success() {
        return (
            SessionState::Denied {
                reason: "Portal session request denied.".into(),
            },
            vec![],
        );
    }

    let Some(session_handle) = response.session_handle else {
        return (
            SessionState::Error {
                message: "Portal did not return a session handle.".into(),
            },
            vec![],
        );
    };

    (
        SessionState::Requesting {
            step: NegotiationStep::SelectDevices,
        },
        vec![
            PortalAction::StoreSessionHandle {
                session_handle: session_handle.clone(),
            },
            PortalAction::WatchSessionClosed { session_handle },
            PortalAction::SendSelectDevices,
        ],
    )
}

fn handle_start(response: PortalResponse) -> (SessionState, Vec<PortalAction>) {
    if !response.success() {
        return (
            SessionState::Denied {
                reason: "Portal start denied.".into(),
            },
            vec![],
        );
    }

    if response.devices.unwrap_or(0) & DEVICE_KEYBOARD == 0 {
        return (
            SessionState::Denied {
                reason: "Keyboard permission not granted.".into(),
            },
            vec![],
        );
    }

    let mut actions = Vec::new();
    if let Some(token) = response.restore_token {
        if !token.is_empty() {
            actions.push(PortalAction::PersistRestoreToken { token });
        }
    }

    (SessionState::Ready, actions)
}
