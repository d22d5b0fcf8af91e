//! RemoteDesktop portal domain model.
//!
//! 远程桌面门户的领域模型。
//!
//! The portal is a sandboxed privilege broker: every privileged call returns
//! a request path whose eventual outcome arrives later as a correlated
//! `Response` signal. The negotiation itself is a pure state machine
//! ([`state_machine`]), driven by the injector service in `tb-app`.

pub mod preauth;
pub mod state_machine;

pub use preauth::{PreauthState, PreauthStatus, Preauthorization};
pub use state_machine::{transition, NegotiationStep, PortalAction, PortalEvent};

/// Device capability bit for keyboard input.
pub const DEVICE_KEYBOARD: u32 = 1;

/// SelectDevices persist mode asking for a grant that survives restarts.
pub const PERSIST_MODE_PERSISTENT: u32 = 2;

// Linux evdev keycodes used for the paste chords.
pub const KEY_LEFT_CTRL: i32 = 29;
pub const KEY_LEFT_SHIFT: i32 = 42;
pub const KEY_V: i32 = 47;
pub const KEY_INSERT: i32 = 110;

/// Session lifecycle state.
///
/// `Unavailable` is decided once at construction (broker absent) and is
/// sticky for the process lifetime. `Denied` and `Error` are recoverable by
/// an explicit new permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting { step: NegotiationStep },
    Ready,
    Denied { reason: String },
    Unavailable,
    Error { message: String },
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self, SessionState::Requesting { .. })
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, SessionState::Unavailable)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Requesting { .. } => "requesting",
            SessionState::Ready => "ready",
            SessionState::Denied { .. } => "denied",
            SessionState::Unavailable => "unavailable",
            SessionState::Error { .. } => "error",
        }
    }
}

/// Payload of a correlated broker response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalResponse {
    /// 0 means success; anything else is a denial or cancellation.
    pub status: u32,
    pub session_handle: Option<String>,
    /// Granted device capability bitmask (Start response).
    pub devices: Option<u32>,
    /// New restore token to persist (Start response).
    pub restore_token: Option<String>,
}

impl PortalResponse {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Outcome of a paste injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Injected,
    PermissionRequired,
    Unavailable,
    Failed,
}
