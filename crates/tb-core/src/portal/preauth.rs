//! Preauthorization state, independent of the session negotiation.
//!
//! A one-time "grant permanently" action writes a durable entry into the
//! portal permission store so the consent dialog never appears. This is
//! deliberately a separate machine from [`super::SessionState`]: the restore
//! token skips repeat prompts for one session type, preauthorization
//! suppresses the portal UI entirely, and revoking one must not invalidate
//! the other.

/// Progress of the grant action itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreauthState {
    Idle,
    Working,
    Succeeded,
    Failed,
    Unavailable,
}

/// Persisted grant status, probed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreauthStatus {
    #[default]
    Unknown,
    Present,
    Absent,
}

/// Preauthorization bookkeeping for the injector service.
#[derive(Debug, Default)]
pub struct Preauthorization {
    state: PreauthState,
    status: PreauthStatus,
}

impl Default for PreauthState {
    fn default() -> Self {
        PreauthState::Idle
    }
}

impl Preauthorization {
    pub fn unavailable() -> Self {
        Self {
            state: PreauthState::Unavailable,
            status: PreauthStatus::Unknown,
        }
    }

    pub fn state(&self) -> PreauthState {
        self.state
    }

    pub fn status(&self) -> PreauthStatus {
        self.status
    }

    /// Record the one-time startup probe of the permission store.
    pub fn record_probe(&mut self, present: Option<bool>) {
        self.status = match present {
            Some(true) => PreauthStatus::Present,
            Some(false) => PreauthStatus::Absent,
            None => PreauthStatus::Unknown,
        };
    }

    /// Begin a grant attempt. Returns false when one is already running or
    /// the store is unavailable.
    pub fn begin(&mut self) -> bool {
        match self.state {
            PreauthState::Working | PreauthState::Unavailable => false,
            _ => {
                self.state = PreauthState::Working;
                true
            }
        }
    }

    pub fn complete(&mut self, succeeded: bool) {
        self.state = if succeeded {
            self.status = PreauthStatus::Present;
            PreauthState::Succeeded
        } else {
            PreauthState::Failed
        };
    }
}
