//! Hand-written fake ports for driving the services without any desktop
//! dependency.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use tb_core::ports::{
    BrokerSignal, ClockPort, LocalClipboardPort, PasteInjectorPort, PermissionStorePort,
    RemoteInputPort, SettingsPort, TrimEnginePort,
};
use tb_core::settings::model::Settings;
use tb_core::trim::{Aggressiveness, TrimOptions, TrimOutcome, TrimReason};
use tb_core::InjectOutcome;

/// In-memory clipboard recording every write.
pub struct FakeClipboard {
    content: Mutex<String>,
    pub writes: Mutex<Vec<String>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeClipboard {
    pub fn with_content(content: &str) -> Self {
        Self {
            content: Mutex::new(content.to_string()),
            writes: Mutex::new(Vec::new()),
            read_gate: Mutex::new(None),
        }
    }

    /// Parks the next `get_text` call until the returned handle is notified,
    /// so a test can land a concurrent change mid-evaluation.
    pub fn hold_next_read(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
    }

    pub fn content(&self) -> String {
        self.content.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl LocalClipboardPort for FakeClipboard {
    async fn get_text(&self) -> Result<String> {
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.content.lock().unwrap().clone())
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        *self.content.lock().unwrap() = text.to_string();
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Deterministic engine: joins lines with single spaces. Records every
/// invocation so tests can assert coalescing and forced aggressiveness.
pub struct FakeTrimEngine {
    pub calls: Mutex<Vec<(String, Aggressiveness)>>,
}

impl FakeTrimEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, Aggressiveness)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl TrimEnginePort for FakeTrimEngine {
    fn trim(
        &self,
        input: &str,
        aggressiveness: Aggressiveness,
        _options: &TrimOptions,
    ) -> Result<TrimOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_string(), aggressiveness));
        let output = input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if output == input {
            return Ok(TrimOutcome::unchanged(input));
        }
        Ok(TrimOutcome {
            output,
            changed: true,
            reason: Some(TrimReason::Flattened),
        })
    }
}

/// Clock backed by tokio's (pausable) time source.
pub struct TestClock {
    start: tokio::time::Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

/// Settings repository counting persists.
pub struct FakeSettingsRepo {
    settings: Mutex<Settings>,
    pub save_count: AtomicUsize,
}

impl FakeSettingsRepo {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            save_count: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsPort for FakeSettingsRepo {
    async fn load(&self) -> Result<Settings> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock().unwrap() = settings.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Injector stub returning a fixed outcome.
pub struct FakeInjector {
    pub outcome: Mutex<InjectOutcome>,
    pub calls: AtomicUsize,
}

impl FakeInjector {
    pub fn returning(outcome: InjectOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasteInjectorPort for FakeInjector {
    async fn inject_paste(&self) -> InjectOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.outcome.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    CreateSession,
    SelectDevices { restore_token: Option<String> },
    Start,
    Notify { keycode: i32, pressed: bool },
    Watch(String),
    Close(String),
}

/// Scriptable broker: records calls, returns request paths, and lets the
/// test deliver correlated responses through the signal channel.
pub struct FakeBroker {
    pub available: bool,
    /// When set, calls return a request path different from the predicted
    /// one, exercising the re-key logic.
    pub divergent_paths: bool,
    pub calls: Mutex<Vec<BrokerCall>>,
    pub last_request_path: Mutex<Option<String>>,
    pub failing_keycodes: Mutex<HashSet<i32>>,
    pub signal_tx: mpsc::Sender<BrokerSignal>,
    signal_rx: Mutex<Option<mpsc::Receiver<BrokerSignal>>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(16);
        Self {
            available: true,
            divergent_paths: false,
            calls: Mutex::new(Vec::new()),
            last_request_path: Mutex::new(None),
            failing_keycodes: Mutex::new(HashSet::new()),
            signal_tx,
            signal_rx: Mutex::new(Some(signal_rx)),
        }
    }

    pub fn unavailable() -> Self {
        let mut broker = Self::new();
        broker.available = false;
        broker
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_of(&self, wanted: &BrokerCall) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| *call == wanted)
            .count()
    }

    pub fn create_session_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, BrokerCall::CreateSession))
            .count()
    }

    pub fn select_devices_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, BrokerCall::SelectDevices { .. }))
            .count()
    }

    pub fn last_path(&self) -> String {
        self.last_request_path.lock().unwrap().clone().unwrap()
    }

    pub fn fail_keycode(&self, keycode: i32) {
        self.failing_keycodes.lock().unwrap().insert(keycode);
    }

    fn issue_path(&self, handle_token: &str) -> String {
        let path = if self.divergent_paths {
            format!("/request/actual/{}", handle_token)
        } else {
            self.request_path(handle_token)
        };
        *self.last_request_path.lock().unwrap() = Some(path.clone());
        path
    }
}

#[async_trait]
impl RemoteInputPort for FakeBroker {
    fn is_available(&self) -> bool {
        self.available
    }

    fn request_path(&self, handle_token: &str) -> String {
        format!("/request/expected/{}", handle_token)
    }

    async fn create_session(
        &self,
        handle_token: &str,
        _session_handle_token: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(BrokerCall::CreateSession);
        Ok(self.issue_path(handle_token))
    }

    async fn select_devices(
        &self,
        _session_handle: &str,
        handle_token: &str,
        _device_types: u32,
        _persist_mode: u32,
        restore_token: Option<&str>,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(BrokerCall::SelectDevices {
            restore_token: restore_token.map(str::to_string),
        });
        Ok(self.issue_path(handle_token))
    }

    async fn start(
        &self,
        _session_handle: &str,
        handle_token: &str,
        _parent_window: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(BrokerCall::Start);
        Ok(self.issue_path(handle_token))
    }

    async fn notify_keycode(
        &self,
        _session_handle: &str,
        keycode: i32,
        pressed: bool,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BrokerCall::Notify { keycode, pressed });
        if self.failing_keycodes.lock().unwrap().contains(&keycode) {
            bail!("keycode {} rejected", keycode);
        }
        Ok(())
    }

    async fn watch_session(&self, session_handle: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BrokerCall::Watch(session_handle.to_string()));
        Ok(())
    }

    async fn close_session(&self, session_handle: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BrokerCall::Close(session_handle.to_string()));
        Ok(())
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<BrokerSignal>> {
        self.signal_rx.lock().unwrap().take()
    }
}

/// Permission store stub.
pub struct FakePermissionStore {
    pub available: bool,
    pub grant_fails: bool,
    pub present: Mutex<bool>,
    pub grants: Mutex<Vec<String>>,
}

impl FakePermissionStore {
    pub fn new() -> Self {
        Self {
            available: true,
            grant_fails: false,
            present: Mutex::new(false),
            grants: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        let mut store = Self::new();
        store.available = false;
        store
    }
}

#[async_trait]
impl PermissionStorePort for FakePermissionStore {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn probe(&self, _app_id: &str) -> Result<bool> {
        Ok(*self.present.lock().unwrap())
    }

    async fn grant(&self, app_id: &str) -> Result<()> {
        if self.grant_fails {
            bail!("permission store write rejected");
        }
        *self.present.lock().unwrap() = true;
        self.grants.lock().unwrap().push(app_id.to_string());
        Ok(())
    }
}

/// Let spawned tasks (debounce timers, the signal loop) run to quiescence
/// under paused time.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
