//! Debounced, loop-safe clipboard watcher.
//!
//! 防抖且环路安全的剪贴板监视器。
//!
//! Every clipboard mutation, including our own writes, comes back to us as a
//! change notification. Three loop-breaking mechanisms keep the watcher from
//! feeding on itself, checked strictly in this order during evaluation:
//! restore guard, then write fingerprint, then the auto-trim gate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;

use tb_core::ports::{
    ClockPort, ContentHashPort, LocalClipboardPort, PasteInjectorPort, SettingsPort,
    TrimEnginePort,
};
use tb_core::settings::model::{Settings, TrimSettings};
use tb_core::watcher::{summarize, GenerationCounter, RestoreGuard, WriteFingerprint};
use tb_core::{Aggressiveness, InjectOutcome, TrimOutcome};

use crate::events::{AppEvent, AppEventSender};

/// Extra shield time beyond the restore delay, so a late-arriving change
/// notification for restored content is still recognized.
const RESTORE_GUARD_SLACK_MS: i64 = 2_000;

struct WatcherState {
    enabled: bool,
    generation: GenerationCounter,
    fingerprint: WriteFingerprint,
    restore_guard: Option<RestoreGuard>,
    last_original: Option<String>,
    last_trimmed: Option<String>,
    last_summary: Option<String>,
    settings: Settings,
}

/// Clipboard watcher service.
pub struct TrimWatcher {
    clipboard: Arc<dyn LocalClipboardPort>,
    trim_engine: Arc<dyn TrimEnginePort>,
    settings_repo: Arc<dyn SettingsPort>,
    hasher: Arc<dyn ContentHashPort>,
    clock: Arc<dyn ClockPort>,
    injector: Arc<dyn PasteInjectorPort>,
    events: AppEventSender,
    state: Mutex<WatcherState>,
}

impl TrimWatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clipboard: Arc<dyn LocalClipboardPort>,
        trim_engine: Arc<dyn TrimEnginePort>,
        settings_repo: Arc<dyn SettingsPort>,
        hasher: Arc<dyn ContentHashPort>,
        clock: Arc<dyn ClockPort>,
        injector: Arc<dyn PasteInjectorPort>,
        settings: Settings,
        events: AppEventSender,
    ) -> Self {
        Self {
            clipboard,
            trim_engine,
            settings_repo,
            hasher,
            clock,
            injector,
            events,
            state: Mutex::new(WatcherState {
                enabled: true,
                generation: GenerationCounter::default(),
                fingerprint: WriteFingerprint::default(),
                restore_guard: None,
                last_original: None,
                last_trimmed: None,
                last_summary: None,
                settings,
            }),
        }
    }

    /// Clipboard change entry point. Ticks the generation and schedules a
    /// debounced evaluation; bursts coalesce because stale generations
    /// no-op when their timer fires.
    pub async fn on_clipboard_changed(self: &Arc<Self>) {
        let (captured, delay) = {
            let mut state = self.state.lock().await;
            if !state.enabled {
                return;
            }
            let captured = state.generation.tick();
            (
                captured,
                Duration::from_millis(state.settings.trim.debounce_delay_ms),
            )
        };

        let watcher = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            watcher.evaluate(captured).await;
        });
    }

    /// Debounce callback. The generation is re-checked after every await
    /// because a newer change may supersede this evaluation mid-flight.
    async fn evaluate(&self, captured: u64) {
        if !self.is_live(captured).await {
            return;
        }

        let text = match self.clipboard.get_text().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("clipboard read failed: {:#}", e);
                return;
            }
        };
        if text.is_empty() {
            return;
        }
        if !self.is_live(captured).await {
            return;
        }

        let hash = match self.hasher.hash_text(&text) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("content hashing failed: {:#}", e);
                return;
            }
        };

        let (aggressiveness, options) = {
            let mut state = self.state.lock().await;
            let now = self.clock.now_ms();

            // Restore guard first: it shields repeatedly until expiry.
            if let Some(guard) = &state.restore_guard {
                if guard.is_expired(now) {
                    state.restore_guard = None;
                } else if guard.shields(&hash, now) {
                    return;
                }
            }

            // Echo of our own write, consumed exactly once.
            if state.fingerprint.consume_if_match(&hash) {
                return;
            }

            if !state.settings.trim.auto_trim_enabled {
                return;
            }

            (
                state.settings.trim.aggressiveness,
                state.settings.trim.trim_options(),
            )
        };

        // Engine errors pass the text through untouched.
        let outcome = match self.trim_engine.trim(&text, aggressiveness, &options) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("trim engine failed, leaving clipboard untouched: {:#}", e);
                return;
            }
        };
        if !outcome.changed {
            return;
        }

        // The engine call may have been slow; re-validate before writing.
        if !self.is_live(captured).await {
            return;
        }

        let trimmed_hash = match self.hasher.hash_text(&outcome.output) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("content hashing failed: {:#}", e);
                return;
            }
        };

        let summary = summarize(&outcome.output);
        {
            let mut state = self.state.lock().await;
            // Last check, under the same lock that arms the fingerprint: a
            // fresh change queued behind this lock must not be clobbered.
            if !state.enabled || !state.generation.is_current(captured) {
                return;
            }
            state.last_original = Some(text);
            state.last_trimmed = Some(outcome.output.clone());
            state.last_summary = Some(summary.clone());
            // Armed before the write: the write triggers its own change
            // notification.
            state.fingerprint.arm(trimmed_hash);
        }

        if let Err(e) = self.clipboard.set_text(&outcome.output).await {
            log::warn!("failed to write trimmed text: {:#}", e);
            return;
        }

        let reason = outcome
            .reason
            .map(|r| r.describe().to_string())
            .unwrap_or_else(|| "trimmed".to_string());
        log::info!("clipboard trimmed: {}", reason);
        let _ = self.events.send(AppEvent::ClipboardTrimmed { summary, reason });
    }

    async fn is_live(&self, captured: u64) -> bool {
        let state = self.state.lock().await;
        state.enabled && state.generation.is_current(captured)
    }

    /// Manual paste of the trimmed form, always at the highest
    /// aggressiveness regardless of the configured level.
    pub async fn paste_trimmed(self: &Arc<Self>) -> Result<()> {
        let source = self.paste_source().await?;
        let options = {
            let state = self.state.lock().await;
            state.settings.trim.trim_options()
        };
        let outcome = match self.trim_engine.trim(&source, Aggressiveness::High, &options) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("trim engine failed, pasting source as-is: {:#}", e);
                TrimOutcome::unchanged(&source)
            }
        };
        self.swap_inject_restore(outcome.output).await
    }

    /// Manual paste of the last original text verbatim.
    pub async fn paste_original(self: &Arc<Self>) -> Result<()> {
        let source = self.paste_source().await?;
        self.swap_inject_restore(source).await
    }

    async fn paste_source(&self) -> Result<String> {
        let cached = {
            let state = self.state.lock().await;
            state.last_original.clone()
        };
        let source = match cached {
            Some(text) => text,
            None => self
                .clipboard
                .get_text()
                .await
                .context("clipboard read failed")?,
        };
        if source.is_empty() {
            bail!("nothing to paste");
        }
        Ok(source)
    }

    /// Temporary swap-and-restore: write `text`, fire the paste chord after
    /// a short pause, then write back what was on the clipboard before the
    /// swap. The swap-out is reported synchronously; injection and restore
    /// are fire-and-forget.
    async fn swap_inject_restore(self: &Arc<Self>, text: String) -> Result<()> {
        // Captured before the write so the restore is byte-exact.
        let previous = self
            .clipboard
            .get_text()
            .await
            .context("clipboard read failed")?;

        let (inject_delay, restore_delay) = {
            let state = self.state.lock().await;
            (
                state.settings.trim.paste_inject_delay_ms,
                state.settings.trim.paste_restore_delay_ms,
            )
        };

        let hash = self.hasher.hash_text(&text)?;
        {
            let mut state = self.state.lock().await;
            state.fingerprint.arm(hash);
        }
        self.clipboard
            .set_text(&text)
            .await
            .context("clipboard write failed")?;

        let watcher = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(inject_delay)).await;
            match watcher.injector.inject_paste().await {
                InjectOutcome::Injected => {}
                outcome => log::info!("paste injection not performed: {:?}", outcome),
            }

            let remaining = restore_delay.saturating_sub(inject_delay);
            tokio::time::sleep(Duration::from_millis(remaining)).await;
            if let Err(e) = watcher.write_restored(&previous).await {
                log::warn!("delayed clipboard restore failed: {:#}", e);
            }
        });

        Ok(())
    }

    /// Put the cached original back immediately. Idempotent; a no-op when
    /// nothing was trimmed yet.
    pub async fn restore_last_copy(&self) -> Result<()> {
        let original = {
            let state = self.state.lock().await;
            state.last_original.clone()
        };
        let Some(original) = original else {
            return Ok(());
        };
        self.write_restored(&original).await
    }

    /// Shared restore path: shields the written content with the restore
    /// guard so the resulting notification is never misread as a fresh
    /// auto-trim trigger, even if it arrives more than once.
    async fn write_restored(&self, text: &str) -> Result<()> {
        let hash = self.hasher.hash_text(text)?;
        {
            let mut state = self.state.lock().await;
            let expires_at = self.clock.now_ms()
                + state.settings.trim.paste_restore_delay_ms as i64
                + RESTORE_GUARD_SLACK_MS;
            state.restore_guard = Some(RestoreGuard::new(hash.clone(), expires_at));
            state.fingerprint.arm(hash);
        }
        self.clipboard
            .set_text(text)
            .await
            .context("clipboard write failed")
    }

    pub async fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        state.enabled = enabled;
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    pub async fn settings(&self) -> Settings {
        self.state.lock().await.settings.clone()
    }

    pub async fn last_summary(&self) -> Option<String> {
        self.state.lock().await.last_summary.clone()
    }

    pub async fn last_original(&self) -> Option<String> {
        self.state.lock().await.last_original.clone()
    }

    pub async fn last_trimmed(&self) -> Option<String> {
        self.state.lock().await.last_trimmed.clone()
    }

    pub async fn set_auto_trim_enabled(&self, enabled: bool) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.auto_trim_enabled == enabled {
                return false;
            }
            trim.auto_trim_enabled = enabled;
            true
        })
        .await
    }

    pub async fn set_keep_blank_lines(&self, keep: bool) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.keep_blank_lines == keep {
                return false;
            }
            trim.keep_blank_lines = keep;
            true
        })
        .await
    }

    pub async fn set_strip_box_chars(&self, strip: bool) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.strip_box_chars == strip {
                return false;
            }
            trim.strip_box_chars = strip;
            true
        })
        .await
    }

    pub async fn set_trim_prompts(&self, trim_prompts: bool) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.trim_prompts == trim_prompts {
                return false;
            }
            trim.trim_prompts = trim_prompts;
            true
        })
        .await
    }

    pub async fn set_max_lines(&self, max_lines: usize) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.max_lines == max_lines {
                return false;
            }
            trim.max_lines = max_lines;
            true
        })
        .await
    }

    pub async fn set_aggressiveness(&self, aggressiveness: Aggressiveness) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.aggressiveness == aggressiveness {
                return false;
            }
            trim.aggressiveness = aggressiveness;
            true
        })
        .await
    }

    pub async fn set_debounce_delay_ms(&self, delay_ms: u64) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.debounce_delay_ms == delay_ms {
                return false;
            }
            trim.debounce_delay_ms = delay_ms;
            true
        })
        .await
    }

    pub async fn set_paste_inject_delay_ms(&self, delay_ms: u64) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.paste_inject_delay_ms == delay_ms {
                return false;
            }
            trim.paste_inject_delay_ms = delay_ms;
            true
        })
        .await
    }

    pub async fn set_paste_restore_delay_ms(&self, delay_ms: u64) -> Result<bool> {
        self.update_trim_settings(|trim| {
            if trim.paste_restore_delay_ms == delay_ms {
                return false;
            }
            trim.paste_restore_delay_ms = delay_ms;
            true
        })
        .await
    }

    /// Applies one mutation to the trim settings. Unchanged values are a
    /// no-op so persistence and change events fire only on real edits.
    async fn update_trim_settings<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut TrimSettings) -> bool,
    {
        let snapshot = {
            let mut state = self.state.lock().await;
            if !mutate(&mut state.settings.trim) {
                return Ok(false);
            }
            state.settings.clone()
        };
        self.settings_repo
            .save(&snapshot)
            .await
            .context("failed to persist settings")?;
        let _ = self.events.send(AppEvent::SettingsChanged);
        Ok(true)
    }
}
