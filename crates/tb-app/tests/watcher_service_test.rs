mod support;

use std::sync::Arc;
use std::time::Duration;

use tb_app::{app_event_channel, TrimWatcher};
use tb_core::settings::model::Settings;
use tb_core::{Aggressiveness, InjectOutcome};
use tb_infra::Sha256Hasher;

use support::{FakeClipboard, FakeInjector, FakeSettingsRepo, FakeTrimEngine, TestClock};

struct Harness {
    watcher: Arc<TrimWatcher>,
    clipboard: Arc<FakeClipboard>,
    engine: Arc<FakeTrimEngine>,
    repo: Arc<FakeSettingsRepo>,
    injector: Arc<FakeInjector>,
}

fn harness(settings: Settings) -> Harness {
    let clipboard = Arc::new(FakeClipboard::with_content(""));
    let engine = Arc::new(FakeTrimEngine::new());
    let repo = Arc::new(FakeSettingsRepo::new(settings.clone()));
    let injector = Arc::new(FakeInjector::returning(InjectOutcome::Injected));
    let (events, _keepalive) = app_event_channel(16);
    let watcher = Arc::new(TrimWatcher::new(
        clipboard.clone(),
        engine.clone(),
        repo.clone(),
        Arc::new(Sha256Hasher),
        Arc::new(TestClock::new()),
        injector.clone(),
        settings,
        events,
    ));
    Harness {
        watcher,
        clipboard,
        engine,
        repo,
        injector,
    }
}

const KUBECTL: &str = "kubectl get pods \\\n  -n kube-system \\\n  | jq '.items[].metadata.name'";

#[tokio::test(start_paused = true)]
async fn burst_of_changes_coalesces_into_one_evaluation() {
    let h = harness(Settings::default());

    h.clipboard.set_content("ls -la\n  /tmp");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    h.clipboard.set_content(KUBECTL);
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.engine.call_count(), 1);
    let (input, aggressiveness) = h.engine.last_call().unwrap();
    assert_eq!(input, KUBECTL);
    assert_eq!(aggressiveness, Aggressiveness::Normal);
    // The flattened output landed on the clipboard.
    assert_eq!(h.clipboard.write_count(), 1);
    assert!(!h.clipboard.content().contains('\n'));
}

#[tokio::test(start_paused = true)]
async fn own_write_echo_never_retriggers_the_pipeline() {
    let h = harness(Settings::default());

    h.clipboard.set_content("a\n  b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.call_count(), 1);
    assert_eq!(h.clipboard.content(), "a b");

    // The write above comes back to us as a change notification.
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.call_count(), 1);
    assert_eq!(h.clipboard.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_trim_disabled_reads_but_never_trims() {
    let mut settings = Settings::default();
    settings.trim.auto_trim_enabled = false;
    let h = harness(settings);

    h.clipboard.set_content("a\n  b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.engine.call_count(), 0);
    assert_eq!(h.clipboard.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unchanged_outcome_writes_nothing() {
    let h = harness(Settings::default());

    h.clipboard.set_content("already flat");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.engine.call_count(), 1);
    assert_eq!(h.clipboard.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disabled_watcher_ignores_changes() {
    let h = harness(Settings::default());
    h.watcher.set_enabled(false).await;

    h.clipboard.set_content("a\n  b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.engine.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn paste_trimmed_swaps_injects_and_restores_byte_for_byte() {
    let h = harness(Settings::default());
    h.clipboard.set_content("  spaced  \n  out  ");

    h.watcher.paste_trimmed().await.unwrap();

    // Swap-out is synchronous and always runs at the highest level.
    assert_eq!(h.clipboard.content(), "spaced out");
    assert_eq!(h.engine.last_call().unwrap().1, Aggressiveness::High);
    assert_eq!(h.injector.call_count(), 0);

    // Injection fires after the inject delay, restore after the restore
    // delay, both from the same background task.
    tokio::time::sleep(Duration::from_millis(1_300)).await;
    assert_eq!(h.injector.call_count(), 1);
    assert_eq!(h.clipboard.content(), "  spaced  \n  out  ");
}

#[tokio::test(start_paused = true)]
async fn paste_original_skips_the_trim_engine() {
    let h = harness(Settings::default());
    h.clipboard.set_content("  raw  ");

    h.watcher.paste_original().await.unwrap();

    assert_eq!(h.engine.call_count(), 0);
    assert_eq!(h.clipboard.content(), "  raw  ");
    tokio::time::sleep(Duration::from_millis(1_300)).await;
    assert_eq!(h.injector.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn paste_with_empty_clipboard_reports_nothing_to_paste() {
    let h = harness(Settings::default());

    let err = h.watcher.paste_trimmed().await.unwrap_err();
    assert!(err.to_string().contains("nothing to paste"));
    assert_eq!(h.clipboard.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn restore_last_copy_is_shielded_from_reevaluation() {
    let h = harness(Settings::default());

    h.clipboard.set_content("  a\n b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.call_count(), 1);
    assert_eq!(h.watcher.last_original().await.as_deref(), Some("  a\n b"));

    h.watcher.restore_last_copy().await.unwrap();
    assert_eq!(h.clipboard.content(), "  a\n b");

    // The restore's own change notification must not re-trigger a trim.
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restore_without_history_is_a_noop() {
    let h = harness(Settings::default());
    h.watcher.restore_last_copy().await.unwrap();
    assert_eq!(h.clipboard.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_setting_value_persists_exactly_once() {
    let h = harness(Settings::default());

    assert!(h.watcher.set_auto_trim_enabled(false).await.unwrap());
    assert!(!h.watcher.set_auto_trim_enabled(false).await.unwrap());

    assert_eq!(h.repo.saves(), 1);
    assert!(!h.repo.stored().trim.auto_trim_enabled);
}

#[tokio::test(start_paused = true)]
async fn change_landing_mid_evaluation_is_never_clobbered() {
    let h = harness(Settings::default());

    let gate = h.clipboard.hold_next_read();
    h.clipboard.set_content("stale\n  text");
    h.watcher.on_clipboard_changed().await;
    // The debounce fires and the first evaluation parks inside the read.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A newer change lands while that evaluation is still in flight.
    h.clipboard.set_content("fresh\n  text");
    h.watcher.on_clipboard_changed().await;
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Only the newer content was trimmed; the superseded evaluation wrote
    // nothing and armed no fingerprint.
    assert_eq!(h.engine.call_count(), 1);
    assert_eq!(h.engine.last_call().unwrap().0, "fresh\n  text");
    assert_eq!(h.clipboard.content(), "fresh text");
    assert_eq!(h.clipboard.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn inject_delay_change_persists_and_shifts_injection_timing() {
    let h = harness(Settings::default());

    assert!(h.watcher.set_paste_inject_delay_ms(300).await.unwrap());
    assert!(!h.watcher.set_paste_inject_delay_ms(300).await.unwrap());
    assert_eq!(h.repo.saves(), 1);
    assert_eq!(h.repo.stored().trim.paste_inject_delay_ms, 300);

    h.clipboard.set_content("  padded  ");
    h.watcher.paste_trimmed().await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(h.injector.call_count(), 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.injector.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn aggressiveness_change_persists_and_applies() {
    let h = harness(Settings::default());

    assert!(h
        .watcher
        .set_aggressiveness(Aggressiveness::High)
        .await
        .unwrap());
    assert_eq!(h.repo.saves(), 1);

    h.clipboard.set_content("a\n  b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.last_call().unwrap().1, Aggressiveness::High);
}

#[tokio::test(start_paused = true)]
async fn last_summary_tracks_the_latest_trim() {
    let h = harness(Settings::default());

    h.clipboard.set_content("a\n  b");
    h.watcher.on_clipboard_changed().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.watcher.last_summary().await.as_deref(), Some("a b"));
    assert_eq!(h.watcher.last_trimmed().await.as_deref(), Some("a b"));
}
