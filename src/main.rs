mod control;

use std::sync::Arc;

use anyhow::{Context, Result};

use tb_app::{app_event_channel, PortalInjector, TrimWatcher};
use tb_core::ports::{PermissionStorePort, RemoteInputPort, SettingsPort};
use tb_infra::{BasicTrimEngine, FileSettingsRepository, Sha256Hasher, SystemClock};
use tb_platform::{
    platform_event_channel, spawn_clipboard_watch, PlatformEvent, PortalPermissionStore,
    PortalRemoteInput, SystemClipboard, UnavailablePermissionStore, UnavailableRemoteInput,
};

const APP_ID: &str = "dev.trimboard.Trimboard";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = dirs::config_dir()
        .context("no user config directory")?
        .join("trimboard")
        .join("settings.json");
    let settings_repo = Arc::new(FileSettingsRepository::new(settings_path));
    let settings = settings_repo.load().await?;

    let clipboard = Arc::new(SystemClipboard::new()?);
    let (events, _keepalive) = app_event_channel(64);

    // Both portal adapters degrade to stand-ins when the broker is absent;
    // the watcher keeps trimming either way.
    let broker: Arc<dyn RemoteInputPort> = match PortalRemoteInput::connect().await {
        Ok(broker) => Arc::new(broker),
        Err(e) => {
            log::warn!("remote-desktop portal unavailable: {:#}", e);
            Arc::new(UnavailableRemoteInput)
        }
    };
    let permission_store: Arc<dyn PermissionStorePort> = match PortalPermissionStore::connect()
        .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::warn!("portal permission store unavailable: {:#}", e);
            Arc::new(UnavailablePermissionStore)
        }
    };

    let injector = Arc::new(PortalInjector::new(
        broker,
        permission_store,
        settings_repo.clone(),
        APP_ID,
        events.clone(),
    ));
    injector.spawn_signal_loop();
    injector.probe_preauthorization().await;

    let watcher = Arc::new(TrimWatcher::new(
        clipboard,
        Arc::new(BasicTrimEngine),
        settings_repo,
        Arc::new(Sha256Hasher),
        Arc::new(SystemClock),
        injector.clone(),
        settings,
        events,
    ));

    let (platform_tx, mut platform_rx) = platform_event_channel(64);
    let watch_handle = spawn_clipboard_watch(platform_tx)?;

    let event_watcher = watcher.clone();
    tokio::spawn(async move {
        while let Some(event) = platform_rx.recv().await {
            match event {
                PlatformEvent::ClipboardChanged => event_watcher.on_clipboard_changed().await,
            }
        }
    });

    let _control = control::serve(watcher, injector).await?;
    log::info!("trimboard running as {}", control::BUS_NAME);

    shutdown_signal().await?;
    log::info!("shutting down");
    watch_handle.stop().await;
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
    Ok(())
}
