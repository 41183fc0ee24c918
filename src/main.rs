pub mod config;
pub mod control;
pub mod sensor;
pub mod transport;

use crate::config::Config;
use crate::control::controller_handle::ControllerHandle;
use crate::sensor::ListenerHandle;
use crate::transport::EmitterHandle;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Optional config path as first argument, otherwise the per-user default.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load_or_default(config_path)
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    info!(
        "Translating OSC on {} to commands for {}",
        config.network.listen_addr, config.network.target_addr
    );

    let (event_sender, event_receiver) = mpsc::channel(1000);
    let (command_sender, command_receiver) = mpsc::channel(100);

    let mut emitter = EmitterHandle::spawn(config.emitter_settings(), command_receiver)
        .await
        .map_err(|e| eyre!("Failed to start command emitter: {}", e))?;

    let mut controller = ControllerHandle::spawn(
        config.controller_settings(),
        config.adapter_set(),
        event_receiver,
        command_sender,
    )
    .map_err(|e| eyre!("Failed to start controller: {}", e))?;

    let mut listener = ListenerHandle::spawn(config.listener_settings(), event_sender)
        .await
        .map_err(|e| eyre!("Failed to start OSC listener: {}", e))?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    // Inbound first, then the translation core (which flushes outstanding
    // releases), then the emitter drains whatever is still queued.
    listener.shutdown().await;
    controller
        .shutdown()
        .await
        .map_err(|e| eyre!("Controller shutdown failed: {}", e))?;
    emitter.join().await;

    info!("Shutdown complete");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
