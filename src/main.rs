use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::sync::mpsc;

use scriptorium::config::Config;
use scriptorium::control;
use scriptorium::core_state::CoreState;
use scriptorium::event_loop;
use scriptorium::net::listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.default_log_directive()),
    );
    builder.init();

    info!(
        "starting on {}:{} (documents: {}, credentials: {})",
        config.bind, config.port, config.documents_dir, config.credentials_db
    );

    let state = CoreState::new(&config.documents_dir, &config.credentials_db)
        .with_context(|| "failed to initialize core state")?;

    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    listener::spawn(&config.bind, config.port, config.backlog, inbound_tx, accepted_tx)
        .await
        .with_context(|| "failed to start listener")?;

    control::spawn(control_tx);

    event_loop::run(state, accepted_rx, inbound_rx, control_rx).await;

    info!("shut down");
    Ok(())
}
