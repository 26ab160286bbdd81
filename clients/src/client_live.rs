use anyhow::Result;
use std::path::Path;
use tokio::signal;

mod live_logic;
use live_logic::{config, logger};

use lib_realtime::{ConnectionState, RealtimeClient};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    logger::setup_logging(
        config.log_dir.as_deref().unwrap_or(Path::new("./logs")),
        config.log_level.as_deref().unwrap_or("info"),
    )?;

    let client = RealtimeClient::spawn(config.to_realtime_config());

    for category in config.category_list() {
        let tag = category.clone();
        client.subscribe(&category, move |event| {
            log::info!("[{}] {}: {}", tag, event.event, event.data);
        });
    }

    // Surface lifecycle transitions, in particular the degraded-service
    // indicator when the push channel gives way to polling.
    let mut state_rx = client.state_watch();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::PollingFallback => {
                    log::warn!("Live updates degraded: polling fallback active");
                }
                other => log::info!("Live updates: {:?}", other),
            }
        }
    });

    client.start();

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    client.stop();

    log::info!("Shutdown complete.");
    Ok(())
}
