//! # Live Channel Smoke Test
//!
//! Connects to a real LiveLink endpoint, subscribes to a category, and
//! prints whatever arrives for a fixed window. Useful for eyeballing the
//! reconnect and fallback behavior against a live server.

use std::time::Duration;

use lib_realtime::{ConnectionState, RealtimeClient, RealtimeConfig};

/// Executes the live channel check.
///
/// // Statement: Prints every received event and state transition to stdout.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // // Statement: Endpoint and category come from the environment with local defaults
    let channel_url = std::env::var("LIVELINK_CHANNEL_URL")
        .unwrap_or_else(|_| "ws://127.0.0.1:9010/ws".to_string());
    let rest_base_url = std::env::var("LIVELINK_REST_BASE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:9010/v1/updates".to_string());
    let category =
        std::env::var("LIVELINK_CATEGORY").unwrap_or_else(|_| "social".to_string());
    let seconds: u64 = std::env::var("LIVELINK_TEST_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let config = RealtimeConfig {
        channel_url: channel_url.clone(),
        rest_base_url,
        ..RealtimeConfig::default()
    };

    println!("[*] Connecting to {} (category '{}')...", channel_url, category);

    let client = RealtimeClient::spawn(config);

    let tag = category.clone();
    client.subscribe(&category, move |event| {
        println!("[EVENT] [{}] {}: {}", tag, event.event, event.data);
    });

    // // Statement: Report every lifecycle transition while the window runs
    let mut state_rx = client.state_watch();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::PollingFallback => {
                    println!("[STATE] PollingFallback (degraded mode)")
                }
                other => println!("[STATE] {:?}", other),
            }
        }
    });

    client.start();
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    client.stop();
    println!("[*] Done after {} seconds.", seconds);

    Ok(())
}
