//! Connection manager lifecycle: queue replay, re-subscription, stop
//! semantics, heartbeat liveness, and frame handling — all driven through
//! an in-memory transport under tokio's paused clock.

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use common::{as_json, test_config, within, MockConnector, MockPollSource};
use lib_realtime::{ConnectionState, Envelope, RealtimeClient, UpdateEvent};

fn collect(client: &RealtimeClient, category: &str) -> mpsc::UnboundedReceiver<UpdateEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(category, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

#[tokio::test(start_paused = true)]
async fn queued_frames_flush_in_order_once_the_channel_opens() {
    let (connector, mut sessions) = MockConnector::new(2);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());

    // Two frames sent while disconnected, channel opens on the 3rd attempt.
    client.send(Envelope::custom("cart_sync", json!({ "seq": 1 })));
    client.send(Envelope::custom("cart_sync", json!({ "seq": 2 })));
    client.start();

    let mut session = within(sessions.recv()).await.expect("channel never opened");
    assert_eq!(connector.attempts(), 3);

    let first = within(session.sent.recv()).await.unwrap();
    let second = within(session.sent.recv()).await.unwrap();
    assert_eq!(as_json(&first)["data"]["seq"], 1);
    assert_eq!(as_json(&second)["data"]["seq"], 2);

    // Newly-originated traffic only after the replay, and no duplicates.
    client.send(Envelope::custom("cart_sync", json!({ "seq": 3 })));
    let third = within(session.sent.recv()).await.unwrap();
    assert_eq!(as_json(&third)["data"]["seq"], 3);
    assert!(session.sent.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn subscriptions_are_reissued_after_every_reconnect() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());
    let mut events = collect(&client, "social");
    client.start();

    let mut first = within(sessions.recv()).await.unwrap();
    let subscribe = within(first.sent.recv()).await.unwrap();
    assert_eq!(
        as_json(&subscribe),
        json!({ "type": "subscribe", "event_type": "social" })
    );

    first
        .inject
        .send(Ok(
            r#"{"type":"social_update","event":"post_created","data":{"id":7}}"#.to_string(),
        ))
        .unwrap();
    let event = within(events.recv()).await.unwrap();
    assert_eq!(event.category, "social");
    assert_eq!(event.event, "post_created");
    assert_eq!(event.data["id"], 7);

    // Unexpected remote close; the manager reconnects and re-subscribes
    // with no action from the consumer.
    drop(first.inject);
    let mut second = within(sessions.recv()).await.unwrap();
    let resubscribe = within(second.sent.recv()).await.unwrap();
    assert_eq!(
        as_json(&resubscribe),
        json!({ "type": "subscribe", "event_type": "social" })
    );
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_while_reconnecting_cancels_the_retry_timer() {
    let (connector, _sessions) = MockConnector::new(u32::MAX);
    let mut config = test_config();
    config.max_reconnect_attempts = 50;
    let client = RealtimeClient::spawn_with(config, connector.clone(), MockPollSource::new());
    let mut state = client.state_watch();
    client.start();

    within(state.wait_for(|s| *s == ConnectionState::Reconnecting))
        .await
        .unwrap();
    client.stop();
    within(state.wait_for(|s| *s == ConnectionState::Idle))
        .await
        .unwrap();

    // No open attempt may happen after stop(), even past the max backoff.
    let attempts_after_stop = connector.attempts();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.attempts(), attempts_after_stop);
    assert_eq!(client.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stop_while_open_closes_without_scheduling_a_retry() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());
    let mut state = client.state_watch();
    client.start();

    let _session = within(sessions.recv()).await.unwrap();
    within(state.wait_for(|s| *s == ConnectionState::Open))
        .await
        .unwrap();

    client.stop();
    within(state.wait_for(|s| *s == ConnectionState::Idle))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_frame_types_are_dropped_without_breaking_the_channel() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());
    let mut events = collect(&client, "social");
    client.start();

    let mut session = within(sessions.recv()).await.unwrap();
    let _subscribe = within(session.sent.recv()).await.unwrap();

    session
        .inject
        .send(Ok(r#"{"type":"mystery_blob","data":{"x":1}}"#.to_string()))
        .unwrap();
    session
        .inject
        .send(Ok("definitely not json".to_string()))
        .unwrap();
    session
        .inject
        .send(Ok(
            r#"{"type":"social_update","event":"post_created","data":{"id":1}}"#.to_string(),
        ))
        .unwrap();

    // Only the valid update reaches the consumer; the channel stays open.
    let event = within(events.recv()).await.unwrap();
    assert_eq!(event.event, "post_created");
    assert!(events.try_recv().is_err());
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn unanswered_probe_forces_a_reconnect_without_a_close_event() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());
    client.start();

    let mut first = within(sessions.recv()).await.unwrap();
    let probe = within(first.sent.recv()).await.unwrap();
    assert_eq!(as_json(&probe), json!({ "type": "ping" }));

    // No pong, no close, nothing: silence alone must tear the session
    // down and open a fresh one.
    let _second = within(sessions.recv()).await.unwrap();
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn acknowledged_probes_keep_the_channel_open() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector.clone(), MockPollSource::new());
    client.start();

    let mut session = within(sessions.recv()).await.unwrap();
    let probe = within(session.sent.recv()).await.unwrap();
    assert_eq!(as_json(&probe), json!({ "type": "ping" }));
    session
        .inject
        .send(Ok(r#"{"type":"pong"}"#.to_string()))
        .unwrap();

    // Surviving to a second probe on the same session means the ack was
    // honored across the full timeout window.
    let next_probe = within(session.sent.recv()).await.unwrap();
    assert_eq!(as_json(&next_probe), json!({ "type": "ping" }));
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_pings_are_answered_with_pongs() {
    let (connector, mut sessions) = MockConnector::new(0);
    let client = RealtimeClient::spawn_with(test_config(), connector, MockPollSource::new());
    client.start();

    let mut session = within(sessions.recv()).await.unwrap();
    session
        .inject
        .send(Ok(r#"{"type":"ping"}"#.to_string()))
        .unwrap();
    let reply = within(session.sent.recv()).await.unwrap();
    assert_eq!(as_json(&reply), json!({ "type": "pong" }));
}
