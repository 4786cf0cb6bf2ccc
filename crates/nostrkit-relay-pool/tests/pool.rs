// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! End-to-end tests against a scripted in-process relay.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nostrkit::prelude::*;
use nostrkit_relay_pool::{
    RelayOptions, RelayPool, RelayPoolNotification, RelayPoolOptions, RelayStatus,
    SubscriptionManager, SubscriptionManagerOptions, SubscriptionNotification,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted relay behaviour
#[derive(Debug, Clone, Default)]
struct MockBehaviour {
    /// Events served in response to any `REQ` (before `EOSE`)
    stored_events: Vec<Event>,
    /// Send an `AUTH` challenge as soon as the socket opens
    auth_challenge: Option<String>,
}

/// Spawn a relay on a random localhost port.
///
/// Returns the relay url and a stream of every client frame it receives.
async fn spawn_mock_relay(behaviour: MockBehaviour) -> (RelayUrl, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel::<Value>();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let behaviour = behaviour.clone();
            let frames_tx = frames_tx.clone();

            tokio::spawn(async move {
                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(..) => return,
                };
                let (mut sink, mut stream) = ws.split();

                if let Some(challenge) = &behaviour.auth_challenge {
                    let frame = format!(r#"["AUTH","{challenge}"]"#);
                    let _ = sink.send(Message::Text(frame)).await;
                }

                while let Some(Ok(msg)) = stream.next().await {
                    let text = match msg {
                        Message::Text(text) => text,
                        Message::Close(..) => break,
                        _ => continue,
                    };

                    let frame: Value = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(..) => continue,
                    };
                    let _ = frames_tx.send(frame.clone());

                    if frame[0] == "REQ" {
                        let sub_id = frame[1].as_str().unwrap_or_default().to_string();
                        for event in behaviour.stored_events.iter() {
                            let frame =
                                format!(r#"["EVENT","{sub_id}",{}]"#, event.as_json());
                            let _ = sink.send(Message::Text(frame)).await;
                        }
                        let _ = sink
                            .send(Message::Text(format!(r#"["EOSE","{sub_id}"]"#)))
                            .await;
                    } else if frame[0] == "EVENT" || frame[0] == "AUTH" {
                        if let Some(id) = frame[1]["id"].as_str() {
                            let _ = sink
                                .send(Message::Text(format!(r#"["OK","{id}",true,""]"#)))
                                .await;
                        }
                    }
                }
            });
        }
    });

    (
        RelayUrl::parse(format!("ws://{addr}")).unwrap(),
        frames_rx,
    )
}

fn new_pool() -> RelayPool {
    let manager = Arc::new(SubscriptionManager::new(SubscriptionManagerOptions::default()));
    RelayPool::new(manager, RelayPoolOptions::default())
}

async fn next_frame_of_type(
    frames: &mut mpsc::UnboundedReceiver<Value>,
    frame_type: &str,
) -> Value {
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(frame) = frames.recv().await {
            if frame[0] == frame_type {
                return frame;
            }
        }
        panic!("relay frame stream closed");
    })
    .await
    .expect("expected frame never arrived")
}

#[tokio::test]
async fn test_subscription_sent_on_connect() {
    let (url, mut frames) = spawn_mock_relay(MockBehaviour::default()).await;
    let pool = new_pool();

    pool.add_relay(&url, RelayOptions::default()).await.unwrap();
    let relay = pool.relay(&url).await.unwrap();

    // Subscribe while offline: the REQ must go out once connected
    let mut subscription = pool
        .manager()
        .subscribe(vec![Filter::new().kind(Kind::TEXT_NOTE)])
        .await;
    pool.manager()
        .attach_relay(subscription.id(), relay.clone())
        .await
        .unwrap();

    assert!(pool.connect(Some(Duration::from_secs(10))).await);

    let req = next_frame_of_type(&mut frames, "REQ").await;
    assert_eq!(req[1].as_str(), Some(subscription.id().as_str()));
    assert_eq!(req[2]["kinds"][0].as_u64(), Some(1));

    // The relay answers with EOSE
    match tokio::time::timeout(Duration::from_secs(10), subscription.recv())
        .await
        .unwrap()
    {
        Some(SubscriptionNotification::EndOfStoredEvents { relay_url }) => {
            assert_eq!(relay_url, url);
        }
        other => panic!("expected EOSE, got {other:?}"),
    }

    pool.shutdown().await;
}

#[tokio::test]
async fn test_same_event_from_two_relays_delivered_once() {
    let keys = Keys::generate();
    let event = EventBuilder::text_note("seen everywhere")
        .sign_with_keys(&keys)
        .unwrap();

    let behaviour = MockBehaviour {
        stored_events: vec![event.clone()],
        auth_challenge: None,
    };
    let (url1, _frames1) = spawn_mock_relay(behaviour.clone()).await;
    let (url2, _frames2) = spawn_mock_relay(behaviour).await;

    let pool = new_pool();
    pool.add_relay(&url1, RelayOptions::default()).await.unwrap();
    pool.add_relay(&url2, RelayOptions::default()).await.unwrap();

    let mut subscription = pool
        .manager()
        .subscribe(vec![Filter::new().kind(Kind::TEXT_NOTE)])
        .await;
    for relay in pool.relays().await.into_values() {
        pool.manager()
            .attach_relay(subscription.id(), relay)
            .await
            .unwrap();
    }

    pool.connect(None).await;

    // Collect until both relays signalled EOSE
    let mut received_events: Vec<EventId> = Vec::new();
    let mut eose_count: usize = 0;
    tokio::time::timeout(Duration::from_secs(10), async {
        while eose_count < 2 {
            match subscription.recv().await {
                Some(SubscriptionNotification::Event { event, .. }) => {
                    received_events.push(event.id);
                }
                Some(SubscriptionNotification::EndOfStoredEvents { .. }) => {
                    eose_count += 1;
                }
                None => break,
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(received_events, vec![event.id]);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_publish_reaches_relay() {
    let (url, mut frames) = spawn_mock_relay(MockBehaviour::default()).await;
    let pool = new_pool();
    pool.add_relay(&url, RelayOptions::default()).await.unwrap();
    assert!(pool.connect(Some(Duration::from_secs(10))).await);

    let keys = Keys::generate();
    let event = EventBuilder::text_note("published").sign_with_keys(&keys).unwrap();

    let output = pool.send_event(event.clone()).await.unwrap();
    assert!(output.success.contains(&url));
    assert_eq!(output.val, event.id);

    let frame = next_frame_of_type(&mut frames, "EVENT").await;
    assert_eq!(frame[1]["id"].as_str(), Some(event.id.to_hex().as_str()));

    pool.shutdown().await;
}

#[tokio::test]
async fn test_auth_challenge_without_signer() {
    let (url, _frames) = spawn_mock_relay(MockBehaviour {
        stored_events: Vec::new(),
        auth_challenge: Some(String::from("challenge-123")),
    })
    .await;

    let pool = new_pool();
    let mut notifications = pool.notifications();
    pool.add_relay(&url, RelayOptions::default()).await.unwrap();
    assert!(pool.connect(Some(Duration::from_secs(10))).await);

    // Without a signer the relay reports the challenge and stays put
    let challenge = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(RelayPoolNotification::RelayAuthRequired { challenge, .. }) =
                notifications.recv().await
            {
                return challenge;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(challenge, "challenge-123");

    let relay = pool.relay(&url).await.unwrap();
    assert_eq!(relay.status(), RelayStatus::AuthRequired);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_auth_challenge_with_signer() {
    let (url, mut frames) = spawn_mock_relay(MockBehaviour {
        stored_events: Vec::new(),
        auth_challenge: Some(String::from("challenge-456")),
    })
    .await;

    let keys = Keys::generate();
    let pool = new_pool();
    pool.set_signer(Some(keys.clone().into_nostr_signer())).await;
    pool.add_relay(&url, RelayOptions::default()).await.unwrap();
    assert!(pool.connect(Some(Duration::from_secs(10))).await);

    // The signed kind-22242 response carries relay and challenge tags
    let frame = next_frame_of_type(&mut frames, "AUTH").await;
    assert_eq!(frame[1]["kind"].as_u64(), Some(22_242));
    let tags = frame[1]["tags"].as_array().unwrap();
    assert!(tags
        .iter()
        .any(|t| t[0] == "challenge" && t[1] == "challenge-456"));

    // The relay accepted: status flips to authenticated
    let relay = pool.relay(&url).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if relay.status() == RelayStatus::Authenticated {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(relay.stats().auth_attempts(), 1);
    assert_eq!(relay.stats().auth_success(), 1);

    pool.shutdown().await;
}

#[tokio::test]
async fn test_stats_track_traffic() {
    let keys = Keys::generate();
    let event = EventBuilder::text_note("traffic").sign_with_keys(&keys).unwrap();

    let (url, _frames) = spawn_mock_relay(MockBehaviour {
        stored_events: vec![event],
        auth_challenge: None,
    })
    .await;

    let pool = new_pool();
    pool.add_relay(&url, RelayOptions::default()).await.unwrap();

    let mut subscription = pool
        .manager()
        .subscribe(vec![Filter::new().kind(Kind::TEXT_NOTE)])
        .await;
    let relay = pool.relay(&url).await.unwrap();
    pool.manager()
        .attach_relay(subscription.id(), relay.clone())
        .await
        .unwrap();

    assert!(pool.connect(Some(Duration::from_secs(10))).await);

    // Wait until the stored event went through the pipeline
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(SubscriptionNotification::Event { .. }) = subscription.recv().await {
                break;
            }
        }
    })
    .await
    .unwrap();

    let stats = relay.stats();
    assert_eq!(stats.attempts(), 1);
    assert_eq!(stats.success(), 1);
    assert!(stats.messages_sent() >= 1);
    assert!(stats.messages_received() >= 1);
    assert!(stats.bytes_received() > 0);
    assert_eq!(stats.events_validated(), 1);
    assert!(!stats.first_connection_at().is_zero());

    let aggregate = pool.aggregate_stats().await;
    assert_eq!(aggregate.success, 1);
    assert_eq!(aggregate.events_validated, 1);

    pool.shutdown().await;
}
