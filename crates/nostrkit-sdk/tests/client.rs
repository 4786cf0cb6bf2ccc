// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use nostrkit::nips::nip02::Contact;
use nostrkit::nips::nip65::RelayMetadata;
use nostrkit::prelude::*;
use nostrkit_sdk::{AccountSigner, AccountStore, Client, MemoryAccountStore, Options};

fn client_options() -> Options {
    // No discovery relays: tests never touch the network for routing
    Options::default().discovery_relays(Vec::<RelayUrl>::new())
}

async fn test_client() -> Client {
    Client::builder()
        .account_store(MemoryAccountStore::new())
        .opts(client_options())
        .build()
        .await
}

#[tokio::test]
async fn test_login_logout_switch() {
    let client = test_client().await;

    let alice = Keys::generate();
    let bob = Keys::generate();

    // Login two identities; the latest login is active
    let login = client.login(alice.clone()).await.unwrap();
    assert!(login.persist_error.is_none());
    assert_eq!(client.active_account(), Some(alice.public_key()));

    client.login(bob.clone()).await.unwrap();
    assert_eq!(client.active_account(), Some(bob.public_key()));
    assert_eq!(client.accounts().await.len(), 2);

    // Switch back
    assert!(client.switch_account(&alice.public_key()).await);
    assert_eq!(client.active_account(), Some(alice.public_key()));
    assert!(!client.switch_account(&Keys::generate().public_key()).await);

    // Logout the active account: the remaining one takes over
    client.logout(None).await.unwrap();
    assert_eq!(client.active_account(), Some(bob.public_key()));
    assert_eq!(client.accounts().await, vec![bob.public_key()]);

    client.logout(Some(bob.public_key())).await.unwrap();
    assert_eq!(client.active_account(), None);
    assert!(client.accounts().await.is_empty());

    client.close().await;
}

#[tokio::test]
async fn test_restore_accounts_from_store() {
    let store = MemoryAccountStore::new();
    let keys = Keys::generate();

    // First client persists the identity
    {
        let client = Client::builder()
            .account_store(store.clone())
            .opts(client_options())
            .build()
            .await;
        client.login(keys.clone()).await.unwrap();
        client.close().await;
    }

    // Second client restores it
    let client = Client::builder()
        .account_store(store.clone())
        .opts(client_options())
        .build()
        .await;

    let restored = client.restore_accounts().await.unwrap();
    assert_eq!(restored, vec![keys.public_key()]);
    // The restored account is active with a live session subscription
    assert_eq!(client.active_account(), Some(keys.public_key()));
    let user = client.current_user().await.unwrap();
    assert!(user.session_subscription_id().await.is_some());

    client.close().await;
}

#[tokio::test]
async fn test_logout_removes_persisted_entry() {
    let store = MemoryAccountStore::new();
    let keys = Keys::generate();

    let client = Client::builder()
        .account_store(store.clone())
        .opts(client_options())
        .build()
        .await;

    client.login(keys.clone()).await.unwrap();
    client.logout(None).await.unwrap();
    client.close().await;

    let client = Client::builder()
        .account_store(store)
        .opts(client_options())
        .build()
        .await;
    assert!(client.restore_accounts().await.unwrap().is_empty());
    client.close().await;
}

#[tokio::test]
async fn test_session_state_follows_newest_contact_list() {
    let client = test_client().await;
    let keys = Keys::generate();
    let a = Keys::generate().public_key();
    let b = Keys::generate().public_key();
    let c = Keys::generate().public_key();

    client.login(keys.clone()).await.unwrap();
    let user = client.current_user().await.unwrap();

    let ev1 = EventBuilder::contact_list([Contact::new(a), Contact::new(b)])
        .custom_created_at(Timestamp::from_secs(1_000))
        .sign_with_keys(&keys)
        .unwrap();
    let ev2 = EventBuilder::contact_list([Contact::new(c)])
        .custom_created_at(Timestamp::from_secs(2_000))
        .sign_with_keys(&keys)
        .unwrap();

    // Deliver out of order
    user.handle_event(&ev2).await;
    user.handle_event(&ev1).await;

    let follows = user.follows().borrow().clone();
    assert_eq!(follows, [c].into_iter().collect::<BTreeSet<_>>());

    client.close().await;
}

#[tokio::test]
async fn test_register_session_kind_applies_to_next_login() {
    let client = test_client().await;
    let keys = Keys::generate();
    let custom = Kind::new(10_015);

    client.register_session_kind(custom).await;
    client.login(keys.clone()).await.unwrap();

    let user = client.current_user().await.unwrap();
    assert!(user.session_kinds().contains(&custom));

    client.close().await;
}

#[tokio::test]
async fn test_subscription_expands_on_relay_list_discovery() {
    let client = test_client().await;
    let author = Keys::generate();

    // Author's relay list is unknown at subscribe time
    let subscription = client
        .subscribe(vec![Filter::new().author(author.public_key())])
        .await
        .unwrap();
    assert!(subscription.active_relays().await.is_empty());

    // The relay list becomes known (e.g. seen on any relay)
    let rx = RelayUrl::parse("wss://rx.example.com").unwrap();
    let relay_list = EventBuilder::relay_list([(rx.clone(), Some(RelayMetadata::Write))])
        .sign_with_keys(&author)
        .unwrap();
    client.tracker().track(&relay_list).await;

    // Within a bounded time the subscription covers the write relay
    let mut attached = false;
    for _ in 0..100 {
        if subscription.active_relays().await.contains(&rx) {
            attached = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(attached, "subscription never expanded to the discovered relay");

    // The REQ is registered on the (temporary) relay for restoration
    let relay = client.pool().relay(&rx).await.unwrap();
    assert_eq!(
        relay.subscription(subscription.id()).await.as_deref(),
        Some(subscription.filters())
    );

    subscription.stop().await;
    client.close().await;
}

#[tokio::test]
async fn test_subscribe_without_authors_uses_connected_set() {
    let client = test_client().await;

    let subscription = client
        .subscribe(vec![Filter::new().kind(Kind::TEXT_NOTE)])
        .await
        .unwrap();

    // Nothing connected: empty set, subscription still usable
    assert!(subscription.active_relays().await.is_empty());
    subscription.stop().await;
    client.close().await;
}

#[tokio::test]
async fn test_account_signer_round_trip_through_store() {
    let store = MemoryAccountStore::new();
    let keys = Keys::generate();

    let client = Client::builder()
        .account_store(store.clone())
        .opts(client_options())
        .build()
        .await;
    client.login(keys.clone()).await.unwrap();

    // The persisted blob is a type-tagged envelope
    let blob = store.load(&keys.public_key()).await.unwrap().unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&blob).unwrap();
    assert_eq!(payload.get("type").and_then(|v| v.as_str()), Some("keys"));

    client.close().await;
}

#[tokio::test]
async fn test_sign_passthrough() {
    let client = test_client().await;
    let keys = Keys::generate();
    client.login(keys.clone()).await.unwrap();

    let user = client.current_user().await.unwrap();
    let unsigned = EventBuilder::text_note("session signed").build(keys.public_key());
    let event = user.sign(unsigned).await.unwrap();
    assert!(event.verify().is_ok());
    assert_eq!(event.pubkey, keys.public_key());

    client.close().await;
}

#[tokio::test]
async fn test_publish_with_no_relays_reports_empty_output() {
    let client = test_client().await;
    let keys = Keys::generate();
    let event = EventBuilder::text_note("into the void")
        .sign_with_keys(&keys)
        .unwrap();

    let output = client.publish(event).await.unwrap();
    assert!(!output.any_success());
    assert!(output.failed.is_empty());

    client.close().await;
}

#[tokio::test]
async fn test_relay_urls_are_normalized_across_client() {
    let client = test_client().await;

    assert!(client.add_relay("WSS://Relay.Example.COM/").await.unwrap());
    assert!(!client.add_relay("wss://relay.example.com").await.unwrap());

    let urls: HashSet<RelayUrl> = client.pool().relay_urls().await.into_iter().collect();
    assert_eq!(urls.len(), 1);
    assert!(urls.contains(&RelayUrl::parse("relay.example.com").unwrap()));

    client.close().await;
}

#[tokio::test]
async fn test_account_signer_from_keys() {
    // `login` accepts anything convertible into an account signer
    let keys = Keys::generate();
    let signer: AccountSigner = keys.clone().into();
    assert_eq!(
        signer.get_public_key().await.unwrap(),
        keys.public_key()
    );
}
