// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay-list tracker

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use nostrkit::nips::nip65::RelayList;
use nostrkit::{Event, Kind, PublicKey, RelayUrl, Timestamp};
use tokio::sync::{broadcast, RwLock};

/// A cached relay list older than this is considered outdated.
const RELAY_LIST_OUTDATED_AFTER: Duration = Duration::from_secs(60 * 60);
/// Discovery channel capacity
const DISCOVERY_CHANNEL_SIZE: usize = 1024;

#[derive(Debug, Clone)]
struct RelayListEntry {
    list: RelayList,
    /// `created_at` of the tracked event
    event_created_at: Timestamp,
    /// When this entry was last written
    last_update: Timestamp,
}

#[derive(Debug)]
struct InnerOutboxTracker {
    public_keys: RwLock<HashMap<PublicKey, RelayListEntry>>,
    discovery_sender: broadcast::Sender<(PublicKey, RelayList)>,
}

/// In-memory cache of `pubkey → relay list`, newest-wins, with a
/// broadcast stream notifying every fresh discovery.
#[derive(Debug, Clone)]
pub struct OutboxTracker {
    inner: Arc<InnerOutboxTracker>,
}

impl Default for OutboxTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboxTracker {
    /// New empty tracker
    pub fn new() -> Self {
        let (discovery_sender, ..) = broadcast::channel(DISCOVERY_CHANNEL_SIZE);

        Self {
            inner: Arc::new(InnerOutboxTracker {
                public_keys: RwLock::new(HashMap::new()),
                discovery_sender,
            }),
        }
    }

    /// Stream of `(pubkey, relay list)` emitted whenever a newer relay
    /// list is tracked.
    pub fn on_relay_list_discovered(&self) -> broadcast::Receiver<(PublicKey, RelayList)> {
        self.inner.discovery_sender.subscribe()
    }

    /// Track a kind-10002 event. Overwrites the cached list only when the
    /// event is strictly newer. Returns `true` if the cache changed.
    pub async fn track(&self, event: &Event) -> bool {
        if event.kind != Kind::RELAY_LIST {
            return false;
        }

        self.track_list(
            event.pubkey,
            RelayList::from_event(event),
            event.created_at,
        )
        .await
    }

    /// Track a relay list observed at `created_at` for `public_key`
    /// (used for the kind-10002 path and the legacy kind-3 fallback
    /// alike).
    pub async fn track_list(
        &self,
        public_key: PublicKey,
        list: RelayList,
        created_at: Timestamp,
    ) -> bool {
        let tracked: bool = {
            let mut public_keys = self.inner.public_keys.write().await;
            match public_keys.get_mut(&public_key) {
                Some(entry) => {
                    if created_at > entry.event_created_at {
                        *entry = RelayListEntry {
                            list: list.clone(),
                            event_created_at: created_at,
                            last_update: Timestamp::now(),
                        };
                        true
                    } else {
                        false
                    }
                }
                None => {
                    public_keys.insert(
                        public_key,
                        RelayListEntry {
                            list: list.clone(),
                            event_created_at: created_at,
                            last_update: Timestamp::now(),
                        },
                    );
                    true
                }
            }
        };

        if tracked {
            tracing::debug!(pubkey = %public_key, relays = list.map.len(), "Relay list tracked.");
            let _ = self.inner.discovery_sender.send((public_key, list));
        }

        tracked
    }

    /// Cache-only lookup, non-blocking on the network.
    pub async fn get(&self, public_key: &PublicKey) -> Option<RelayList> {
        let public_keys = self.inner.public_keys.read().await;
        public_keys.get(public_key).map(|e| e.list.clone())
    }

    /// Write-relays of an author, if the relay list is cached.
    pub async fn write_relays(&self, public_key: &PublicKey) -> Option<Vec<RelayUrl>> {
        let public_keys = self.inner.public_keys.read().await;
        public_keys.get(public_key).map(|e| e.list.write_relays())
    }

    /// Snapshot of the write-relays of many authors (missing authors are
    /// absent from the returned map).
    pub async fn write_relays_of<'a, I>(
        &self,
        public_keys: I,
    ) -> HashMap<PublicKey, Vec<RelayUrl>>
    where
        I: IntoIterator<Item = &'a PublicKey>,
    {
        let map = self.inner.public_keys.read().await;
        public_keys
            .into_iter()
            .filter_map(|pk| map.get(pk).map(|e| (*pk, e.list.write_relays())))
            .collect()
    }

    /// Authors whose relay list is missing, empty or stale.
    pub async fn check_outdated<I>(&self, public_keys: I) -> HashSet<PublicKey>
    where
        I: IntoIterator<Item = PublicKey>,
    {
        let map = self.inner.public_keys.read().await;
        let now: Timestamp = Timestamp::now();

        let mut outdated: HashSet<PublicKey> = HashSet::new();
        for public_key in public_keys.into_iter() {
            match map.get(&public_key) {
                Some(entry) => {
                    let empty: bool = entry.list.is_empty();
                    let expired: bool = entry.last_update + RELAY_LIST_OUTDATED_AFTER < now;
                    if empty || expired {
                        outdated.insert(public_key);
                    }
                }
                None => {
                    outdated.insert(public_key);
                }
            }
        }

        outdated
    }
}

#[cfg(test)]
mod tests {
    use nostrkit::nips::nip65::RelayMetadata;
    use nostrkit::{EventBuilder, Keys};

    use super::*;

    fn relay_list_event(keys: &Keys, urls: &[&str], created_at: u64) -> Event {
        EventBuilder::relay_list(
            urls.iter()
                .map(|u| (RelayUrl::parse(u).unwrap(), Some(RelayMetadata::Write))),
        )
        .custom_created_at(Timestamp::from_secs(created_at))
        .sign_with_keys(keys)
        .unwrap()
    }

    #[tokio::test]
    async fn test_track_and_get() {
        let tracker = OutboxTracker::new();
        let keys = Keys::generate();

        let event = relay_list_event(&keys, &["wss://r1.example.com"], 1_000);
        assert!(tracker.track(&event).await);

        let list = tracker.get(&keys.public_key()).await.unwrap();
        assert_eq!(list.map.len(), 1);
        assert_eq!(
            tracker.write_relays(&keys.public_key()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_newest_wins_in_any_order() {
        let keys = Keys::generate();
        let newer = relay_list_event(&keys, &["wss://new.example.com"], 2_000);
        let older = relay_list_event(&keys, &["wss://old.example.com"], 1_000);

        for events in [[&newer, &older], [&older, &newer]] {
            let tracker = OutboxTracker::new();
            for event in events {
                tracker.track(event).await;
            }

            let urls = tracker.write_relays(&keys.public_key()).await.unwrap();
            assert_eq!(urls, vec![RelayUrl::parse("wss://new.example.com").unwrap()]);
        }
    }

    #[tokio::test]
    async fn test_equal_timestamp_not_overwritten() {
        let tracker = OutboxTracker::new();
        let keys = Keys::generate();

        let a = relay_list_event(&keys, &["wss://a.example.com"], 1_000);
        let b = relay_list_event(&keys, &["wss://b.example.com"], 1_000);

        assert!(tracker.track(&a).await);
        assert!(!tracker.track(&b).await);
        let urls = tracker.write_relays(&keys.public_key()).await.unwrap();
        assert_eq!(urls, vec![RelayUrl::parse("wss://a.example.com").unwrap()]);
    }

    #[tokio::test]
    async fn test_non_relay_list_ignored() {
        let tracker = OutboxTracker::new();
        let keys = Keys::generate();
        let note = EventBuilder::text_note("not a relay list")
            .sign_with_keys(&keys)
            .unwrap();

        assert!(!tracker.track(&note).await);
        assert!(tracker.get(&keys.public_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_discovery_broadcast() {
        let tracker = OutboxTracker::new();
        let keys = Keys::generate();
        let mut discoveries = tracker.on_relay_list_discovered();

        let event = relay_list_event(&keys, &["wss://r1.example.com"], 1_000);
        tracker.track(&event).await;

        let (pk, list) = discoveries.recv().await.unwrap();
        assert_eq!(pk, keys.public_key());
        assert_eq!(list.map.len(), 1);

        // An older event emits nothing
        let stale = relay_list_event(&keys, &["wss://stale.example.com"], 500);
        tracker.track(&stale).await;
        assert!(discoveries.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_check_outdated() {
        let tracker = OutboxTracker::new();
        let known = Keys::generate();
        let unknown = Keys::generate();

        let event = relay_list_event(&known, &["wss://r1.example.com"], 1_000);
        tracker.track(&event).await;

        let outdated = tracker
            .check_outdated([known.public_key(), unknown.public_key()])
            .await;
        assert!(!outdated.contains(&known.public_key()));
        assert!(outdated.contains(&unknown.public_key()));
    }
}
