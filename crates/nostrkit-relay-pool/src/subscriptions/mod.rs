// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Subscription manager
//!
//! The single dispatch point between relay sessions and in-process
//! subscribers: every inbound `EVENT` frame goes through
//! [`SubscriptionManager::dispatch_event`], which deduplicates once,
//! writes through to the cache, feeds the pool-wide stream and fans out
//! to every matching subscription.

use core::fmt;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use nostrkit::{Event, EventId, Filter, RelayUrl, SubscriptionId, Timestamp};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::cache::CacheAdapter;
use crate::relay::Relay;

/// Dedup LRU capacity
const DEDUP_CACHE_SIZE: usize = 10_000;
/// Per-subscription consumer buffer
const SUBSCRIPTION_BUFFER_SIZE: usize = 1024;
/// Pool-wide event stream capacity (lossy for slow consumers)
const EVENTS_CHANNEL_SIZE: usize = 4096;

/// Where a delivered event came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// Received from a relay
    Relay(RelayUrl),
    /// Pre-populated from the local cache
    Cache,
}

/// Item delivered to a subscription consumer
#[derive(Debug, Clone)]
pub enum SubscriptionNotification {
    /// Matching event
    Event {
        /// Source
        source: EventSource,
        /// Event
        event: Box<Event>,
    },
    /// A relay delivered all its stored events for this subscription
    EndOfStoredEvents {
        /// Relay
        relay_url: RelayUrl,
    },
}

/// Outcome of dispatching one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// First sight: recorded and fanned out
    Dispatched,
    /// Already seen, dropped
    Duplicate,
    /// Signature verification failed, dropped
    InvalidSignature,
}

/// Subscription manager options
#[derive(Debug, Clone)]
pub struct SubscriptionManagerOptions {
    /// Verify event signatures on dispatch
    pub verify_events: bool,
    /// Dedup LRU capacity
    pub dedup_capacity: usize,
}

impl Default for SubscriptionManagerOptions {
    fn default() -> Self {
        Self {
            verify_events: true,
            dedup_capacity: DEDUP_CACHE_SIZE,
        }
    }
}

struct SubscriptionEntry {
    filters: Vec<Filter>,
    relays: HashMap<RelayUrl, Relay>,
    tx: mpsc::Sender<SubscriptionNotification>,
    /// Ids already delivered to this subscription
    seen: HashSet<EventId>,
    /// Listener tasks (e.g. outbox discovery) cancelled on stop
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for SubscriptionEntry {
    fn drop(&mut self) {
        for task in self.tasks.iter() {
            task.abort();
        }
    }
}

/// Single process-wide dispatch registry
pub struct SubscriptionManager {
    subscriptions: RwLock<HashMap<SubscriptionId, SubscriptionEntry>>,
    dedup: Mutex<LruCache<EventId, Timestamp>>,
    events_sender: broadcast::Sender<(RelayUrl, Event)>,
    cache: Option<Arc<dyn CacheAdapter>>,
    opts: SubscriptionManagerOptions,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("opts", &self.opts)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    /// New manager without cache
    pub fn new(opts: SubscriptionManagerOptions) -> Self {
        Self::with_cache(None, opts)
    }

    /// New manager with an optional cache adapter
    pub fn with_cache(
        cache: Option<Arc<dyn CacheAdapter>>,
        opts: SubscriptionManagerOptions,
    ) -> Self {
        let (events_sender, ..) = broadcast::channel(EVENTS_CHANNEL_SIZE);
        let capacity: NonZeroUsize =
            NonZeroUsize::new(opts.dedup_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            subscriptions: RwLock::new(HashMap::new()),
            dedup: Mutex::new(LruCache::new(capacity)),
            events_sender,
            cache,
            opts,
        }
    }

    /// Cache adapter, if configured
    pub fn cache(&self) -> Option<&Arc<dyn CacheAdapter>> {
        self.cache.as_ref()
    }

    /// Pool-wide `(relay, event)` stream.
    ///
    /// Lossy: slow consumers miss items. Telemetry, not correctness.
    pub fn events(&self) -> broadcast::Receiver<(RelayUrl, Event)> {
        self.events_sender.subscribe()
    }

    /// Register a new subscription and hand out its consumer handle.
    ///
    /// The handle is cold until relays are attached with
    /// [`attach_relay`](Self::attach_relay).
    pub async fn subscribe(self: &Arc<Self>, filters: Vec<Filter>) -> Subscription {
        let id: SubscriptionId = SubscriptionId::generate();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER_SIZE);

        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(
            id.clone(),
            SubscriptionEntry {
                filters: filters.clone(),
                relays: HashMap::new(),
                tx,
                seen: HashSet::new(),
                tasks: Vec::new(),
            },
        );

        Subscription {
            id,
            filters,
            rx,
            manager: Arc::clone(self),
        }
    }

    /// Attach a relay to a subscription: registers the `REQ` on the relay
    /// and remembers the relay for `CLOSE` on stop.
    ///
    /// Idempotent: attaching the same relay twice (e.g. from concurrent
    /// outbox discoveries) sends nothing the second time.
    pub async fn attach_relay(
        &self,
        id: &SubscriptionId,
        relay: Relay,
    ) -> Result<bool, crate::relay::Error> {
        let mut subscriptions = self.subscriptions.write().await;

        let entry: &mut SubscriptionEntry = match subscriptions.get_mut(id) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        if entry.relays.contains_key(relay.url()) {
            return Ok(false);
        }

        relay
            .subscribe_with_id(id.clone(), entry.filters.clone())
            .await?;
        entry.relays.insert(relay.url().clone(), relay);

        Ok(true)
    }

    /// Tie a listener task to a subscription's lifetime: the task is
    /// aborted when the subscription stops.
    pub async fn register_task(&self, id: &SubscriptionId, task: JoinHandle<()>) {
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get_mut(id) {
            Some(entry) => entry.tasks.push(task),
            // Subscription already gone: nothing to listen for
            None => task.abort(),
        }
    }

    /// Detach a removed relay from every subscription (no `CLOSE`: the
    /// relay is gone).
    pub async fn detach_relay(&self, url: &RelayUrl) {
        let mut subscriptions = self.subscriptions.write().await;
        for entry in subscriptions.values_mut() {
            entry.relays.remove(url);
        }
    }

    /// Remove the subscription and best-effort `CLOSE` it everywhere.
    pub async fn unsubscribe(&self, id: &SubscriptionId) {
        let entry: Option<SubscriptionEntry> = {
            let mut subscriptions = self.subscriptions.write().await;
            subscriptions.remove(id)
        };

        if let Some(entry) = entry {
            for relay in entry.relays.values() {
                if let Err(e) = relay.unsubscribe(id).await {
                    tracing::debug!(
                        subscription = %id,
                        relay = %relay.url(),
                        error = %e,
                        "CLOSE not sent."
                    );
                }
            }
        }
    }

    /// Relays currently attached to a subscription
    pub async fn subscription_relays(&self, id: &SubscriptionId) -> Vec<RelayUrl> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions
            .get(id)
            .map(|e| e.relays.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Filters of a subscription
    pub async fn subscription_filters(&self, id: &SubscriptionId) -> Option<Vec<Filter>> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions.get(id).map(|e| e.filters.clone())
    }

    /// Ids of all registered subscriptions
    pub async fn subscription_ids(&self) -> Vec<SubscriptionId> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions.keys().cloned().collect()
    }

    /// Pre-populate a subscription with cached events.
    ///
    /// The events are marked as delivered for this subscription only; the
    /// global dedup LRU is untouched so live copies still reach other
    /// subscribers.
    pub async fn feed_cached(&self, id: &SubscriptionId, events: Vec<Event>) {
        let mut subscriptions = self.subscriptions.write().await;
        let entry: &mut SubscriptionEntry = match subscriptions.get_mut(id) {
            Some(entry) => entry,
            None => return,
        };

        for event in events.into_iter() {
            if entry.filters.iter().any(|f| f.match_event(&event)) && entry.seen.insert(event.id) {
                let _ = entry.tx.try_send(SubscriptionNotification::Event {
                    source: EventSource::Cache,
                    event: Box::new(event),
                });
            }
        }
    }

    /// Single entry point for every inbound `EVENT` frame.
    pub async fn dispatch_event(
        &self,
        relay_url: &RelayUrl,
        _subscription_id: &SubscriptionId,
        event: Event,
    ) -> DispatchOutcome {
        // Verify before matching, so spoofed events never reach
        // application filters.
        if self.opts.verify_events && event.verify().is_err() {
            tracing::warn!(relay = %relay_url, id = %event.id, "Event signature invalid.");
            return DispatchOutcome::InvalidSignature;
        }

        // Dedup by id; `put` refreshes recency for access-order eviction
        {
            let mut dedup = self.dedup.lock().await;
            if dedup.put(event.id, Timestamp::now()).is_some() {
                return DispatchOutcome::Duplicate;
            }
        }

        // Cache write-through must never block dispatch
        if let Some(cache) = &self.cache {
            let cache: Arc<dyn CacheAdapter> = Arc::clone(cache);
            let event: Event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = cache.store(&event).await {
                    tracing::warn!(error = %e, "Cache store failed.");
                }
            });
        }

        // Pool-wide stream
        let _ = self.events_sender.send((relay_url.clone(), event.clone()));

        // Per-subscription fan-out
        let mut subscriptions = self.subscriptions.write().await;
        for (id, entry) in subscriptions.iter_mut() {
            let matches: bool = entry.filters.iter().any(|f| f.match_event(&event));
            if matches && entry.seen.insert(event.id) {
                let notification = SubscriptionNotification::Event {
                    source: EventSource::Relay(relay_url.clone()),
                    event: Box::new(event.clone()),
                };
                if entry.tx.try_send(notification).is_err() {
                    tracing::warn!(
                        subscription = %id,
                        "Subscription buffer full, dropping event."
                    );
                }
            }
        }

        DispatchOutcome::Dispatched
    }

    /// Signal that a relay delivered all stored events for a subscription.
    pub async fn dispatch_eose(&self, relay_url: &RelayUrl, subscription_id: &SubscriptionId) {
        let subscriptions = self.subscriptions.read().await;
        if let Some(entry) = subscriptions.get(subscription_id) {
            let _ = entry.tx.try_send(SubscriptionNotification::EndOfStoredEvents {
                relay_url: relay_url.clone(),
            });
        }
    }
}

/// Subscription consumer handle
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    filters: Vec<Filter>,
    rx: mpsc::Receiver<SubscriptionNotification>,
    manager: Arc<SubscriptionManager>,
}

impl Subscription {
    /// Subscription id
    #[inline]
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Filters
    #[inline]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Receive the next notification.
    ///
    /// Returns `None` after [`stop`](Self::stop) from another handle or
    /// manager shutdown.
    pub async fn recv(&mut self) -> Option<SubscriptionNotification> {
        self.rx.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<SubscriptionNotification> {
        self.rx.try_recv().ok()
    }

    /// Relays this subscription is currently attached to.
    ///
    /// The set can grow during the subscription's lifetime as outbox
    /// discoveries arrive.
    pub async fn active_relays(&self) -> Vec<RelayUrl> {
        self.manager.subscription_relays(&self.id).await
    }

    /// Stop: cancel listeners, best-effort `CLOSE` everywhere, remove
    /// from the registry.
    pub async fn stop(self) {
        self.manager.unsubscribe(&self.id).await;
    }
}
