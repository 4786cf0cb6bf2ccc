// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay pool
//!
//! Registry of relay sessions keyed by normalized URL, aggregate
//! connect/disconnect, temporary relays with idle-timeout removal and the
//! pool-level notification stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nostrkit::{Event, EventId, NostrSigner, RelayUrl, TryIntoRelayUrl};
use tokio::sync::{broadcast, RwLock};

mod error;
mod output;

pub use self::error::Error;
pub use self::output::Output;
use crate::relay::{Relay, RelayOptions};
use crate::subscriptions::SubscriptionManager;

/// Pool notification channel capacity
const NOTIFICATION_CHANNEL_SIZE: usize = 4096;

/// Relay pool options
#[derive(Debug, Clone)]
pub struct RelayPoolOptions {
    /// Notification channel capacity
    pub notification_channel_size: usize,
}

impl Default for RelayPoolOptions {
    fn default() -> Self {
        Self {
            notification_channel_size: NOTIFICATION_CHANNEL_SIZE,
        }
    }
}

/// Pool-level notification
#[derive(Debug, Clone)]
pub enum RelayPoolNotification {
    /// Relay added to the pool
    RelayAdded {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Relay removed from the pool
    RelayRemoved {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Relay session established
    RelayConnected {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Relay session lost
    RelayDisconnected {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Relay requires authentication and no signer is configured
    RelayAuthRequired {
        /// Relay url
        relay_url: RelayUrl,
        /// Challenge string
        challenge: String,
    },
    /// Relay accepted our AUTH
    RelayAuthenticated {
        /// Relay url
        relay_url: RelayUrl,
    },
    /// Pool is shutting down
    Shutdown,
}

/// Pool-wide counter totals
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateStats {
    /// Connection attempts
    pub attempts: usize,
    /// Established connections
    pub success: usize,
    /// Observed disconnections
    pub disconnections: usize,
    /// Messages written
    pub messages_sent: usize,
    /// Frames received
    pub messages_received: usize,
    /// Bytes written
    pub bytes_sent: usize,
    /// Bytes received
    pub bytes_received: usize,
    /// Events that passed verification
    pub events_validated: usize,
    /// Events dropped before or failing verification
    pub events_not_validated: usize,
}

#[derive(Debug)]
struct InnerRelayPool {
    relays: RwLock<HashMap<RelayUrl, Relay>>,
    notification_sender: broadcast::Sender<RelayPoolNotification>,
    manager: Arc<SubscriptionManager>,
    signer: RwLock<Option<Arc<dyn NostrSigner>>>,
    shutdown: AtomicBool,
}

/// Relay pool
#[derive(Debug, Clone)]
pub struct RelayPool {
    inner: Arc<InnerRelayPool>,
}

impl RelayPool {
    /// New pool dispatching through the given subscription manager.
    pub fn new(manager: Arc<SubscriptionManager>, opts: RelayPoolOptions) -> Self {
        let (notification_sender, ..) = broadcast::channel(opts.notification_channel_size);

        Self {
            inner: Arc::new(InnerRelayPool {
                relays: RwLock::new(HashMap::new()),
                notification_sender,
                manager,
                signer: RwLock::new(None),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// The shared subscription manager
    #[inline]
    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.inner.manager
    }

    /// Subscribe to pool notifications
    pub fn notifications(&self) -> broadcast::Receiver<RelayPoolNotification> {
        self.inner.notification_sender.subscribe()
    }

    fn check_shutdown(&self) -> Result<(), Error> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }
        Ok(())
    }

    /// Set (or clear) the signer used for NIP-42 AUTH on every relay,
    /// current and future.
    pub async fn set_signer(&self, signer: Option<Arc<dyn NostrSigner>>) {
        {
            let mut slot = self.inner.signer.write().await;
            slot.clone_from(&signer);
        }

        let relays = self.inner.relays.read().await;
        for relay in relays.values() {
            relay.set_signer(signer.clone()).await;
        }
    }

    /// Create-or-get a relay. Returns `true` if the relay was added.
    pub async fn add_relay<U>(&self, url: U, opts: RelayOptions) -> Result<bool, Error>
    where
        U: TryIntoRelayUrl,
    {
        self.check_shutdown()?;

        let url: RelayUrl = url.try_into_relay_url()?;

        let mut relays = self.inner.relays.write().await;
        if relays.contains_key(&url) {
            return Ok(false);
        }

        let relay = Relay::new(url.clone(), opts);
        relay.set_notification_sender(self.inner.notification_sender.clone());
        relay.set_subscription_manager(Arc::clone(&self.inner.manager));

        let signer = self.inner.signer.read().await.clone();
        if signer.is_some() {
            relay.set_signer(signer).await;
        }

        relays.insert(url.clone(), relay);
        drop(relays);

        let _ = self
            .inner
            .notification_sender
            .send(RelayPoolNotification::RelayAdded { relay_url: url });

        Ok(true)
    }

    /// Add a temporary relay: no reconnection, removed unconditionally
    /// after `idle_timeout`.
    ///
    /// Used to reach author write-relays that are not pool members. If a
    /// relay with this URL is already present it is returned untouched.
    pub async fn add_temporary_relay<U>(
        &self,
        url: U,
        idle_timeout: Duration,
    ) -> Result<Relay, Error>
    where
        U: TryIntoRelayUrl,
    {
        let url: RelayUrl = url.try_into_relay_url()?;

        if let Some(relay) = self.relay(&url).await {
            return Ok(relay);
        }

        self.add_relay(url.clone(), RelayOptions::default().reconnect(false))
            .await?;
        let relay: Relay = self.relay(&url).await.ok_or(Error::RelayNotFound)?;
        relay.connect(None).await;

        let pool = self.clone();
        let expired_url = url.clone();
        tokio::spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            if let Err(e) = pool.remove_relay(&expired_url).await {
                tracing::debug!(relay = %expired_url, error = %e, "Temporary relay already gone.");
            }
        });

        Ok(relay)
    }

    /// Remove a relay: detach subscriptions, terminate the session.
    pub async fn remove_relay<U>(&self, url: U) -> Result<(), Error>
    where
        U: TryIntoRelayUrl,
    {
        let url: RelayUrl = url.try_into_relay_url()?;

        let relay: Relay = {
            let mut relays = self.inner.relays.write().await;
            relays.remove(&url).ok_or(Error::RelayNotFound)?
        };

        self.inner.manager.detach_relay(&url).await;
        relay.disconnect()?;

        let _ = self
            .inner
            .notification_sender
            .send(RelayPoolNotification::RelayRemoved { relay_url: url });

        Ok(())
    }

    /// Get a relay by url
    pub async fn relay<U>(&self, url: U) -> Option<Relay>
    where
        U: TryIntoRelayUrl,
    {
        let url: RelayUrl = url.try_into_relay_url().ok()?;
        let relays = self.inner.relays.read().await;
        relays.get(&url).cloned()
    }

    /// All relays
    pub async fn relays(&self) -> HashMap<RelayUrl, Relay> {
        self.inner.relays.read().await.clone()
    }

    /// Urls of all relays
    pub async fn relay_urls(&self) -> Vec<RelayUrl> {
        self.inner.relays.read().await.keys().cloned().collect()
    }

    /// Relays with an established session
    pub async fn connected_relays(&self) -> Vec<Relay> {
        let relays = self.inner.relays.read().await;
        relays.values().filter(|r| r.is_connected()).cloned().collect()
    }

    /// Urls of connected relays
    pub async fn connected_relay_urls(&self) -> Vec<RelayUrl> {
        let relays = self.inner.relays.read().await;
        relays
            .iter()
            .filter(|(_, r)| r.is_connected())
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Launch connection attempts on every member in parallel.
    ///
    /// With a timeout, returns `true` as soon as at least one relay is
    /// connected and `false` when the timeout elapses first.
    pub async fn connect(&self, timeout: Option<Duration>) -> bool {
        // Subscribe before spawning to not miss the first transition
        let mut notifications = self.notifications();

        let relays = self.relays().await;
        for relay in relays.values() {
            relay.connect(None).await;
        }

        match timeout {
            None => true,
            Some(timeout) => {
                if relays.values().any(|r| r.is_connected()) {
                    return true;
                }

                tokio::time::timeout(timeout, async {
                    while let Ok(notification) = notifications.recv().await {
                        if let RelayPoolNotification::RelayConnected { .. } = notification {
                            return true;
                        }
                    }
                    false
                })
                .await
                .unwrap_or(false)
            }
        }
    }

    /// Connect a single relay
    pub async fn connect_relay<U>(&self, url: U, timeout: Option<Duration>) -> Result<(), Error>
    where
        U: TryIntoRelayUrl,
    {
        let url: RelayUrl = url.try_into_relay_url()?;
        let relay: Relay = self.relay(&url).await.ok_or(Error::RelayNotFound)?;
        relay.connect(timeout).await;
        Ok(())
    }

    /// Transport-send an event to every connected relay.
    pub async fn send_event(&self, event: Event) -> Result<Output<EventId>, Error> {
        self.check_shutdown()?;
        let urls: Vec<RelayUrl> = self.connected_relay_urls().await;
        self.send_event_to(urls, event).await
    }

    /// Transport-send an event to specific relays.
    pub async fn send_event_to<I, U>(&self, urls: I, event: Event) -> Result<Output<EventId>, Error>
    where
        I: IntoIterator<Item = U>,
        U: TryIntoRelayUrl,
    {
        self.check_shutdown()?;

        // Write-through before the network, like any dispatched event
        if let Some(cache) = self.inner.manager.cache() {
            let cache = Arc::clone(cache);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = cache.store(&event).await {
                    tracing::warn!(error = %e, "Cache store failed.");
                }
            });
        }

        let mut output: Output<EventId> = Output::new(event.id);

        let relays = self.inner.relays.read().await;
        for url in urls.into_iter() {
            let url: RelayUrl = url.try_into_relay_url()?;
            match relays.get(&url) {
                Some(relay) => match relay.send_event(event.clone()) {
                    Ok(..) => {
                        output.success.insert(url);
                    }
                    Err(e) => {
                        tracing::error!("Impossible to send event to '{url}': {e}");
                        output.failed.insert(url, e.to_string());
                    }
                },
                None => {
                    output
                        .failed
                        .insert(url, Error::RelayNotFound.to_string());
                }
            }
        }

        Ok(output)
    }

    /// Aggregate the per-relay counters over the whole pool.
    pub async fn aggregate_stats(&self) -> AggregateStats {
        let relays = self.inner.relays.read().await;

        let mut stats = AggregateStats::default();
        for relay in relays.values() {
            let s = relay.stats();
            stats.attempts += s.attempts();
            stats.success += s.success();
            stats.disconnections += s.disconnections();
            stats.messages_sent += s.messages_sent();
            stats.messages_received += s.messages_received();
            stats.bytes_sent += s.bytes_sent();
            stats.bytes_received += s.bytes_received();
            stats.events_validated += s.events_validated();
            stats.events_not_validated += s.events_not_validated();
        }

        stats
    }

    /// Terminate every relay and drop the registry.
    pub async fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);

        let relays: Vec<Relay> = {
            let mut relays = self.inner.relays.write().await;
            relays.drain().map(|(_, r)| r).collect()
        };

        for relay in relays.into_iter() {
            if let Err(e) = relay.disconnect() {
                tracing::error!(relay = %relay.url(), error = %e, "Impossible to disconnect.");
            }
        }

        let _ = self
            .inner
            .notification_sender
            .send(RelayPoolNotification::Shutdown);

        tracing::info!("Relay pool shutdown");
    }
}
