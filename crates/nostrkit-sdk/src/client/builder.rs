// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Client builder

use std::sync::Arc;

use nostrkit_outbox::OutboxTracker;
use nostrkit_relay_pool::{
    CacheAdapter, RelayOptions, RelayPool, RelayPoolOptions, SubscriptionManager,
    SubscriptionManagerOptions,
};

use super::options::Options;
use super::Client;
use crate::store::AccountStore;

/// Client builder
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    cache: Option<Arc<dyn CacheAdapter>>,
    store: Option<Arc<dyn AccountStore>>,
    opts: Options,
}

impl ClientBuilder {
    /// New builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cache adapter (write-through + cache-first subscribe)
    pub fn cache<C>(mut self, cache: C) -> Self
    where
        C: CacheAdapter + 'static,
    {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Attach an account store (signer persistence across restarts)
    pub fn account_store<S>(mut self, store: S) -> Self
    where
        S: AccountStore + 'static,
    {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set options
    pub fn opts(mut self, opts: Options) -> Self {
        self.opts = opts;
        self
    }

    /// Build the client: both pools share one subscription manager, the
    /// discovery pool is seeded with the configured discovery relays and
    /// the relay-list observer starts immediately.
    pub async fn build(self) -> Client {
        let manager = Arc::new(SubscriptionManager::with_cache(
            self.cache,
            SubscriptionManagerOptions {
                verify_events: self.opts.verify_events,
                ..Default::default()
            },
        ));

        let pool = RelayPool::new(Arc::clone(&manager), RelayPoolOptions::default());
        let discovery_pool = RelayPool::new(Arc::clone(&manager), RelayPoolOptions::default());

        for url in self.opts.discovery_relays.iter() {
            if let Err(e) = discovery_pool.add_relay(url, RelayOptions::default()).await {
                tracing::warn!(relay = %url, error = %e, "Impossible to add discovery relay.");
            }
        }

        let client = Client::from_parts(
            pool,
            discovery_pool,
            manager,
            OutboxTracker::new(),
            self.store,
            self.opts,
        );

        client.spawn_relay_list_observer().await;

        client
    }
}
