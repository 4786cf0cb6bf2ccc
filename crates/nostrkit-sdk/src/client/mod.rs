// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Client
//!
//! The top-level coordinator: owns the main and discovery pools (sharing
//! one subscription manager), the outbox tracker, the account set and the
//! account store. Subscriptions are routed by the outbox model and grow
//! dynamically as relay lists are discovered.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use nostrkit::nips::nip02;
use nostrkit::nips::nip65::RelayList;
use nostrkit::{
    Event, EventId, Filter, IntoNostrSigner, Kind, NostrSigner, PublicKey, RelayUrl,
    SubscriptionId, TryIntoRelayUrl,
};
use nostrkit_outbox::{select_relays, OutboxTracker, RelaySelection};
use nostrkit_relay_pool::{
    Output, Relay, RelayOptions, RelayPool, RelayPoolNotification, Subscription,
    SubscriptionManager, SubscriptionNotification,
};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

mod builder;
mod error;
mod options;

pub use self::builder::ClientBuilder;
pub use self::error::Error;
pub use self::options::Options;
use crate::session::{CurrentUser, SessionHandle};
use crate::signer::{AccountSigner, DeferredSigner, SignerPayload};
use crate::store::{AccountStore, StoreError};

/// Outcome of a login
#[derive(Debug)]
pub struct Login {
    /// The now-active identity
    pub public_key: PublicKey,
    /// Set when the session is live but persisting the signer failed
    pub persist_error: Option<StoreError>,
}

#[derive(Debug)]
struct InnerClient {
    pool: RelayPool,
    discovery_pool: RelayPool,
    manager: Arc<SubscriptionManager>,
    tracker: OutboxTracker,
    accounts: RwLock<HashMap<PublicKey, CurrentUser>>,
    active: watch::Sender<Option<PublicKey>>,
    extra_kinds: RwLock<BTreeSet<Kind>>,
    store: Option<Arc<dyn AccountStore>>,
    opts: Options,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Top-level coordinator
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<InnerClient>,
}

impl Client {
    /// New builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        pool: RelayPool,
        discovery_pool: RelayPool,
        manager: Arc<SubscriptionManager>,
        tracker: OutboxTracker,
        store: Option<Arc<dyn AccountStore>>,
        opts: Options,
    ) -> Self {
        Self {
            inner: Arc::new(InnerClient {
                pool,
                discovery_pool,
                manager,
                tracker,
                accounts: RwLock::new(HashMap::new()),
                active: watch::channel(None).0,
                extra_kinds: RwLock::new(BTreeSet::new()),
                store,
                opts,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Main relay pool
    #[inline]
    pub fn pool(&self) -> &RelayPool {
        &self.inner.pool
    }

    /// Outbox discovery pool
    #[inline]
    pub fn discovery_pool(&self) -> &RelayPool {
        &self.inner.discovery_pool
    }

    /// Subscription manager shared by both pools
    #[inline]
    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.inner.manager
    }

    /// Outbox tracker
    #[inline]
    pub fn tracker(&self) -> &OutboxTracker {
        &self.inner.tracker
    }

    /// Every observed kind-10002 event keeps the outbox tracker current.
    pub(crate) async fn spawn_relay_list_observer(&self) {
        let mut events = self.inner.manager.events();
        let tracker = self.inner.tracker.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok((_, event)) => {
                        if event.kind == Kind::RELAY_LIST {
                            tracker.track(&event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(missed = n, "Relay list observer lagged.");
                    }
                }
            }
        });

        let mut tasks = self.inner.tasks.lock().await;
        tasks.push(task);
    }

    /// Add a relay to the main pool
    pub async fn add_relay<U>(&self, url: U) -> Result<bool, Error>
    where
        U: TryIntoRelayUrl,
    {
        Ok(self
            .inner
            .pool
            .add_relay(url, RelayOptions::default())
            .await?)
    }

    /// Remove a relay from the main pool
    pub async fn remove_relay<U>(&self, url: U) -> Result<(), Error>
    where
        U: TryIntoRelayUrl,
    {
        Ok(self.inner.pool.remove_relay(url).await?)
    }

    /// Connect both pools; resolves as soon as any relay in either pool
    /// is connected, or when the timeout elapses.
    pub async fn connect(&self, timeout: Duration) -> bool {
        let main = self.inner.pool.connect(Some(timeout));
        let discovery = self.inner.discovery_pool.connect(Some(timeout));
        tokio::pin!(main, discovery);

        tokio::select! {
            reached = &mut main => {
                if reached { true } else { discovery.await }
            }
            reached = &mut discovery => {
                if reached { true } else { main.await }
            }
        }
    }

    /// Subscribe with outbox routing.
    ///
    /// Non-blocking on the network: the relay set is computed over the
    /// tracker cache; missing relay lists are fetched by a detached task
    /// and the subscription expands as discoveries arrive.
    pub async fn subscribe(&self, filters: Vec<Filter>) -> Result<Subscription, Error> {
        let subscription: Subscription = self.inner.manager.subscribe(filters.clone()).await;
        let id: SubscriptionId = subscription.id().clone();

        // Cache-first, before any relay answers
        if let Some(cache) = self.inner.manager.cache() {
            match cache.query(&filters).await {
                Ok(events) => self.inner.manager.feed_cached(&id, events).await,
                Err(e) => tracing::warn!(error = %e, "Cache query failed."),
            }
        }

        let connected: HashSet<RelayUrl> = self
            .inner
            .pool
            .connected_relay_urls()
            .await
            .into_iter()
            .collect();

        let selection: RelaySelection = if self.inner.opts.outbox {
            select_relays(
                &self.inner.tracker,
                &filters,
                &connected,
                self.inner.opts.relay_goal_per_author,
            )
            .await
        } else {
            RelaySelection {
                relays: connected,
                uncovered: HashSet::new(),
            }
        };

        for url in selection.relays.into_iter() {
            if let Err(e) = self.attach_url(&id, url.clone()).await {
                tracing::warn!(relay = %url, error = %e, "Impossible to attach relay.");
            }
        }

        if self.inner.opts.outbox {
            let authors: BTreeSet<PublicKey> = filters
                .iter()
                .filter_map(|f| f.authors.as_ref())
                .flatten()
                .copied()
                .collect();

            if !authors.is_empty() {
                // Grow the relay set as relay lists become known
                let listener = self.spawn_discovery_listener(id.clone(), authors);
                self.inner.manager.register_task(&id, listener).await;
            }

            if !selection.uncovered.is_empty() {
                // Lazy discovery for authors with unknown relay lists
                let client = self.clone();
                let uncovered = selection.uncovered;
                let fetcher = tokio::spawn(async move {
                    for public_key in uncovered.into_iter() {
                        client.fetch_relay_list(public_key).await;
                    }
                });
                self.inner.manager.register_task(&id, fetcher).await;
            }
        }

        Ok(subscription)
    }

    /// Attach the relay behind `url`, adding it as a temporary pool
    /// member when it isn't one yet.
    async fn attach_url(&self, id: &SubscriptionId, url: RelayUrl) -> Result<(), Error> {
        let relay: Relay = match self.inner.pool.relay(&url).await {
            Some(relay) => relay,
            None => {
                self.inner
                    .pool
                    .add_temporary_relay(&url, self.inner.opts.temporary_relay_idle_timeout)
                    .await?
            }
        };

        self.inner.manager.attach_relay(id, relay).await?;
        Ok(())
    }

    fn spawn_discovery_listener(
        &self,
        id: SubscriptionId,
        authors: BTreeSet<PublicKey>,
    ) -> JoinHandle<()> {
        let client = self.clone();
        let mut discoveries = self.inner.tracker.on_relay_list_discovered();
        let goal: usize = self.inner.opts.relay_goal_per_author;

        tokio::spawn(async move {
            loop {
                let (public_key, list): (PublicKey, RelayList) = match discoveries.recv().await {
                    Ok(discovery) => discovery,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(..)) => continue,
                };

                if !authors.contains(&public_key) {
                    continue;
                }

                if client
                    .inner
                    .manager
                    .subscription_filters(&id)
                    .await
                    .is_none()
                {
                    break;
                }

                for url in list.write_relays().into_iter().take(goal) {
                    if let Err(e) = client.attach_url(&id, url.clone()).await {
                        tracing::debug!(relay = %url, error = %e, "Discovery attach failed.");
                    }
                }
            }
        })
    }

    /// Publish to every connected relay of the main pool.
    ///
    /// Per-relay outcomes are independent; zero successes is not itself
    /// an error.
    pub async fn publish(&self, event: Event) -> Result<Output<EventId>, Error> {
        Ok(self.inner.pool.send_event(event).await?)
    }

    /// Resolve an author's relay list through the fallback chain: tracker
    /// cache, kind 10002 from the discovery pool, kind 10002 from the
    /// main pool, relay hints in the kind-3 content.
    pub async fn fetch_relay_list(&self, public_key: PublicKey) -> Option<RelayList> {
        if let Some(list) = self.inner.tracker.get(&public_key).await {
            return Some(list);
        }

        let filter: Filter = Filter::new()
            .author(public_key)
            .kind(Kind::RELAY_LIST)
            .limit(1);

        for pool in [&self.inner.discovery_pool, &self.inner.pool] {
            if let Some(event) = self.fetch_first(pool, filter.clone()).await {
                self.inner.tracker.track(&event).await;
                if let Some(list) = self.inner.tracker.get(&public_key).await {
                    return Some(list);
                }
            }
        }

        // Legacy fallback: relay hints embedded in the contact list
        let filter: Filter = Filter::new()
            .author(public_key)
            .kind(Kind::CONTACT_LIST)
            .limit(1);
        if let Some(event) = self.fetch_first(&self.inner.pool, filter).await {
            let hints = nip02::extract_relay_hints(&event.content);
            if !hints.is_empty() {
                let list = RelayList {
                    map: hints.into_iter().collect(),
                };
                self.inner
                    .tracker
                    .track_list(public_key, list, event.created_at)
                    .await;
                return self.inner.tracker.get(&public_key).await;
            }
        }

        None
    }

    /// One-shot query: first matching event from a pool's connected
    /// relays, bounded by the outbox fetch timeout.
    async fn fetch_first(&self, pool: &RelayPool, filter: Filter) -> Option<Event> {
        let manager: &Arc<SubscriptionManager> = &self.inner.manager;
        let mut subscription: Subscription = manager.subscribe(vec![filter]).await;
        let id: SubscriptionId = subscription.id().clone();

        let relays: Vec<Relay> = pool.connected_relays().await;
        let mut pending: usize = 0;
        for relay in relays.into_iter() {
            match manager.attach_relay(&id, relay).await {
                Ok(true) => pending += 1,
                Ok(false) => {}
                Err(e) => tracing::debug!(error = %e, "Fetch attach failed."),
            }
        }

        if pending == 0 {
            subscription.stop().await;
            return None;
        }

        let result: Option<Event> =
            tokio::time::timeout(self.inner.opts.outbox_fetch_timeout, async {
                while let Some(notification) = subscription.recv().await {
                    match notification {
                        SubscriptionNotification::Event { event, .. } => {
                            return Some(*event);
                        }
                        SubscriptionNotification::EndOfStoredEvents { .. } => {
                            pending = pending.saturating_sub(1);
                            if pending == 0 {
                                return None;
                            }
                        }
                    }
                }
                None
            })
            .await
            .ok()
            .flatten();

        subscription.stop().await;
        result
    }

    /// Register an extra kind for the session subscription. Applies to
    /// subsequent logins.
    pub async fn register_session_kind(&self, kind: Kind) {
        let mut extra_kinds = self.inner.extra_kinds.write().await;
        extra_kinds.insert(kind);
    }

    /// Active identity, if any
    pub fn active_account(&self) -> Option<PublicKey> {
        *self.inner.active.borrow()
    }

    /// Observable active identity
    pub fn active_account_stream(&self) -> watch::Receiver<Option<PublicKey>> {
        self.inner.active.subscribe()
    }

    /// All logged-in identities
    pub async fn accounts(&self) -> Vec<PublicKey> {
        let accounts = self.inner.accounts.read().await;
        accounts.keys().copied().collect()
    }

    /// Account by public key
    pub async fn account(&self, public_key: &PublicKey) -> Option<CurrentUser> {
        let accounts = self.inner.accounts.read().await;
        accounts.get(public_key).cloned()
    }

    /// The active account
    pub async fn current_user(&self) -> Option<CurrentUser> {
        let public_key: PublicKey = self.active_account()?;
        self.account(&public_key).await
    }

    /// Log in: insert the identity (if absent), make it active, start its
    /// session subscription and persist the signer.
    ///
    /// A persistence failure doesn't abort the login: the session is live
    /// and the failure is carried in [`Login::persist_error`].
    pub async fn login<S>(&self, signer: S) -> Result<Login, Error>
    where
        S: Into<AccountSigner>,
    {
        let signer: AccountSigner = signer.into();
        let public_key: PublicKey = signer.get_public_key().await?;

        let user: CurrentUser = {
            let mut accounts = self.inner.accounts.write().await;
            match accounts.get(&public_key) {
                Some(user) => user.clone(),
                None => {
                    let extra_kinds = self.inner.extra_kinds.read().await.clone();
                    let user = CurrentUser::new(public_key, signer, extra_kinds);
                    accounts.insert(public_key, user.clone());
                    user
                }
            }
        };

        self.set_active(Some(user.clone())).await;
        self.start_session(&user).await?;

        let persist_error: Option<StoreError> = match &self.inner.store {
            Some(store) => {
                let blob: Vec<u8> = user.signer().to_payload().to_blob()?;
                store.save(&public_key, blob).await.err()
            }
            None => None,
        };

        if let Some(e) = &persist_error {
            tracing::error!(error = %e, "Impossible to persist signer; session stays live.");
        }

        Ok(Login {
            public_key,
            persist_error,
        })
    }

    /// Log out (the active account when `public_key` is `None`): stop the
    /// session subscription, drop the identity, reassign the active
    /// pointer and delete the persisted entry.
    pub async fn logout(&self, public_key: Option<PublicKey>) -> Result<(), Error> {
        let public_key: PublicKey = match public_key {
            Some(public_key) => public_key,
            None => self.active_account().ok_or(Error::NoActiveAccount)?,
        };

        let user: CurrentUser = {
            let mut accounts = self.inner.accounts.write().await;
            accounts.remove(&public_key).ok_or(Error::AccountNotFound)?
        };

        if let Some(id) = user.stop_session().await {
            self.inner.manager.unsubscribe(&id).await;
        }

        if self.active_account() == Some(public_key) {
            let next: Option<CurrentUser> = {
                let accounts = self.inner.accounts.read().await;
                accounts.values().next().cloned()
            };
            if let Some(next) = &next {
                self.start_session(next).await?;
            }
            self.set_active(next).await;
        }

        if let Some(store) = &self.inner.store {
            store.delete(&public_key).await?;
        }

        Ok(())
    }

    /// Switch the active pointer to another logged-in identity.
    pub async fn switch_account(&self, public_key: &PublicKey) -> bool {
        let user: Option<CurrentUser> = self.account(public_key).await;

        match user {
            Some(user) => {
                // The active identity always has a live session
                if let Err(e) = self.start_session(&user).await {
                    tracing::error!(error = %e, "Impossible to start session subscription.");
                }
                self.set_active(Some(user)).await;
                true
            }
            None => false,
        }
    }

    /// Rehydrate every persisted identity. The first restored account
    /// becomes active (unless one already is) and only the active one
    /// gets a session subscription.
    pub async fn restore_accounts(&self) -> Result<Vec<PublicKey>, Error> {
        let store: &Arc<dyn AccountStore> = match &self.inner.store {
            Some(store) => store,
            None => return Ok(Vec::new()),
        };

        let mut restored: Vec<PublicKey> = Vec::new();

        for public_key in store.list().await? {
            {
                let accounts = self.inner.accounts.read().await;
                if accounts.contains_key(&public_key) {
                    continue;
                }
            }

            let blob: Vec<u8> = match store.load(&public_key).await? {
                Some(blob) => blob,
                None => continue,
            };

            let payload: SignerPayload = match SignerPayload::from_blob(&blob) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(pubkey = %public_key, error = %e, "Corrupted signer payload.");
                    continue;
                }
            };

            // Unknown signer types are skipped, not fatal
            let deferred: DeferredSigner = match DeferredSigner::from_payload(&payload) {
                Some(Ok(deferred)) => deferred,
                Some(Err(e)) => {
                    tracing::warn!(pubkey = %public_key, error = %e, "Invalid signer payload.");
                    continue;
                }
                None => continue,
            };

            let signer: AccountSigner = match deferred.finalize() {
                Ok(signer) => signer,
                Err(e) => {
                    tracing::warn!(pubkey = %public_key, error = %e, "Signer finalization failed.");
                    continue;
                }
            };

            let extra_kinds = self.inner.extra_kinds.read().await.clone();
            let user = CurrentUser::new(public_key, signer, extra_kinds);
            {
                let mut accounts = self.inner.accounts.write().await;
                accounts.insert(public_key, user);
            }
            restored.push(public_key);
        }

        if self.active_account().is_none() {
            if let Some(first) = restored.first() {
                if let Some(user) = self.account(first).await {
                    self.start_session(&user).await?;
                    self.set_active(Some(user)).await;
                }
            }
        }

        Ok(restored)
    }

    async fn set_active(&self, user: Option<CurrentUser>) {
        // The main pool authenticates as the active identity
        let signer: Option<Arc<dyn NostrSigner>> = user
            .as_ref()
            .map(|u| u.signer().clone().into_nostr_signer());
        self.inner.pool.set_signer(signer).await;

        let _ = self.inner.active.send(user.map(|u| u.public_key()));
    }

    /// Start the standing session subscription for an identity:
    /// `{authors: {pubkey}, kinds: session kinds}` on every main-pool
    /// relay, current and future.
    async fn start_session(&self, user: &CurrentUser) -> Result<(), Error> {
        let mut session = user.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let filter: Filter = Filter::new()
            .author(user.public_key())
            .kinds(user.session_kinds());

        let mut subscription: Subscription = self.inner.manager.subscribe(vec![filter]).await;
        let id: SubscriptionId = subscription.id().clone();

        for relay in self.inner.pool.relays().await.into_values() {
            if let Err(e) = self.inner.manager.attach_relay(&id, relay).await {
                tracing::warn!(error = %e, "Impossible to attach session subscription.");
            }
        }

        let listener: JoinHandle<()> = {
            let user = user.clone();
            let pool = self.inner.pool.clone();
            let manager = Arc::clone(&self.inner.manager);
            let id = id.clone();
            let mut pool_notifications = pool.notifications();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        notification = subscription.recv() => match notification {
                            Some(SubscriptionNotification::Event { event, .. }) => {
                                user.handle_event(&event).await;
                            }
                            Some(SubscriptionNotification::EndOfStoredEvents { .. }) => {}
                            None => break,
                        },
                        notification = pool_notifications.recv() => match notification {
                            Ok(RelayPoolNotification::RelayAdded { relay_url }) => {
                                if let Some(relay) = pool.relay(&relay_url).await {
                                    if let Err(e) = manager.attach_relay(&id, relay).await {
                                        tracing::warn!(error = %e, "Session attach failed.");
                                    }
                                }
                            }
                            Ok(..) => {}
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(..)) => {}
                        }
                    }
                }
            })
        };

        *session = Some(SessionHandle {
            subscription_id: id,
            listener,
        });

        Ok(())
    }

    /// Release everything: cancel background tasks, stop sessions, close
    /// both pools.
    pub async fn close(&self) {
        {
            let mut tasks = self.inner.tasks.lock().await;
            for task in tasks.drain(..) {
                task.abort();
            }
        }

        let users: Vec<CurrentUser> = {
            let mut accounts = self.inner.accounts.write().await;
            accounts.drain().map(|(_, user)| user).collect()
        };
        for user in users.into_iter() {
            user.stop_session().await;
        }
        let _ = self.inner.active.send(None);

        // Drop every subscription (cancels discovery listeners and
        // pending fetches, best-effort CLOSE while relays are still up)
        for id in self.inner.manager.subscription_ids().await {
            self.inner.manager.unsubscribe(&id).await;
        }

        self.inner.pool.shutdown().await;
        self.inner.discovery_pool.shutdown().await;
    }
}
