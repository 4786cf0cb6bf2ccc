// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Nostr Connect client
//!
//! Every signer capability call becomes an encrypted kind-24133
//! request/response over the URI's transport relays; responses are
//! correlated by request id and completed through per-request slots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nostrkit::nips::nip44;
use nostrkit::nips::nip46::{Message, NostrConnectURI, Request};
use nostrkit::{
    Event, EventBuilder, Filter, Keys, Kind, NostrSigner, PublicKey, SignerError, Tag, Timestamp,
    UnsignedEvent,
};
use nostrkit_relay_pool::{
    RelayOptions, RelayPool, RelayPoolOptions, Subscription, SubscriptionManager,
    SubscriptionManagerOptions, SubscriptionNotification,
};
use tokio::sync::{oneshot, Mutex, OnceCell};

use crate::error::Error;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// How long to wait for the transport relays on bootstrap
const BOOTSTRAP_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

type PendingRequests = Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>;

/// Nostr Connect client signer (NIP-46)
#[derive(Debug, Clone)]
pub struct NostrConnect {
    uri: NostrConnectURI,
    app_keys: Keys,
    remote_signer_public_key: Arc<OnceCell<PublicKey>>,
    user_public_key: Arc<OnceCell<PublicKey>>,
    pool: RelayPool,
    pending: PendingRequests,
    timeout: Duration,
    secret: Option<String>,
}

impl NostrConnect {
    /// Construct from a `bunker://` or `nostrconnect://` URI.
    ///
    /// The local throwaway keys identify this client on the transport
    /// relays; the signing identity is learned over the wire.
    pub fn new(uri: NostrConnectURI, app_keys: Keys, timeout: Duration) -> Result<Self, Error> {
        if uri.relays().is_empty() {
            return Err(Error::NoRelays);
        }

        // A client-initiated URI must advertise our own key
        if let NostrConnectURI::Client { public_key, .. } = &uri {
            if public_key != &app_keys.public_key() {
                return Err(Error::PublicKeyNotMatchAppKeys);
            }
        }

        // Dedicated transport pool: connect traffic never mixes with the
        // application's relays
        let manager = Arc::new(SubscriptionManager::new(SubscriptionManagerOptions::default()));
        let pool = RelayPool::new(manager, RelayPoolOptions::default());

        Ok(Self {
            secret: uri.secret().map(|s| s.to_string()),
            uri,
            app_keys,
            remote_signer_public_key: Arc::new(OnceCell::new()),
            user_public_key: Arc::new(OnceCell::new()),
            pool,
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        })
    }

    /// Construct with the default 30s per-request timeout.
    pub fn with_default_timeout(uri: NostrConnectURI, app_keys: Keys) -> Result<Self, Error> {
        Self::new(uri, app_keys, DEFAULT_TIMEOUT)
    }

    /// The bootstrap URI
    #[inline]
    pub fn uri(&self) -> &NostrConnectURI {
        &self.uri
    }

    /// Local throwaway keys
    #[inline]
    pub fn app_keys(&self) -> &Keys {
        &self.app_keys
    }

    /// Per-request timeout
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn remote_signer_public_key(&self) -> Result<PublicKey, Error> {
        self.remote_signer_public_key
            .get_or_try_init(|| async { self.bootstrap().await })
            .await
            .copied()
    }

    /// Connect the transport relays, start the response listener and
    /// learn the remote signer public key.
    async fn bootstrap(&self) -> Result<PublicKey, Error> {
        for url in self.uri.relays().iter() {
            self.pool.add_relay(url, RelayOptions::default()).await?;
        }
        self.pool.connect(Some(BOOTSTRAP_CONNECTION_TIMEOUT)).await;

        // Listen for kind-24133 events addressed to our throwaway key
        let filter = Filter::new()
            .pubkey(self.app_keys.public_key())
            .kind(Kind::NOSTR_CONNECT)
            .since(Timestamp::now());

        let manager: &Arc<SubscriptionManager> = self.pool.manager();
        let subscription: Subscription = manager.subscribe(vec![filter]).await;
        let subscription_id = subscription.id().clone();
        for relay in self.pool.relays().await.into_values() {
            manager.attach_relay(&subscription_id, relay).await?;
        }

        let (ack_tx, ack_rx) = oneshot::channel::<(PublicKey, Option<PublicKey>)>();
        self.spawn_listener(subscription, ack_tx);

        let remote_signer_public_key: PublicKey = match self.uri.remote_signer_public_key() {
            Some(public_key) => *public_key,
            None => {
                // Client-initiated: wait for the signer's `connect` ack
                let (remote, user) = tokio::time::timeout(self.timeout, ack_rx)
                    .await
                    .map_err(|_| Error::Timeout)?
                    .map_err(|_| Error::Timeout)?;
                if let Some(user) = user {
                    let _ = self.user_public_key.set(user);
                }
                remote
            }
        };

        // Signer-initiated: we open the session with `connect`
        if self.uri.is_bunker() {
            let req = Request::Connect {
                public_key: remote_signer_public_key,
                secret: self.secret.clone(),
            };
            self.send_request_to(remote_signer_public_key, req).await?;
        }

        Ok(remote_signer_public_key)
    }

    /// Background task: decrypt inbound events, complete pending request
    /// slots, surface the signer-initiated `connect` handshake.
    fn spawn_listener(
        &self,
        mut subscription: Subscription,
        ack_tx: oneshot::Sender<(PublicKey, Option<PublicKey>)>,
    ) {
        let app_keys: Keys = self.app_keys.clone();
        let pending: PendingRequests = Arc::clone(&self.pending);
        let mut ack_tx: Option<oneshot::Sender<(PublicKey, Option<PublicKey>)>> = Some(ack_tx);

        tokio::spawn(async move {
            while let Some(notification) = subscription.recv().await {
                let event: Box<Event> = match notification {
                    SubscriptionNotification::Event { event, .. } => event,
                    SubscriptionNotification::EndOfStoredEvents { .. } => continue,
                };

                if event.kind != Kind::NOSTR_CONNECT {
                    continue;
                }

                let msg: String = match nip44::decrypt(
                    app_keys.secret_key(),
                    &event.pubkey,
                    &event.content,
                ) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(error = %e, "Impossible to decrypt nostr connect payload.");
                        continue;
                    }
                };

                let msg: Message = match Message::from_json(&msg) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid nostr connect message.");
                        continue;
                    }
                };

                tracing::debug!("Received nostr connect message: '{msg}'");

                match msg {
                    Message::Response { .. } => {
                        let id: String = msg.id().to_string();
                        let slot = {
                            let mut pending = pending.lock().await;
                            pending.remove(&id)
                        };
                        match slot {
                            Some(slot) => {
                                let _ = slot.send(msg);
                            }
                            None => {
                                tracing::debug!(id = %id, "No pending request for response.")
                            }
                        }
                    }
                    // Signer-initiated handshake: the signer announces
                    // itself (and the user key) with a `connect` request
                    Message::Request {
                        req: Request::Connect { public_key, .. },
                        ..
                    } => {
                        if let Some(tx) = ack_tx.take() {
                            let _ = tx.send((event.pubkey, Some(public_key)));
                        }
                    }
                    Message::Request { .. } => {}
                }
            }

            tracing::debug!("Nostr connect listener exited.");
        });
    }

    async fn send_request(&self, req: Request) -> Result<String, Error> {
        let remote: PublicKey = self.remote_signer_public_key().await?;
        self.send_request_to(remote, req).await
    }

    async fn send_request_to(
        &self,
        remote_signer_public_key: PublicKey,
        req: Request,
    ) -> Result<String, Error> {
        let msg: Message = Message::request(req);
        let req_id: String = msg.id().to_string();

        tracing::debug!("Sending nostr connect message: '{msg}'");

        // Register the completion slot before the event leaves
        let (tx, rx) = oneshot::channel::<Message>();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(req_id.clone(), tx);
        }

        let content: String = nip44::encrypt(
            self.app_keys.secret_key(),
            &remote_signer_public_key,
            &msg.as_json(),
        )?;
        let event: Event = EventBuilder::new(Kind::NOSTR_CONNECT, content)
            .tag(Tag::public_key(&remote_signer_public_key))
            .sign_with_keys(&self.app_keys)?;

        self.pool.send_event(event).await?;

        let response: Result<Message, Error> = tokio::time::timeout(self.timeout, rx)
            .await
            .map_err(|_| Error::Timeout)
            .and_then(|res| res.map_err(|_| Error::Timeout));

        let response: Message = match response {
            Ok(response) => response,
            Err(e) => {
                // Drop the stale slot so late responses don't pile up
                let mut pending = self.pending.lock().await;
                pending.remove(&req_id);
                return Err(e);
            }
        };

        match response {
            Message::Response {
                error: Some(error), ..
            } => Err(Error::Response(error)),
            Message::Response {
                result: Some(result),
                ..
            } => Ok(result),
            _ => Err(Error::EmptyResponse),
        }
    }

    /// Completely shutdown the transport pool.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

#[async_trait]
impl NostrSigner for NostrConnect {
    async fn get_public_key(&self) -> Result<PublicKey, SignerError> {
        self.user_public_key
            .get_or_try_init(|| async {
                let result: String = self
                    .send_request(Request::GetPublicKey)
                    .await
                    .map_err(SignerError::backend)?;
                PublicKey::from_hex(&result).map_err(SignerError::backend)
            })
            .await
            .copied()
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        let result: String = self
            .send_request(Request::SignEvent(Box::new(unsigned)))
            .await
            .map_err(SignerError::backend)?;
        Event::from_json(&result).map_err(SignerError::backend)
    }

    async fn nip44_encrypt(
        &self,
        public_key: &PublicKey,
        content: &str,
    ) -> Result<String, SignerError> {
        self.send_request(Request::Nip44Encrypt {
            public_key: *public_key,
            text: content.to_string(),
        })
        .await
        .map_err(SignerError::backend)
    }

    async fn nip44_decrypt(
        &self,
        public_key: &PublicKey,
        payload: &str,
    ) -> Result<String, SignerError> {
        self.send_request(Request::Nip44Decrypt {
            public_key: *public_key,
            ciphertext: payload.to_string(),
        })
        .await
        .map_err(SignerError::backend)
    }
}
