// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay session
//!
//! One WebSocket session per relay with automatic reconnection,
//! exponential backoff, flapping detection, subscription restoration and
//! NIP-42 authentication.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nostrkit::{
    ClientMessage, Event, EventId, Filter, NostrSigner, RelayMessage, RelayUrl, SubscriptionId,
};
use tokio::sync::broadcast;

mod constants;
mod error;
mod inner;
mod options;
mod stats;
mod status;

pub use self::error::Error;
pub use self::options::RelayOptions;
pub use self::stats::RelayConnectionStats;
pub use self::status::RelayStatus;
use self::inner::InnerRelay;
use crate::pool::RelayPoolNotification;
use crate::subscriptions::SubscriptionManager;

/// Relay event forwarded to local listeners
#[derive(Debug, Clone)]
pub enum RelayNotification {
    /// Received an `EVENT` frame
    Event {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Event
        event: Box<Event>,
    },
    /// Received any relay frame
    Message {
        /// Frame
        message: RelayMessage,
    },
    /// Status changed
    RelayStatus {
        /// New status
        status: RelayStatus,
    },
    /// Relay asked for authentication and no signer is configured
    AuthRequired {
        /// Challenge string
        challenge: String,
    },
    /// AUTH accepted by the relay
    Authenticated,
    /// Relay is shutting down
    Shutdown,
}

/// Relay session handle
#[derive(Debug, Clone)]
pub struct Relay {
    pub(crate) inner: InnerRelay,
}

impl PartialEq for Relay {
    fn eq(&self, other: &Self) -> bool {
        self.url() == other.url()
    }
}

impl Eq for Relay {}

impl Relay {
    /// New relay session (not yet connected)
    pub fn new(url: RelayUrl, opts: RelayOptions) -> Self {
        Self {
            inner: InnerRelay::new(url, opts),
        }
    }

    /// Relay url
    #[inline]
    pub fn url(&self) -> &RelayUrl {
        &self.inner.url
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> RelayStatus {
        self.inner.status()
    }

    /// Check if the session is established
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Connection statistics
    #[inline]
    pub fn stats(&self) -> &RelayConnectionStats {
        &self.inner.stats
    }

    /// Options
    #[inline]
    pub fn opts(&self) -> &RelayOptions {
        &self.inner.opts
    }

    /// Subscribe to relay notifications
    pub fn notifications(&self) -> broadcast::Receiver<RelayNotification> {
        self.inner.internal_notification_sender.subscribe()
    }

    /// Subscriptions routed through this relay
    pub async fn subscriptions(&self) -> HashMap<SubscriptionId, Vec<Filter>> {
        self.inner.subscriptions().await
    }

    /// Filters of a specific subscription
    pub async fn subscription(&self, id: &SubscriptionId) -> Option<Vec<Filter>> {
        self.inner.subscription(id).await
    }

    pub(crate) fn set_notification_sender(
        &self,
        notification_sender: broadcast::Sender<RelayPoolNotification>,
    ) {
        self.inner.set_notification_sender(notification_sender);
    }

    /// Route inbound `EVENT`/`EOSE` frames through a subscription manager.
    pub fn set_subscription_manager(&self, manager: Arc<SubscriptionManager>) {
        self.inner.set_subscription_manager(manager);
    }

    /// Set (or clear) the signer used to answer `AUTH` challenges.
    pub async fn set_signer(&self, signer: Option<Arc<dyn NostrSigner>>) {
        self.inner.set_signer(signer).await;
    }

    /// Connect, spawning the session task.
    ///
    /// With a timeout this waits until the session is established (or the
    /// first attempt fails); without, it returns immediately.
    pub async fn connect(&self, connection_timeout: Option<Duration>) {
        self.inner.connect(connection_timeout).await
    }

    /// Terminate the session and disable reconnection.
    pub fn disconnect(&self) -> Result<(), Error> {
        self.inner.disconnect()
    }

    /// Queue a message towards the relay.
    pub fn send_msg(&self, msg: ClientMessage) -> Result<(), Error> {
        self.inner.send_msg(msg)
    }

    /// Transport-send an event.
    ///
    /// `Ok` means accepted by the transport; relay policy acceptance
    /// arrives asynchronously as an `OK` frame.
    pub fn send_event(&self, event: Event) -> Result<EventId, Error> {
        self.inner.send_event(event)
    }

    /// Subscribe with a caller-chosen id; restored on every reconnect.
    pub async fn subscribe_with_id(
        &self,
        id: SubscriptionId,
        filters: Vec<Filter>,
    ) -> Result<(), Error> {
        self.inner.subscribe_with_id(id, filters).await
    }

    /// Remove the subscription and best-effort send `CLOSE`.
    pub async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), Error> {
        self.inner.unsubscribe(id).await
    }

    /// Remove all subscriptions.
    pub async fn unsubscribe_all(&self) -> Result<(), Error> {
        self.inner.unsubscribe_all().await
    }

    /// `COUNT` round trip.
    pub async fn count_events(
        &self,
        filters: Vec<Filter>,
        timeout: Duration,
    ) -> Result<usize, Error> {
        self.inner.count_events(filters, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_relay() -> Relay {
        Relay::new(
            RelayUrl::parse("wss://relay.example.com").unwrap(),
            RelayOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_subscription_bookkeeping() {
        let relay = test_relay();
        let id = SubscriptionId::new("sub-test");
        let filters = vec![Filter::new().kind(nostrkit::Kind::TEXT_NOTE)];

        relay
            .subscribe_with_id(id.clone(), filters.clone())
            .await
            .unwrap();
        assert_eq!(relay.subscription(&id).await, Some(filters));
        assert_eq!(relay.stats().subscriptions_total(), 1);

        // Same id again: filters replaced, not double counted
        let new_filters = vec![Filter::new().kind(nostrkit::Kind::REACTION)];
        relay
            .subscribe_with_id(id.clone(), new_filters.clone())
            .await
            .unwrap();
        assert_eq!(relay.subscription(&id).await, Some(new_filters));
        assert_eq!(relay.stats().subscriptions_total(), 1);

        relay.unsubscribe(&id).await.unwrap();
        assert!(relay.subscription(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_filters_rejected() {
        let relay = test_relay();
        let res = relay
            .subscribe_with_id(SubscriptionId::new("x"), Vec::new())
            .await;
        assert!(matches!(res, Err(Error::FiltersEmpty)));
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let relay = test_relay();
        let keys = nostrkit::Keys::generate();
        let event = nostrkit::EventBuilder::text_note("hi")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(matches!(relay.send_event(event), Err(Error::Initialized)));
    }

    #[tokio::test]
    async fn test_disconnect_without_task_terminates() {
        let relay = test_relay();
        relay.disconnect().unwrap();
        assert_eq!(relay.status(), RelayStatus::Terminated);
    }
}
