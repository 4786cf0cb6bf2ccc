// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nostrkit::Timestamp;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct InnerRelayConnectionStats {
    attempts: AtomicUsize,
    success: AtomicUsize,
    disconnections: AtomicUsize,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
    bytes_sent: AtomicUsize,
    bytes_received: AtomicUsize,
    events_validated: AtomicUsize,
    events_not_validated: AtomicUsize,
    subscriptions_total: AtomicUsize,
    auth_attempts: AtomicUsize,
    auth_success: AtomicUsize,
    connected_at: AtomicU64,
    first_connection_at: AtomicU64,
    latency: RwLock<Option<Duration>>,
}

/// Per-relay connection statistics, shared across clones of the session.
#[derive(Debug, Clone, Default)]
pub struct RelayConnectionStats {
    inner: Arc<InnerRelayConnectionStats>,
}

impl RelayConnectionStats {
    /// Connection attempts
    #[inline]
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Successfully established connections
    #[inline]
    pub fn success(&self) -> usize {
        self.inner.success.load(Ordering::SeqCst)
    }

    /// Observed disconnections
    #[inline]
    pub fn disconnections(&self) -> usize {
        self.inner.disconnections.load(Ordering::SeqCst)
    }

    /// Messages written to the socket
    #[inline]
    pub fn messages_sent(&self) -> usize {
        self.inner.messages_sent.load(Ordering::SeqCst)
    }

    /// Frames received from the socket
    #[inline]
    pub fn messages_received(&self) -> usize {
        self.inner.messages_received.load(Ordering::SeqCst)
    }

    /// Bytes written
    #[inline]
    pub fn bytes_sent(&self) -> usize {
        self.inner.bytes_sent.load(Ordering::SeqCst)
    }

    /// Bytes received
    #[inline]
    pub fn bytes_received(&self) -> usize {
        self.inner.bytes_received.load(Ordering::SeqCst)
    }

    /// Events that passed signature verification
    #[inline]
    pub fn events_validated(&self) -> usize {
        self.inner.events_validated.load(Ordering::SeqCst)
    }

    /// Events dropped before verification or failing it
    #[inline]
    pub fn events_not_validated(&self) -> usize {
        self.inner.events_not_validated.load(Ordering::SeqCst)
    }

    /// Subscriptions ever routed through this relay
    #[inline]
    pub fn subscriptions_total(&self) -> usize {
        self.inner.subscriptions_total.load(Ordering::SeqCst)
    }

    /// AUTH attempts
    #[inline]
    pub fn auth_attempts(&self) -> usize {
        self.inner.auth_attempts.load(Ordering::SeqCst)
    }

    /// Accepted AUTH responses
    #[inline]
    pub fn auth_success(&self) -> usize {
        self.inner.auth_success.load(Ordering::SeqCst)
    }

    /// UNIX timestamp of the most recent connection
    #[inline]
    pub fn connected_at(&self) -> Timestamp {
        Timestamp::from(self.inner.connected_at.load(Ordering::SeqCst))
    }

    /// UNIX timestamp of the first-ever connection
    #[inline]
    pub fn first_connection_at(&self) -> Timestamp {
        Timestamp::from(self.inner.first_connection_at.load(Ordering::SeqCst))
    }

    /// Success rate over all attempts
    pub fn success_rate(&self) -> f64 {
        let attempts: usize = self.attempts();
        if attempts > 0 {
            self.success() as f64 / attempts as f64
        } else {
            0.0
        }
    }

    /// Latency of the last WebSocket handshake
    pub async fn latency(&self) -> Option<Duration> {
        *self.inner.latency.read().await
    }

    pub(super) fn new_attempt(&self) {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn new_success(&self) {
        self.inner.success.fetch_add(1, Ordering::SeqCst);

        let now: u64 = Timestamp::now().as_u64();
        self.inner.connected_at.store(now, Ordering::SeqCst);

        if self.first_connection_at().is_zero() {
            self.inner.first_connection_at.store(now, Ordering::SeqCst);
        }
    }

    pub(super) fn new_disconnection(&self) {
        self.inner.disconnections.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn add_message_sent(&self, size: usize) {
        self.inner.messages_sent.fetch_add(1, Ordering::SeqCst);
        if size > 0 {
            self.inner.bytes_sent.fetch_add(size, Ordering::SeqCst);
        }
    }

    pub(super) fn add_message_received(&self, size: usize) {
        self.inner.messages_received.fetch_add(1, Ordering::SeqCst);
        if size > 0 {
            self.inner.bytes_received.fetch_add(size, Ordering::SeqCst);
        }
    }

    pub(crate) fn new_event_validated(&self) {
        self.inner.events_validated.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn new_event_not_validated(&self) {
        self.inner.events_not_validated.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn new_subscription(&self) {
        self.inner.subscriptions_total.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn new_auth_attempt(&self) {
        self.inner.auth_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn new_auth_success(&self) {
        self.inner.auth_success.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) async fn save_latency(&self, latency: Duration) {
        let mut slot = self.inner.latency.write().await;
        *slot = Some(latency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = RelayConnectionStats::default();
        stats.new_attempt();
        stats.new_attempt();
        stats.new_success();
        assert_eq!(stats.attempts(), 2);
        assert_eq!(stats.success(), 1);
        assert!((stats.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!(!stats.connected_at().is_zero());
        assert_eq!(stats.connected_at(), stats.first_connection_at());
    }

    #[test]
    fn test_bytes_and_messages() {
        let stats = RelayConnectionStats::default();
        stats.add_message_sent(10);
        stats.add_message_received(25);
        stats.add_message_received(5);
        assert_eq!(stats.messages_sent(), 1);
        assert_eq!(stats.messages_received(), 2);
        assert_eq!(stats.bytes_sent(), 10);
        assert_eq!(stats.bytes_received(), 30);
    }
}
