// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use std::cmp;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use nostrkit::{
    ClientMessage, Event, EventBuilder, EventId, Filter, MessageHandleError, NostrSigner,
    RelayMessage, RelayUrl, SubscriptionId,
};
use tokio::sync::{broadcast, mpsc, watch, Mutex, MutexGuard, OnceCell, RwLock};

use super::constants::{
    AUTH_OK_TIMEOUT, DEFAULT_CONNECTION_TIMEOUT, FLAPPING_THRESHOLD, NOTIFICATION_CHANNEL_SIZE,
    OUTGOING_QUEUE_SIZE, RETRY_EXPONENT_CAP,
};
use super::options::RelayOptions;
use super::stats::RelayConnectionStats;
use super::status::{AtomicRelayStatus, RelayStatus};
use super::{Error, RelayNotification};
use crate::pool::RelayPoolNotification;
use crate::subscriptions::{DispatchOutcome, SubscriptionManager};
use crate::transport::{self, Message as WsMessage, Sink, Stream};

struct OutgoingMessage {
    msgs: Vec<ClientMessage>,
}

#[derive(Debug, Clone, Copy)]
enum RelayServiceEvent {
    /// None
    None,
    /// Completely disconnect
    Terminate,
}

/// How a websocket session ended
enum SessionOutcome {
    /// The socket never opened
    FailedToOpen,
    /// The session dropped in less than the flapping threshold
    Flapped,
    /// The session dropped after serving for a while
    Dropped,
}

#[derive(Debug)]
struct RelayChannels {
    outgoing: (
        mpsc::Sender<OutgoingMessage>,
        Mutex<mpsc::Receiver<OutgoingMessage>>,
    ),
    service: (
        watch::Sender<RelayServiceEvent>,
        Mutex<watch::Receiver<RelayServiceEvent>>,
    ),
}

impl std::fmt::Debug for OutgoingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OutgoingMessage({} msgs)", self.msgs.len())
    }
}

impl RelayChannels {
    fn new() -> Self {
        let (tx_outgoing, rx_outgoing) = mpsc::channel::<OutgoingMessage>(OUTGOING_QUEUE_SIZE);
        let (tx_service, rx_service) = watch::channel::<RelayServiceEvent>(RelayServiceEvent::None);

        Self {
            outgoing: (tx_outgoing, Mutex::new(rx_outgoing)),
            service: (tx_service, Mutex::new(rx_service)),
        }
    }

    fn send_outgoing(&self, msg: OutgoingMessage) -> Result<(), Error> {
        self.outgoing
            .0
            .try_send(msg)
            .map_err(|_| Error::CantQueueMessage)
    }

    async fn rx_outgoing(&self) -> MutexGuard<'_, mpsc::Receiver<OutgoingMessage>> {
        self.outgoing.1.lock().await
    }

    fn send_service_msg(&self, event: RelayServiceEvent) -> Result<(), Error> {
        self.service
            .0
            .send(event)
            .map_err(|_| Error::CantQueueMessage)
    }

    async fn rx_service(&self) -> MutexGuard<'_, watch::Receiver<RelayServiceEvent>> {
        self.service.1.lock().await
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InnerRelay {
    pub(super) url: RelayUrl,
    status: Arc<AtomicRelayStatus>,
    pub(super) opts: RelayOptions,
    pub(super) stats: RelayConnectionStats,
    channels: Arc<RelayChannels>,
    pub(super) internal_notification_sender: broadcast::Sender<RelayNotification>,
    external_notification_sender: Arc<OnceCell<broadcast::Sender<RelayPoolNotification>>>,
    manager: Arc<OnceCell<Arc<SubscriptionManager>>>,
    signer: Arc<RwLock<Option<Arc<dyn NostrSigner>>>>,
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Vec<Filter>>>>,
    running: Arc<AtomicBool>,
}

impl InnerRelay {
    pub fn new(url: RelayUrl, opts: RelayOptions) -> Self {
        let (notification_sender, ..) =
            broadcast::channel::<RelayNotification>(NOTIFICATION_CHANNEL_SIZE);

        Self {
            url,
            status: Arc::new(AtomicRelayStatus::default()),
            opts,
            stats: RelayConnectionStats::default(),
            channels: Arc::new(RelayChannels::new()),
            internal_notification_sender: notification_sender,
            external_notification_sender: Arc::new(OnceCell::new()),
            manager: Arc::new(OnceCell::new()),
            signer: Arc::new(RwLock::new(None)),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Is the connection task running?
    #[inline]
    pub(super) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn status(&self) -> RelayStatus {
        self.status.load()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    fn set_status(&self, status: RelayStatus, log: bool) {
        self.status.set(status);

        if log {
            match status {
                RelayStatus::Initialized => tracing::trace!(url = %self.url, "Relay initialized."),
                RelayStatus::Connecting => tracing::debug!("Connecting to '{}'", self.url),
                RelayStatus::Connected => tracing::info!("Connected to '{}'", self.url),
                RelayStatus::AuthRequired => {
                    tracing::info!("'{}' requires authentication", self.url)
                }
                RelayStatus::Authenticating => {
                    tracing::debug!("Authenticating to '{}'", self.url)
                }
                RelayStatus::Authenticated => tracing::info!("Authenticated to '{}'", self.url),
                RelayStatus::Reconnecting => tracing::debug!(url = %self.url, "Reconnecting."),
                RelayStatus::Flapping => tracing::warn!(url = %self.url, "Connection is flapping."),
                RelayStatus::Disconnected => tracing::info!("Disconnected from '{}'", self.url),
                RelayStatus::Terminated => {
                    tracing::info!("Completely disconnected from '{}'", self.url)
                }
            }
        }

        self.send_notification(RelayNotification::RelayStatus { status }, true);
    }

    pub(crate) fn set_notification_sender(
        &self,
        notification_sender: broadcast::Sender<RelayPoolNotification>,
    ) {
        let _ = self.external_notification_sender.set(notification_sender);
    }

    pub(crate) fn set_subscription_manager(&self, manager: Arc<SubscriptionManager>) {
        let _ = self.manager.set(manager);
    }

    pub(crate) async fn set_signer(&self, signer: Option<Arc<dyn NostrSigner>>) {
        let mut slot = self.signer.write().await;
        *slot = signer;
    }

    fn send_notification(&self, notification: RelayNotification, external: bool) {
        if external {
            if let Some(external_sender) = self.external_notification_sender.get() {
                let converted: Option<RelayPoolNotification> = match &notification {
                    RelayNotification::RelayStatus { status } => match status {
                        RelayStatus::Connected => Some(RelayPoolNotification::RelayConnected {
                            relay_url: self.url.clone(),
                        }),
                        s if s.is_disconnected() => {
                            Some(RelayPoolNotification::RelayDisconnected {
                                relay_url: self.url.clone(),
                            })
                        }
                        _ => None,
                    },
                    RelayNotification::AuthRequired { challenge } => {
                        Some(RelayPoolNotification::RelayAuthRequired {
                            relay_url: self.url.clone(),
                            challenge: challenge.clone(),
                        })
                    }
                    RelayNotification::Authenticated => {
                        Some(RelayPoolNotification::RelayAuthenticated {
                            relay_url: self.url.clone(),
                        })
                    }
                    _ => None,
                };

                if let Some(converted) = converted {
                    let _ = external_sender.send(converted);
                }
            }
        }

        let _ = self.internal_notification_sender.send(notification);
    }

    pub async fn subscriptions(&self) -> HashMap<SubscriptionId, Vec<Filter>> {
        self.subscriptions.read().await.clone()
    }

    pub async fn subscription(&self, id: &SubscriptionId) -> Option<Vec<Filter>> {
        self.subscriptions.read().await.get(id).cloned()
    }

    pub async fn connect(&self, connection_timeout: Option<Duration>) {
        // At most one connection task per relay
        if self.is_running() {
            tracing::warn!(url = %self.url, "Connection task is already running.");
            return;
        }

        match connection_timeout {
            Some(timeout) => {
                let mut notifications = self.internal_notification_sender.subscribe();

                self.spawn_connection_task(timeout);

                // Wait for the first terminal status change
                while let Ok(notification) = notifications.recv().await {
                    if let RelayNotification::RelayStatus { status } = notification {
                        if status.is_connected() || status.is_disconnected() {
                            break;
                        }
                    }
                }
            }
            None => self.spawn_connection_task(DEFAULT_CONNECTION_TIMEOUT),
        }
    }

    fn spawn_connection_task(&self, first_timeout: Duration) {
        if self.is_running() {
            tracing::warn!(url = %self.url, "Connection task is already running.");
            return;
        }

        let relay = self.clone();
        tokio::spawn(async move {
            relay.running.store(true, Ordering::SeqCst);

            let mut consecutive_failures: u32 = 0;
            let mut first_attempt: bool = true;

            loop {
                // Acquire service watcher
                let mut rx_service = relay.channels.rx_service().await;

                let timeout: Duration = if first_attempt {
                    first_timeout
                } else {
                    DEFAULT_CONNECTION_TIMEOUT
                };
                first_attempt = false;

                let outcome: SessionOutcome = tokio::select! {
                    outcome = relay.connect_and_run(timeout) => outcome,
                    _ = relay.handle_terminate(&mut rx_service) => {
                        relay.set_status(RelayStatus::Terminated, true);
                        break;
                    }
                };

                if relay.status().is_terminated() {
                    break;
                }

                // Update the consecutive-failure counter; a flapping
                // session counts one extra time.
                match outcome {
                    SessionOutcome::FailedToOpen => consecutive_failures += 1,
                    SessionOutcome::Flapped => {
                        consecutive_failures += 2;
                        relay.set_status(RelayStatus::Flapping, true);
                    }
                    SessionOutcome::Dropped => {
                        consecutive_failures = 1;
                        relay.set_status(RelayStatus::Disconnected, true);
                    }
                }

                if !relay.opts.reconnect {
                    relay.set_status(RelayStatus::Terminated, true);
                    tracing::debug!(url = %relay.url, "Reconnection disabled, breaking loop.");
                    break;
                }

                if consecutive_failures >= relay.opts.max_reconnect_attempts {
                    relay.set_status(RelayStatus::Disconnected, true);
                    tracing::warn!(
                        url = %relay.url,
                        attempts = consecutive_failures,
                        "Reconnection attempts exhausted, waiting for explicit connect."
                    );
                    break;
                }

                let interval: Duration = retry_interval(&relay.opts, consecutive_failures);
                relay.set_status(RelayStatus::Reconnecting, false);
                tracing::debug!(
                    "Reconnecting to '{}' relay in {} secs",
                    relay.url,
                    interval.as_secs()
                );

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = relay.handle_terminate(&mut rx_service) => {
                        relay.set_status(RelayStatus::Terminated, true);
                        break;
                    }
                }
            }

            relay.running.store(false, Ordering::SeqCst);

            tracing::debug!(url = %relay.url, "Connection task terminated.");
        });
    }

    async fn handle_terminate(&self, rx_service: &mut watch::Receiver<RelayServiceEvent>) {
        loop {
            if rx_service.changed().await.is_ok() {
                match *rx_service.borrow_and_update() {
                    RelayServiceEvent::None => {}
                    RelayServiceEvent::Terminate => break,
                }
            }
        }
    }

    async fn connect_and_run(&self, timeout: Duration) -> SessionOutcome {
        self.set_status(RelayStatus::Connecting, true);
        self.stats.new_attempt();

        match transport::connect(&self.url, timeout).await {
            Ok((ws_tx, ws_rx, latency)) => {
                self.set_status(RelayStatus::Connected, true);
                self.stats.new_success();
                self.stats.save_latency(latency).await;

                let opened: Instant = Instant::now();
                self.run_message_handler(ws_tx, ws_rx).await;
                self.stats.new_disconnection();

                if opened.elapsed() < FLAPPING_THRESHOLD {
                    SessionOutcome::Flapped
                } else {
                    SessionOutcome::Dropped
                }
            }
            Err(e) => {
                self.set_status(RelayStatus::Disconnected, false);
                tracing::error!("Impossible to connect to '{}': {e}", self.url);
                SessionOutcome::FailedToOpen
            }
        }
    }

    async fn run_message_handler(&self, ws_tx: Sink, ws_rx: Stream) {
        // Restore every known subscription on this fresh session
        if let Err(e) = self.resubscribe().await {
            tracing::error!("Impossible to subscribe to '{}': {e}", self.url);
        }

        tokio::select! {
            _ = self.receiver_message_handler(ws_rx) => {
                tracing::trace!(url = %self.url, "Relay receiver exited.");
            },
            res = self.sender_message_handler(ws_tx) => match res {
                Ok(()) => tracing::trace!(url = %self.url, "Relay sender exited."),
                Err(e) => tracing::error!(url = %self.url, error = %e, "Relay sender exited with error."),
            }
        }
    }

    async fn sender_message_handler(&self, mut ws_tx: Sink) -> Result<(), Error> {
        let mut rx_outgoing = self.channels.rx_outgoing().await;

        while let Some(OutgoingMessage { msgs }) = rx_outgoing.recv().await {
            for msg in msgs.into_iter() {
                let json: String = msg.as_json();
                let size: usize = json.len();

                tracing::trace!("Sending '{json}' to '{}' (size: {size} bytes)", self.url);

                ws_tx
                    .send(WsMessage::Text(json))
                    .await
                    .map_err(transport::Error::WebSocket)?;

                self.stats.add_message_sent(size);
            }
        }

        // Channel closed: shut the socket down
        let _ = ws_tx.close().await;
        Ok(())
    }

    async fn receiver_message_handler(&self, mut ws_rx: Stream) {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => self.handle_raw_relay_message(&text).await,
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => self.handle_raw_relay_message(&text).await,
                    Err(e) => {
                        tracing::warn!(url = %self.url, error = %e, "Received non-UTF8 binary frame.")
                    }
                },
                Ok(WsMessage::Close(..)) => break,
                // Ping/pong are answered by the websocket layer
                Ok(..) => {}
                Err(e) => {
                    tracing::error!(url = %self.url, error = %e, "WebSocket read error.");
                    break;
                }
            }
        }
    }

    async fn handle_raw_relay_message(&self, text: &str) {
        self.stats.add_message_received(text.len());
        tracing::trace!("Received message from '{}': {text}", self.url);

        match RelayMessage::from_json(text) {
            Ok(message) => self.process_relay_message(message).await,
            Err(MessageHandleError::EmptyMsg) => {}
            Err(e) => {
                // Malformed or unknown frame: count, log, drop
                self.stats.new_event_not_validated();
                tracing::warn!(
                    "Impossible to handle relay message from '{}': {e}",
                    self.url
                );
            }
        }
    }

    async fn process_relay_message(&self, message: RelayMessage) {
        match &message {
            RelayMessage::Event {
                subscription_id,
                event,
            } => {
                if let Some(manager) = self.manager.get() {
                    let outcome: DispatchOutcome = manager
                        .dispatch_event(&self.url, subscription_id, (**event).clone())
                        .await;

                    match outcome {
                        DispatchOutcome::Dispatched => self.stats.new_event_validated(),
                        DispatchOutcome::InvalidSignature => {
                            self.stats.new_event_not_validated();
                            // Don't fan the spoofed event out as a notification
                            return;
                        }
                        DispatchOutcome::Duplicate => {}
                    }
                }

                self.send_notification(
                    RelayNotification::Event {
                        subscription_id: subscription_id.clone(),
                        event: event.clone(),
                    },
                    false,
                );
            }
            RelayMessage::Notice(message) => {
                tracing::warn!("Notice from '{}': {message}", self.url)
            }
            RelayMessage::Ok {
                event_id,
                status,
                message,
            } => {
                tracing::debug!(
                    "Received OK from '{}' for event {event_id}: accepted={status}, message={message}",
                    self.url
                );
            }
            RelayMessage::Closed {
                subscription_id,
                message,
            } => {
                tracing::debug!(
                    "Subscription '{subscription_id}' closed by '{}': {message}",
                    self.url
                );
            }
            RelayMessage::Auth { challenge } => {
                tracing::debug!(
                    "Received '{challenge}' authentication challenge from '{}'",
                    self.url
                );
                self.spawn_auth(challenge.clone());
            }
            RelayMessage::EndOfStoredEvents(subscription_id) => {
                if let Some(manager) = self.manager.get() {
                    manager.dispatch_eose(&self.url, subscription_id).await;
                }
            }
            RelayMessage::Count { .. } => {}
        }

        self.send_notification(RelayNotification::Message { message }, false);
    }

    fn spawn_auth(&self, challenge: String) {
        let relay = self.clone();
        tokio::spawn(async move {
            if let Err(e) = relay.handle_auth_challenge(challenge).await {
                tracing::warn!(url = %relay.url, error = %e, "Authentication failed.");
            }
        });
    }

    async fn handle_auth_challenge(&self, challenge: String) -> Result<(), Error> {
        let signer: Option<Arc<dyn NostrSigner>> = self.signer.read().await.clone();

        let signer: Arc<dyn NostrSigner> = match signer {
            Some(signer) => signer,
            None => {
                // No signer: report and stay in AuthRequired
                self.set_status(RelayStatus::AuthRequired, true);
                self.send_notification(RelayNotification::AuthRequired { challenge }, true);
                return Ok(());
            }
        };

        self.set_status(RelayStatus::Authenticating, true);
        self.stats.new_auth_attempt();

        // Sign the kind-22242 response
        let event: Event = EventBuilder::auth(challenge, self.url.clone())
            .sign(&signer)
            .await?;
        let id: EventId = event.id;

        let mut notifications = self.internal_notification_sender.subscribe();
        self.send_msg(ClientMessage::auth(event))?;

        let (_, accepted, message) = self
            .wait_for_ok(&mut notifications, Some(id), AUTH_OK_TIMEOUT)
            .await?;

        if accepted {
            self.set_status(RelayStatus::Authenticated, true);
            self.stats.new_auth_success();
            self.send_notification(RelayNotification::Authenticated, true);

            // The relay may have refused REQs sent before auth
            self.resubscribe().await?;
            Ok(())
        } else {
            self.set_status(RelayStatus::Connected, false);
            Err(Error::Rejected(message))
        }
    }

    async fn wait_for_ok(
        &self,
        notifications: &mut broadcast::Receiver<RelayNotification>,
        id: Option<EventId>,
        timeout: Duration,
    ) -> Result<(EventId, bool, String), Error> {
        tokio::time::timeout(timeout, async {
            while let Ok(notification) = notifications.recv().await {
                match notification {
                    RelayNotification::Message {
                        message:
                            RelayMessage::Ok {
                                event_id,
                                status,
                                message,
                            },
                    } => {
                        let matches: bool = match id {
                            Some(id) => id == event_id,
                            None => true,
                        };
                        if matches {
                            return Ok((event_id, status, message));
                        }
                    }
                    RelayNotification::RelayStatus { status } => {
                        if status.is_disconnected() {
                            return Err(Error::NotConnected);
                        }
                    }
                    RelayNotification::Shutdown => return Err(Error::Shutdown),
                    _ => (),
                }
            }

            Err(Error::NotConnected)
        })
        .await
        .map_err(|_| Error::Timeout)?
    }

    pub fn disconnect(&self) -> Result<(), Error> {
        if !self.status().is_terminated() {
            if self.is_running() {
                self.channels
                    .send_service_msg(RelayServiceEvent::Terminate)?;
            } else {
                // No connection task to react: terminate in place
                self.set_status(RelayStatus::Terminated, true);
            }
            self.send_notification(RelayNotification::Shutdown, false);
        }

        Ok(())
    }

    #[inline]
    pub fn send_msg(&self, msg: ClientMessage) -> Result<(), Error> {
        self.batch_msg(vec![msg])
    }

    pub fn batch_msg(&self, msgs: Vec<ClientMessage>) -> Result<(), Error> {
        let status: RelayStatus = self.status();

        if status.is_initialized() {
            return Err(Error::Initialized);
        }

        if status.is_terminated() {
            return Err(Error::NotConnected);
        }

        self.channels.send_outgoing(OutgoingMessage { msgs })
    }

    /// Transport-send an event. The relay's `OK` arrives asynchronously
    /// and is surfaced through notifications and logs.
    pub fn send_event(&self, event: Event) -> Result<EventId, Error> {
        let id: EventId = event.id;
        self.send_msg(ClientMessage::event(event))?;
        Ok(id)
    }

    /// Register the subscription and send the `REQ` when connected.
    ///
    /// The entry survives reconnects: every new session re-sends it.
    pub async fn subscribe_with_id(
        &self,
        id: SubscriptionId,
        filters: Vec<Filter>,
    ) -> Result<(), Error> {
        if filters.is_empty() {
            return Err(Error::FiltersEmpty);
        }

        let is_new: bool = {
            let mut subscriptions = self.subscriptions.write().await;
            subscriptions.insert(id.clone(), filters.clone()).is_none()
        };

        if is_new {
            self.stats.new_subscription();
        }

        // Best-effort immediate REQ; restoration covers the offline case
        if self.status().is_connected() {
            self.send_msg(ClientMessage::req(id, filters))?;
        }

        Ok(())
    }

    pub async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), Error> {
        let removed: bool = {
            let mut subscriptions = self.subscriptions.write().await;
            subscriptions.remove(id).is_some()
        };

        if removed && self.status().is_connected() {
            self.send_msg(ClientMessage::close(id.clone()))?;
        }

        Ok(())
    }

    pub async fn unsubscribe_all(&self) -> Result<(), Error> {
        let ids: Vec<SubscriptionId> = {
            let mut subscriptions = self.subscriptions.write().await;
            subscriptions.drain().map(|(id, _)| id).collect()
        };

        if self.status().is_connected() {
            for id in ids.into_iter() {
                self.send_msg(ClientMessage::close(id))?;
            }
        }

        Ok(())
    }

    async fn resubscribe(&self) -> Result<(), Error> {
        let subscriptions = self.subscriptions().await;
        for (id, filters) in subscriptions.into_iter() {
            if !filters.is_empty() {
                self.send_msg(ClientMessage::req(id, filters))?;
            }
        }

        Ok(())
    }

    /// `COUNT` round trip
    pub async fn count_events(
        &self,
        filters: Vec<Filter>,
        timeout: Duration,
    ) -> Result<usize, Error> {
        let id = SubscriptionId::generate();
        self.send_msg(ClientMessage::count(id.clone(), filters))?;

        let mut count: usize = 0;

        let mut notifications = self.internal_notification_sender.subscribe();
        tokio::time::timeout(timeout, async {
            while let Ok(notification) = notifications.recv().await {
                if let RelayNotification::Message {
                    message:
                        RelayMessage::Count {
                            subscription_id,
                            count: c,
                        },
                } = notification
                {
                    if subscription_id == id {
                        count = c;
                        break;
                    }
                }
            }
        })
        .await
        .map_err(|_| Error::Timeout)?;

        Ok(count)
    }
}

/// Exponential backoff: `min(initial · 2^min(n, cap), max)` where `n` is
/// the number of consecutive failures.
fn retry_interval(opts: &RelayOptions, consecutive_failures: u32) -> Duration {
    let exp: u32 = cmp::min(consecutive_failures, RETRY_EXPONENT_CAP);
    let interval: Duration = opts.retry_initial_interval.saturating_mul(1 << exp);
    cmp::min(interval, opts.retry_max_interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_interval_doubles_and_clips() {
        let opts = RelayOptions::default();

        assert_eq!(retry_interval(&opts, 1), Duration::from_secs(2));
        assert_eq!(retry_interval(&opts, 2), Duration::from_secs(4));
        assert_eq!(retry_interval(&opts, 3), Duration::from_secs(8));
        assert_eq!(retry_interval(&opts, 4), Duration::from_secs(16));
        assert_eq!(retry_interval(&opts, 5), Duration::from_secs(32));
        // 2^6 = 64s, clipped to the 60s ceiling
        assert_eq!(retry_interval(&opts, 6), Duration::from_secs(60));
        // Exponent capped: no overflow for large counters
        assert_eq!(retry_interval(&opts, 100), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_interval_bounds() {
        let opts = RelayOptions::default();
        for k in 1..=9u32 {
            let interval = retry_interval(&opts, k);
            let lower = cmp::min(
                Duration::from_secs(1 << k.min(RETRY_EXPONENT_CAP)),
                Duration::from_secs(60),
            );
            assert!(interval >= lower);
            assert!(interval <= Duration::from_secs(60));
        }
    }
}
