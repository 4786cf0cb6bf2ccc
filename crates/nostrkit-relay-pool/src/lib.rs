// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay sessions, relay pool and subscription dispatch.
//!
//! A [`Relay`](crate::relay::Relay) owns one WebSocket session with
//! reconnection and subscription restoration; a
//! [`RelayPool`](crate::pool::RelayPool) owns many relays; the
//! [`SubscriptionManager`](crate::subscriptions::SubscriptionManager) is
//! the single dispatch point that turns inbound frames from every relay
//! into deduplicated per-subscription streams.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]
#![warn(clippy::large_futures)]

pub mod cache;
pub mod pool;
pub mod prelude;
pub mod relay;
pub mod subscriptions;
pub mod transport;

pub use self::cache::{CacheAdapter, CacheError};
pub use self::pool::{AggregateStats, Output, RelayPool, RelayPoolNotification, RelayPoolOptions};
pub use self::relay::{Relay, RelayConnectionStats, RelayNotification, RelayOptions, RelayStatus};
pub use self::subscriptions::{
    DispatchOutcome, EventSource, Subscription, SubscriptionManager, SubscriptionManagerOptions,
    SubscriptionNotification,
};
