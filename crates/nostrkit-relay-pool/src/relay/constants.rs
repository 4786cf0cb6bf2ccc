// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use std::time::Duration;

/// First retry delay
pub(super) const RETRY_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
/// Retry delay ceiling
pub(super) const RETRY_MAX_INTERVAL: Duration = Duration::from_secs(60);
/// Exponent cap: `2^6 = 64s`, clipped to the ceiling
pub(super) const RETRY_EXPONENT_CAP: u32 = 6;
/// Consecutive failures after which reconnection stops
pub(super) const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// A session alive for less than this counts as flapping
pub(super) const FLAPPING_THRESHOLD: Duration = Duration::from_secs(1);

/// Default timeout for opening the WebSocket
pub(super) const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
/// How long to wait for the `OK` that answers an `AUTH`
pub(super) const AUTH_OK_TIMEOUT: Duration = Duration::from_secs(10);

/// Outgoing message queue capacity
pub(super) const OUTGOING_QUEUE_SIZE: usize = 1024;
/// Internal notification channel capacity
pub(super) const NOTIFICATION_CHANNEL_SIZE: usize = 2048;
