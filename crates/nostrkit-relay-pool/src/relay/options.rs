// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay options

use std::time::Duration;

use super::constants::{MAX_RECONNECT_ATTEMPTS, RETRY_INITIAL_INTERVAL, RETRY_MAX_INTERVAL};

/// Relay session options
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Automatically reconnect after a lost session
    pub reconnect: bool,
    /// First retry delay (doubled on every consecutive failure)
    pub retry_initial_interval: Duration,
    /// Retry delay ceiling
    pub retry_max_interval: Duration,
    /// Consecutive failures after which reconnection stops until an
    /// explicit `connect()`
    pub max_reconnect_attempts: u32,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            retry_initial_interval: RETRY_INITIAL_INTERVAL,
            retry_max_interval: RETRY_MAX_INTERVAL,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl RelayOptions {
    /// New with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable automatic reconnection
    pub fn reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }
}
