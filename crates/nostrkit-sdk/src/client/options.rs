// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Client options

use std::time::Duration;

use nostrkit::RelayUrl;

/// Default discovery relays seeding the outbox pool
pub const DEFAULT_DISCOVERY_RELAYS: [&str; 2] = ["wss://purplepag.es", "wss://relay.nos.social"];

/// How many of an author's write-relays a subscription aims to cover
const DEFAULT_RELAY_GOAL_PER_AUTHOR: usize = 2;
/// Cap for each relay-list fetch attempt against one pool
const DEFAULT_OUTBOX_FETCH_TIMEOUT: Duration = Duration::from_secs(4);
/// Lifetime of relays added just to serve a subscription
const DEFAULT_TEMPORARY_RELAY_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Client options
#[derive(Debug, Clone)]
pub struct Options {
    /// Route subscriptions by the outbox model
    pub outbox: bool,
    /// Write-relay coverage goal per author
    pub relay_goal_per_author: usize,
    /// Relays seeding the discovery pool
    pub discovery_relays: Vec<RelayUrl>,
    /// Per-pool cap when fetching a relay list
    pub outbox_fetch_timeout: Duration,
    /// Idle timeout for temporary relays
    pub temporary_relay_idle_timeout: Duration,
    /// Verify event signatures on dispatch
    pub verify_events: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            outbox: true,
            relay_goal_per_author: DEFAULT_RELAY_GOAL_PER_AUTHOR,
            discovery_relays: DEFAULT_DISCOVERY_RELAYS
                .iter()
                .filter_map(|u| RelayUrl::parse(u).ok())
                .collect(),
            outbox_fetch_timeout: DEFAULT_OUTBOX_FETCH_TIMEOUT,
            temporary_relay_idle_timeout: DEFAULT_TEMPORARY_RELAY_IDLE_TIMEOUT,
            verify_events: true,
        }
    }
}

impl Options {
    /// New with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable outbox routing
    pub fn outbox(mut self, outbox: bool) -> Self {
        self.outbox = outbox;
        self
    }

    /// Set the coverage goal per author
    pub fn relay_goal_per_author(mut self, goal: usize) -> Self {
        self.relay_goal_per_author = goal;
        self
    }

    /// Replace the discovery relays
    pub fn discovery_relays<I>(mut self, relays: I) -> Self
    where
        I: IntoIterator<Item = RelayUrl>,
    {
        self.discovery_relays = relays.into_iter().collect();
        self
    }

    /// Enable or disable signature verification on dispatch
    pub fn verify_events(mut self, verify: bool) -> Self {
        self.verify_events = verify;
        self
    }
}
