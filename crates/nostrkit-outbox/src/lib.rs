// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Outbox model
//!
//! Tracks every author's relay list (kind 10002) in memory and computes,
//! for a set of authors, the relays a subscription should attach to so
//! that each author is covered by the configured number of their own
//! write-relays.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

mod selector;
mod tracker;

pub use self::selector::{select_relays, RelaySelection};
pub use self::tracker::OutboxTracker;
