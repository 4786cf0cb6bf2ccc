// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! High-level Nostr client.
//!
//! Wires the relay pools, the subscription manager, the outbox tracker
//! and the session engine into one [`Client`]: outbox-aware
//! subscriptions, best-effort multi-relay publishing, multi-account
//! sessions with pluggable signers and persistence.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]
#![warn(clippy::large_futures)]

pub mod client;
pub mod prelude;
pub mod session;
pub mod signer;
pub mod store;

pub use self::client::{Client, ClientBuilder, Error, Login, Options};
pub use self::session::CurrentUser;
pub use self::signer::{AccountSigner, DeferredSigner, SignerPayload};
pub use self::store::{AccountStore, MemoryAccountStore, StoreError};
