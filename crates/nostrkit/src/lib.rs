// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Nostr protocol model.
//!
//! Events, keys, filters, client/relay wire messages and the NIP modules
//! used by the rest of the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod event;
pub mod filter;
pub mod key;
pub mod message;
pub mod nips;
pub mod prelude;
pub mod signer;
pub mod types;

pub use self::event::builder::EventBuilder;
pub use self::event::id::EventId;
pub use self::event::kind::Kind;
pub use self::event::tag::Tag;
pub use self::event::unsigned::UnsignedEvent;
pub use self::event::{Event, EventKey};
pub use self::filter::{Filter, SingleLetterTag};
pub use self::key::{Keys, PublicKey, SecretKey};
pub use self::message::{ClientMessage, MessageHandleError, RelayMessage, SubscriptionId};
pub use self::signer::{IntoNostrSigner, NostrSigner, SignerError};
pub use self::types::time::Timestamp;
pub use self::types::url::{RelayUrl, TryIntoRelayUrl};

/// Re-export of [`secp256k1`]
pub use secp256k1;
