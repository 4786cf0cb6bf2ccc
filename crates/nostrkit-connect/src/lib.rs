// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Remote signing over encrypted Nostr events (NIP-46).
//!
//! A [`NostrConnect`] signer owns a local throwaway key and a dedicated
//! pool of transport relays; every [`NostrSigner`](nostrkit::NostrSigner)
//! capability call becomes an encrypted kind-24133 request matched to its
//! response by id.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

mod client;
mod error;

pub use self::client::NostrConnect;
pub use self::error::Error;
