// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use thiserror::Error;

/// Nostr Connect error
#[derive(Debug, Error)]
pub enum Error {
    /// NIP-46 message error
    #[error(transparent)]
    Nip46(#[from] nostrkit::nips::nip46::Error),
    /// NIP-44 payload error
    #[error(transparent)]
    Nip44(#[from] nostrkit::nips::nip44::Error),
    /// Event error
    #[error(transparent)]
    Event(#[from] nostrkit::event::Error),
    /// Pool error
    #[error(transparent)]
    Pool(#[from] nostrkit_relay_pool::pool::Error),
    /// Relay error
    #[error(transparent)]
    Relay(#[from] nostrkit_relay_pool::relay::Error),
    /// Signer error
    #[error(transparent)]
    Signer(#[from] nostrkit::SignerError),
    /// The remote signer answered with an error
    #[error("response error: {0}")]
    Response(String),
    /// The response carried neither result nor error
    #[error("empty response")]
    EmptyResponse,
    /// Request timed out
    #[error("timeout")]
    Timeout,
    /// The URI carries no transport relays
    #[error("no relays in nostr connect uri")]
    NoRelays,
    /// A `nostrconnect://` URI must match the local app keys
    #[error("public key in uri doesn't match app keys")]
    PublicKeyNotMatchAppKeys,
}
