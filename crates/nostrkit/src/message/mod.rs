// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Client and relay wire messages
//!
//! <https://github.com/nostr-protocol/nips/blob/master/01.md>

mod client;
mod relay;
mod subscription;

pub use self::client::ClientMessage;
pub use self::relay::RelayMessage;
pub use self::subscription::SubscriptionId;

/// Frame parsing error
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MessageHandleError {
    /// Not a JSON array or wrong arity/field types
    #[error("malformed frame")]
    MalformedFrame,
    /// Json deserialization failed
    #[error("json deserialization failed")]
    Json,
    /// Message type not known to this client
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    /// Empty frame
    #[error("empty frame")]
    EmptyMsg,
}
