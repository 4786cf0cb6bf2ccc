// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use nostrkit::{Kind, MessageHandleError};
use thiserror::Error;

/// [`Relay`](super::Relay) error
#[derive(Debug, Error)]
pub enum Error {
    /// Frame parsing error
    #[error(transparent)]
    MessageHandle(#[from] MessageHandleError),
    /// Event error
    #[error(transparent)]
    Event(#[from] nostrkit::event::Error),
    /// Signer error
    #[error(transparent)]
    Signer(#[from] nostrkit::SignerError),
    /// Transport error
    #[error(transparent)]
    Transport(#[from] crate::transport::Error),
    /// Relay created but `connect` never called
    #[error("relay is initialized but not ready")]
    Initialized,
    /// Relay not connected
    #[error("relay not connected")]
    NotConnected,
    /// Outgoing queue full or connection task gone
    #[error("can't queue message towards the relay")]
    CantQueueMessage,
    /// Received shutdown
    #[error("received shutdown")]
    Shutdown,
    /// Generic timeout
    #[error("timeout")]
    Timeout,
    /// Filters empty
    #[error("filters empty")]
    FiltersEmpty,
    /// Relay rejected the message
    #[error("relay rejected: {0}")]
    Rejected(String),
    /// Unexpected kind
    #[error("unexpected kind: expected={expected}, found={found}")]
    UnexpectedKind {
        /// Expected kind
        expected: Kind,
        /// Found kind
        found: Kind,
    },
    /// No signer configured for AUTH
    #[error("authentication required but no signer is configured")]
    NoSigner,
}
