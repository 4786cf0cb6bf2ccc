// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use thiserror::Error;

/// [`RelayPool`](super::RelayPool) error
#[derive(Debug, Error)]
pub enum Error {
    /// Url error
    #[error(transparent)]
    Url(#[from] nostrkit::types::url::Error),
    /// Relay error
    #[error(transparent)]
    Relay(#[from] crate::relay::Error),
    /// Relay not present in the pool
    #[error("relay not found")]
    RelayNotFound,
    /// Pool closed while the operation was in flight
    #[error("relay pool is shutdown")]
    Shutdown,
}
