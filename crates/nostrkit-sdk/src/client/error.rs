// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

use thiserror::Error;

/// Client error
#[derive(Debug, Error)]
pub enum Error {
    /// Url error
    #[error(transparent)]
    Url(#[from] nostrkit::types::url::Error),
    /// Relay pool error
    #[error(transparent)]
    Pool(#[from] nostrkit_relay_pool::pool::Error),
    /// Relay error
    #[error(transparent)]
    Relay(#[from] nostrkit_relay_pool::relay::Error),
    /// Signer error
    #[error(transparent)]
    Signer(#[from] nostrkit::SignerError),
    /// Account store error
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// No account for that public key
    #[error("account not found")]
    AccountNotFound,
    /// No active account
    #[error("no active account")]
    NoActiveAccount,
    /// Stored signer payload can't be rehydrated
    #[error("invalid signer payload")]
    InvalidSignerPayload,
}
