// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Subscription id

use core::fmt;

use secp256k1::rand::{self, Rng};
use serde::{Deserialize, Serialize};

/// Client-generated subscription id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Construct from an arbitrary string
    pub fn new<S>(id: S) -> Self
    where
        S: Into<String>,
    {
        Self(id.into())
    }

    /// Generate a fresh `sub-<random>` id
    pub fn generate() -> Self {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        Self(format!("sub-{}", hex::encode(bytes)))
    }

    /// Get as `&str`
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
