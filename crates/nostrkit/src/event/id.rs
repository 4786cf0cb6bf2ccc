// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Event id

use core::fmt;
use core::str::FromStr;

use bitcoin_hashes::{sha256, Hash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use super::kind::Kind;
use super::tag::Tag;
use crate::key::PublicKey;
use crate::types::time::Timestamp;

/// Event id error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Hex decoding error
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Invalid byte length
    #[error("invalid event id length")]
    InvalidLength,
}

/// Event id: SHA-256 of the canonical serialization
/// `[0, pubkey, created_at, kind, tags, content]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId([u8; 32]);

impl EventId {
    /// Compute the id of an event
    pub fn new(
        public_key: &PublicKey,
        created_at: &Timestamp,
        kind: &Kind,
        tags: &[Tag],
        content: &str,
    ) -> Self {
        let json: String = json!([0, public_key, created_at, kind, tags, content]).to_string();
        let hash = sha256::Hash::hash(json.as_bytes());
        Self(hash.to_byte_array())
    }

    /// Parse from 64-char hex
    pub fn from_hex<S>(hex: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        let bytes: Vec<u8> = hex::decode(hex.as_ref())?;
        Self::from_slice(&bytes)
    }

    /// Parse from 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidLength)?;
        Ok(Self(bytes))
    }

    /// Construct from a 32-byte array
    #[inline]
    pub const fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consume and return the bytes
    #[inline]
    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Serialize to lowercase hex
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for EventId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex: String = String::deserialize(deserializer)?;
        Self::from_hex(hex).map_err(serde::de::Error::custom)
    }
}
