// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! X-only public key

use core::fmt;
use core::str::FromStr;

use secp256k1::XOnlyPublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Error;

/// X-only public key (BIP-340)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    inner: XOnlyPublicKey,
}

impl PublicKey {
    /// Parse from 64-char lowercase hex
    pub fn from_hex<S>(hex: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        Ok(Self {
            inner: XOnlyPublicKey::from_str(hex.as_ref())?,
        })
    }

    /// Parse from 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            inner: XOnlyPublicKey::from_slice(bytes)?,
        })
    }

    /// Serialize to 32 bytes
    #[inline]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.serialize()
    }

    /// Serialize to lowercase hex
    #[inline]
    pub fn to_hex(&self) -> String {
        self.inner.to_string()
    }

    #[inline]
    pub(crate) fn into_inner(self) -> XOnlyPublicKey {
        self.inner
    }
}

impl From<XOnlyPublicKey> for PublicKey {
    fn from(inner: XOnlyPublicKey) -> Self {
        Self { inner }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex: String = String::deserialize(deserializer)?;
        Self::from_hex(hex).map_err(serde::de::Error::custom)
    }
}
