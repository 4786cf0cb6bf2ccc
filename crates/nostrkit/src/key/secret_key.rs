// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Secret key

use core::fmt;
use core::str::FromStr;

use super::Error;

/// Secret key
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    inner: secp256k1::SecretKey,
}

impl SecretKey {
    /// Parse from 64-char hex
    pub fn from_hex<S>(hex: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        Ok(Self {
            inner: secp256k1::SecretKey::from_str(hex.as_ref())?,
        })
    }

    /// Parse from 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            inner: secp256k1::SecretKey::from_slice(bytes)?,
        })
    }

    /// Serialize to 32 bytes
    #[inline]
    pub fn to_secret_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    /// Serialize to lowercase hex
    #[inline]
    pub fn to_secret_hex(&self) -> String {
        hex::encode(self.to_secret_bytes())
    }

    #[inline]
    pub(crate) fn as_inner(&self) -> &secp256k1::SecretKey {
        &self.inner
    }
}

impl From<secp256k1::SecretKey> for SecretKey {
    fn from(inner: secp256k1::SecretKey) -> Self {
        Self { inner }
    }
}

// Never leak the secret in logs
impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

impl FromStr for SecretKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
