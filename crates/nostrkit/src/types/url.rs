// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay URLs
//!
//! Two URLs identify the same relay iff their normalized forms are equal:
//! lowercase, `wss://` scheme added when missing, trailing slash removed.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

/// Relay URL error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Url error
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Unsupported scheme
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// Empty url
    #[error("empty url")]
    Empty,
}

/// Normalized relay URL
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelayUrl(String);

impl RelayUrl {
    /// Parse and normalize a relay URL
    pub fn parse<S>(url: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        let url: &str = url.as_ref().trim();

        if url.is_empty() {
            return Err(Error::Empty);
        }

        let lower: String = url.to_lowercase();

        // Default to `wss://` when the scheme is missing
        let with_scheme: String = if lower.contains("://") {
            lower
        } else {
            format!("wss://{lower}")
        };

        // Validate
        let parsed: Url = Url::parse(&with_scheme)?;
        match parsed.scheme() {
            "wss" | "ws" => {}
            scheme => return Err(Error::UnsupportedScheme(scheme.to_string())),
        }

        // The `url` crate appends a root path: strip trailing slashes
        let mut normalized: String = parsed.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }

        Ok(Self(normalized))
    }

    /// Get as `&str`
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the connection is secure (`wss`)
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.0.starts_with("wss://")
    }
}

impl fmt::Display for RelayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelayUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RelayUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelayUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let url: String = String::deserialize(deserializer)?;
        Self::parse(url).map_err(serde::de::Error::custom)
    }
}

/// Convert types into a [`RelayUrl`]
pub trait TryIntoRelayUrl {
    /// Try to convert into a [`RelayUrl`]
    fn try_into_relay_url(self) -> Result<RelayUrl, Error>;
}

impl TryIntoRelayUrl for RelayUrl {
    #[inline]
    fn try_into_relay_url(self) -> Result<RelayUrl, Error> {
        Ok(self)
    }
}

impl TryIntoRelayUrl for &RelayUrl {
    #[inline]
    fn try_into_relay_url(self) -> Result<RelayUrl, Error> {
        Ok(self.clone())
    }
}

impl TryIntoRelayUrl for &str {
    #[inline]
    fn try_into_relay_url(self) -> Result<RelayUrl, Error> {
        RelayUrl::parse(self)
    }
}

impl TryIntoRelayUrl for String {
    #[inline]
    fn try_into_relay_url(self) -> Result<RelayUrl, Error> {
        RelayUrl::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let url = RelayUrl::parse("WSS://Relay.Damus.io/").unwrap();
        assert_eq!(url.as_str(), "wss://relay.damus.io");

        let url = RelayUrl::parse("relay.damus.io").unwrap();
        assert_eq!(url.as_str(), "wss://relay.damus.io");

        let url = RelayUrl::parse("ws://127.0.0.1:7777").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:7777");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for input in [
            "wss://relay.damus.io",
            "Relay.Nostr.BG///",
            "wss://nos.lol/path/",
        ] {
            let once = RelayUrl::parse(input).unwrap();
            let twice = RelayUrl::parse(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_equality_across_forms() {
        let a = RelayUrl::parse("wss://relay.damus.io").unwrap();
        let b = RelayUrl::parse("WSS://RELAY.DAMUS.IO/").unwrap();
        let c = RelayUrl::parse("relay.damus.io/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_invalid() {
        assert!(RelayUrl::parse("").is_err());
        assert!(RelayUrl::parse("https://example.com").is_err());
    }
}
