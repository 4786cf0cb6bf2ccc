// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Event tag
//!
//! An ordered list of strings; the first entry is the tag name, the rest
//! are positional values.

use serde::{Deserialize, Serialize};

use super::id::EventId;
use crate::filter::SingleLetterTag;
use crate::key::PublicKey;
use crate::nips::nip65::RelayMetadata;
use crate::types::url::RelayUrl;

/// Event tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag {
    buf: Vec<String>,
}

impl Tag {
    /// Construct from parts
    pub fn new<I, S>(buf: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buf: buf.into_iter().map(|s| s.into()).collect(),
        }
    }

    /// Get the tag name (first entry)
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.buf.first().map(|s| s.as_str())
    }

    /// Get the tag content (second entry)
    #[inline]
    pub fn content(&self) -> Option<&str> {
        self.buf.get(1).map(|s| s.as_str())
    }

    /// Get as slice of strings
    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.buf
    }

    /// Get the single-letter form of the tag name, if any
    pub fn single_letter(&self) -> Option<SingleLetterTag> {
        let name: &str = self.name()?;
        SingleLetterTag::from_str_exact(name).ok()
    }

    /// `["p", <pubkey>]`
    pub fn public_key(public_key: &PublicKey) -> Self {
        Self::new(["p".to_string(), public_key.to_hex()])
    }

    /// `["e", <event-id>]`
    pub fn event(id: &EventId) -> Self {
        Self::new(["e".to_string(), id.to_hex()])
    }

    /// `["d", <identifier>]`
    pub fn identifier<S>(identifier: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(["d".to_string(), identifier.into()])
    }

    /// `["relay", <url>]`
    pub fn relay(url: &RelayUrl) -> Self {
        Self::new(["relay".to_string(), url.to_string()])
    }

    /// `["challenge", <challenge>]`
    pub fn challenge<S>(challenge: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(["challenge".to_string(), challenge.into()])
    }

    /// `["r", <url>]` or `["r", <url>, "read"|"write"]` (NIP-65)
    pub fn relay_metadata(url: &RelayUrl, metadata: Option<RelayMetadata>) -> Self {
        match metadata {
            Some(metadata) => Self::new(["r".to_string(), url.to_string(), metadata.to_string()]),
            None => Self::new(["r".to_string(), url.to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serde() {
        let tag = Tag::new(["p", "379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe"]);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(
            json,
            r#"["p","379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe"]"#
        );
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn test_accessors() {
        let url = RelayUrl::parse("wss://relay.damus.io").unwrap();
        let tag = Tag::relay_metadata(&url, Some(RelayMetadata::Write));
        assert_eq!(tag.name(), Some("r"));
        assert_eq!(tag.content(), Some("wss://relay.damus.io"));
        assert_eq!(tag.as_slice().get(2).map(|s| s.as_str()), Some("write"));
    }

    #[test]
    fn test_single_letter() {
        assert!(Tag::new(["p", "abc"]).single_letter().is_some());
        assert!(Tag::new(["relay", "wss://x"]).single_letter().is_none());
    }
}
