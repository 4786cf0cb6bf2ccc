// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-65: Relay List Metadata
//!
//! <https://github.com/nostr-protocol/nips/blob/master/65.md>

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

use crate::event::Event;
use crate::types::url::RelayUrl;

/// NIP-65 error
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid relay metadata marker
    #[error("invalid relay metadata: {0}")]
    InvalidRelayMetadata(String),
}

/// Relay usage marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelayMetadata {
    /// Read relay
    Read,
    /// Write relay
    Write,
}

impl fmt::Display for RelayMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

impl FromStr for RelayMetadata {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            s => Err(Error::InvalidRelayMetadata(s.to_string())),
        }
    }
}

/// Relay list: url → marker (absent marker means read **and** write)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayList {
    /// Relay urls with their markers
    pub map: HashMap<RelayUrl, Option<RelayMetadata>>,
}

impl RelayList {
    /// Extract from a kind-10002 event.
    ///
    /// Tags that don't parse as `["r", <url>, <marker>?]` are skipped.
    pub fn from_event(event: &Event) -> Self {
        Self {
            map: extract_relay_list(event).into_iter().collect(),
        }
    }

    /// Relays the author writes to
    pub fn write_relays(&self) -> Vec<RelayUrl> {
        self.map
            .iter()
            .filter(|(_, m)| !matches!(m, Some(RelayMetadata::Read)))
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Relays the author reads from
    pub fn read_relays(&self) -> Vec<RelayUrl> {
        self.map
            .iter()
            .filter(|(_, m)| !matches!(m, Some(RelayMetadata::Write)))
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Check if the list is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Extract `(url, marker)` pairs from the `r` tags of an event.
pub fn extract_relay_list(event: &Event) -> Vec<(RelayUrl, Option<RelayMetadata>)> {
    event
        .tags_by_name("r")
        .filter_map(|tag| {
            let url: RelayUrl = RelayUrl::parse(tag.content()?).ok()?;
            let metadata: Option<RelayMetadata> = match tag.as_slice().get(2) {
                Some(marker) => Some(RelayMetadata::from_str(marker).ok()?),
                None => None,
            };
            Some((url, metadata))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;
    use crate::key::Keys;

    fn relay_list_event() -> Event {
        let keys = Keys::generate();
        EventBuilder::relay_list([
            (RelayUrl::parse("wss://relay.damus.io").unwrap(), None),
            (
                RelayUrl::parse("wss://nos.lol").unwrap(),
                Some(RelayMetadata::Write),
            ),
            (
                RelayUrl::parse("wss://nostr.mom").unwrap(),
                Some(RelayMetadata::Read),
            ),
        ])
        .sign_with_keys(&keys)
        .unwrap()
    }

    #[test]
    fn test_extract_relay_list() {
        let event = relay_list_event();
        let list = extract_relay_list(&event);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_write_and_read_relays() {
        let list = RelayList::from_event(&relay_list_event());

        let mut write: Vec<String> = list
            .write_relays()
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        write.sort();
        assert_eq!(write, ["wss://nos.lol", "wss://relay.damus.io"]);

        let mut read: Vec<String> = list
            .read_relays()
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        read.sort();
        assert_eq!(read, ["wss://nostr.mom", "wss://relay.damus.io"]);
    }

    #[test]
    fn test_bad_marker_skipped() {
        let keys = Keys::generate();
        let event = EventBuilder::new(crate::event::kind::Kind::RELAY_LIST, "")
            .tag(crate::event::tag::Tag::new(["r", "wss://ok.example", "write"]))
            .tag(crate::event::tag::Tag::new(["r", "wss://bad.example", "banana"]))
            .sign_with_keys(&keys)
            .unwrap();

        let list = RelayList::from_event(&event);
        assert_eq!(list.map.len(), 1);
    }
}
