// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-02: Contact List
//!
//! <https://github.com/nostr-protocol/nips/blob/master/02.md>

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::event::tag::Tag;
use crate::event::Event;
use crate::key::PublicKey;
use crate::nips::nip65::RelayMetadata;
use crate::types::url::RelayUrl;

/// Contact list entry: `["p", <pubkey>, <relay>?, <petname>?]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Followed public key
    pub public_key: PublicKey,
    /// Optional relay hint
    pub relay_url: Option<RelayUrl>,
    /// Optional petname
    pub alias: Option<String>,
}

impl Contact {
    /// New contact with just a public key
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            relay_url: None,
            alias: None,
        }
    }

    /// Convert into a `p` tag
    pub fn into_tag(self) -> Tag {
        let mut buf: Vec<String> = vec![String::from("p"), self.public_key.to_hex()];
        if self.relay_url.is_some() || self.alias.is_some() {
            buf.push(
                self.relay_url
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
            );
        }
        if let Some(alias) = self.alias {
            buf.push(alias);
        }
        Tag::new(buf)
    }
}

/// Extract the contacts from the `p` tags of a kind-3 event.
pub fn extract_contacts(event: &Event) -> Vec<Contact> {
    event
        .tags_by_name("p")
        .filter_map(|tag| {
            let buf: &[String] = tag.as_slice();
            let public_key: PublicKey = PublicKey::from_hex(buf.get(1)?).ok()?;
            Some(Contact {
                public_key,
                relay_url: buf.get(2).and_then(|u| RelayUrl::parse(u).ok()),
                alias: buf.get(3).cloned().filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

/// Extract the set of followed public keys.
pub fn extract_follow_keys(event: &Event) -> BTreeSet<PublicKey> {
    event
        .tags_by_name("p")
        .filter_map(|tag| PublicKey::from_hex(tag.content()?).ok())
        .collect()
}

#[derive(Deserialize)]
struct LegacyRelayHint {
    #[serde(default)]
    read: bool,
    #[serde(default)]
    write: bool,
}

/// Parse the legacy relay hints carried in kind-3 `content`:
/// a JSON object `{"<url>": {"read": bool, "write": bool}, ...}`.
pub fn extract_relay_hints(content: &str) -> Vec<(RelayUrl, Option<RelayMetadata>)> {
    let map: HashMap<String, LegacyRelayHint> = match serde_json::from_str(content) {
        Ok(map) => map,
        Err(_) => return Vec::new(),
    };

    map.into_iter()
        .filter_map(|(url, hint)| {
            let url: RelayUrl = RelayUrl::parse(&url).ok()?;
            let metadata: Option<RelayMetadata> = match (hint.read, hint.write) {
                (true, false) => Some(RelayMetadata::Read),
                (false, true) => Some(RelayMetadata::Write),
                _ => None,
            };
            Some((url, metadata))
        })
        .collect()
}
