// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-51: Mute list
//!
//! <https://github.com/nostr-protocol/nips/blob/master/51.md>

use std::collections::BTreeSet;

use crate::event::id::EventId;
use crate::event::Event;
use crate::key::PublicKey;

/// Mute list: flat sets extracted from a kind-10000 event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteList {
    /// Muted authors (`p` tags)
    pub public_keys: BTreeSet<PublicKey>,
    /// Muted events (`e` tags)
    pub event_ids: BTreeSet<EventId>,
    /// Muted hashtags (`t` tags)
    pub hashtags: BTreeSet<String>,
    /// Muted words (`word` tags)
    pub words: BTreeSet<String>,
}

impl MuteList {
    /// Extract from a kind-10000 event.
    pub fn from_event(event: &Event) -> Self {
        let mut list = Self::default();

        for tag in event.tags.iter() {
            let Some(content) = tag.content() else {
                continue;
            };

            match tag.name() {
                Some("p") => {
                    if let Ok(pk) = PublicKey::from_hex(content) {
                        list.public_keys.insert(pk);
                    }
                }
                Some("e") => {
                    if let Ok(id) = EventId::from_hex(content) {
                        list.event_ids.insert(id);
                    }
                }
                Some("t") => {
                    list.hashtags.insert(content.to_lowercase());
                }
                Some("word") => {
                    list.words.insert(content.to_lowercase());
                }
                _ => {}
            }
        }

        list
    }

    /// Check whether an event is muted: authored by a muted key, a muted
    /// event id, carrying a muted hashtag, or containing a muted word
    /// (case-insensitive substring).
    pub fn is_muted(&self, event: &Event) -> bool {
        if self.public_keys.contains(&event.pubkey) || self.event_ids.contains(&event.id) {
            return true;
        }

        if event.tags_by_name("t").any(|t| {
            t.content()
                .map(|c| self.hashtags.contains(&c.to_lowercase()))
                .unwrap_or(false)
        }) {
            return true;
        }

        if !self.words.is_empty() {
            let content: String = event.content.to_lowercase();
            if self.words.iter().any(|w| content.contains(w.as_str())) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;
    use crate::event::kind::Kind;
    use crate::event::tag::Tag;
    use crate::key::Keys;

    #[test]
    fn test_extract_and_match() {
        let me = Keys::generate();
        let spammer = Keys::generate();

        let mute_event = EventBuilder::new(Kind::MUTE_LIST, "")
            .tag(Tag::public_key(&spammer.public_key()))
            .tag(Tag::new(["t", "Promo"]))
            .tag(Tag::new(["word", "Airdrop"]))
            .sign_with_keys(&me)
            .unwrap();

        let list = MuteList::from_event(&mute_event);
        assert_eq!(list.public_keys.len(), 1);
        assert!(list.hashtags.contains("promo"));
        assert!(list.words.contains("airdrop"));

        // Muted author
        let spam = EventBuilder::text_note("gm").sign_with_keys(&spammer).unwrap();
        assert!(list.is_muted(&spam));

        // Muted word, case-insensitive substring
        let keys = Keys::generate();
        let note = EventBuilder::text_note("Huge AIRDROP happening now")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(list.is_muted(&note));

        // Clean note
        let ok = EventBuilder::text_note("good morning")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(!list.is_muted(&ok));
    }
}
