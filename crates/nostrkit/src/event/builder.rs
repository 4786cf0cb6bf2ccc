// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Event builder

use super::kind::Kind;
use super::tag::Tag;
use super::unsigned::UnsignedEvent;
use super::{Error, Event};
use crate::key::{Keys, PublicKey};
use crate::nips::nip02::Contact;
use crate::nips::nip65::RelayMetadata;
use crate::signer::{NostrSigner, SignerError};
use crate::types::time::Timestamp;
use crate::types::url::RelayUrl;

/// Event template builder
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: Kind,
    content: String,
    tags: Vec<Tag>,
    custom_created_at: Option<Timestamp>,
}

impl EventBuilder {
    /// New builder for the given kind and content
    pub fn new<S>(kind: Kind, content: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            content: content.into(),
            tags: Vec::new(),
            custom_created_at: None,
        }
    }

    /// Append a tag
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Append tags
    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = Tag>,
    {
        self.tags.extend(tags);
        self
    }

    /// Override `created_at` (defaults to now at build time)
    pub fn custom_created_at(mut self, created_at: Timestamp) -> Self {
        self.custom_created_at = Some(created_at);
        self
    }

    /// Build the unsigned event for `pubkey`
    pub fn build(self, pubkey: PublicKey) -> UnsignedEvent {
        let created_at: Timestamp = self.custom_created_at.unwrap_or_else(Timestamp::now);
        UnsignedEvent::new(pubkey, created_at, self.kind, self.tags, self.content)
    }

    /// Build and sign with local keys
    pub fn sign_with_keys(self, keys: &Keys) -> Result<Event, Error> {
        self.build(keys.public_key()).sign_with_keys(keys)
    }

    /// Build and sign with any [`NostrSigner`]
    pub async fn sign<T>(self, signer: &T) -> Result<Event, SignerError>
    where
        T: NostrSigner,
    {
        let public_key: PublicKey = signer.get_public_key().await?;
        signer.sign_event(self.build(public_key)).await
    }

    /// Text note (kind 1)
    pub fn text_note<S>(content: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(Kind::TEXT_NOTE, content)
    }

    /// Contact list (kind 3)
    pub fn contact_list<I>(contacts: I) -> Self
    where
        I: IntoIterator<Item = Contact>,
    {
        let tags = contacts.into_iter().map(|c| c.into_tag());
        Self::new(Kind::CONTACT_LIST, "").tags(tags)
    }

    /// Relay list (kind 10002, NIP-65)
    pub fn relay_list<I>(relays: I) -> Self
    where
        I: IntoIterator<Item = (RelayUrl, Option<RelayMetadata>)>,
    {
        let tags = relays
            .into_iter()
            .map(|(url, metadata)| Tag::relay_metadata(&url, metadata));
        Self::new(Kind::RELAY_LIST, "").tags(tags)
    }

    /// Blocked relays list (kind 10001)
    pub fn blocked_relays<I>(relays: I) -> Self
    where
        I: IntoIterator<Item = RelayUrl>,
    {
        let tags = relays.into_iter().map(|url| Tag::relay(&url));
        Self::new(Kind::BLOCKED_RELAYS, "").tags(tags)
    }

    /// Relay authentication (kind 22242, NIP-42)
    pub fn auth<S>(challenge: S, relay_url: RelayUrl) -> Self
    where
        S: Into<String>,
    {
        Self::new(Kind::AUTHENTICATION, "")
            .tag(Tag::relay(&relay_url))
            .tag(Tag::challenge(challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_note() {
        let keys = Keys::generate();
        let event = EventBuilder::text_note("gm").sign_with_keys(&keys).unwrap();
        assert_eq!(event.kind, Kind::TEXT_NOTE);
        assert_eq!(event.content, "gm");
        assert!(event.verify().is_ok());
    }

    #[test]
    fn test_relay_list() {
        let keys = Keys::generate();
        let event = EventBuilder::relay_list([
            (RelayUrl::parse("wss://relay.damus.io").unwrap(), None),
            (
                RelayUrl::parse("wss://nos.lol").unwrap(),
                Some(RelayMetadata::Write),
            ),
        ])
        .sign_with_keys(&keys)
        .unwrap();

        assert_eq!(event.kind, Kind::RELAY_LIST);
        assert_eq!(event.tags.len(), 2);
        assert_eq!(event.tags[1].as_slice()[2], "write");
    }

    #[test]
    fn test_auth() {
        let keys = Keys::generate();
        let relay_url = RelayUrl::parse("wss://relay.damus.io").unwrap();
        let event = EventBuilder::auth("abc123", relay_url.clone())
            .sign_with_keys(&keys)
            .unwrap();
        assert_eq!(event.kind, Kind::AUTHENTICATION);
        assert_eq!(event.tag_content("relay"), Some(relay_url.as_str()));
        assert_eq!(event.tag_content("challenge"), Some("abc123"));
    }

    #[test]
    fn test_custom_created_at() {
        let keys = Keys::generate();
        let event = EventBuilder::text_note("old")
            .custom_created_at(Timestamp::from_secs(42))
            .sign_with_keys(&keys)
            .unwrap();
        assert_eq!(event.created_at, Timestamp::from_secs(42));
    }
}
