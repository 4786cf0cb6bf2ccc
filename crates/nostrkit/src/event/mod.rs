// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Event
//!
//! <https://github.com/nostr-protocol/nips/blob/master/01.md>

use core::cmp::Ordering;
use core::str::FromStr;

use secp256k1::schnorr::Signature;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod builder;
pub mod id;
pub mod kind;
pub mod tag;
pub mod unsigned;

use self::id::EventId;
use self::kind::Kind;
use self::tag::Tag;
use crate::filter::SingleLetterTag;
use crate::key::{self, PublicKey};
use crate::types::time::Timestamp;

/// Event error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Key error
    #[error(transparent)]
    Key(#[from] key::Error),
    /// The id field doesn't match the canonical serialization
    #[error("invalid event id")]
    InvalidId,
    /// The signature doesn't verify
    #[error("invalid signature")]
    InvalidSignature,
}

/// Deduplication key (NIP-01 replaceability)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Regular event, keyed by id
    Id(EventId),
    /// Replaceable event, keyed by `(pubkey, kind)`
    Replaceable(PublicKey, Kind),
    /// Parameterized replaceable event, keyed by `(pubkey, kind, d)`
    ParameterizedReplaceable(PublicKey, Kind, String),
}

/// Signed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Id
    pub id: EventId,
    /// Author
    pub pubkey: PublicKey,
    /// UNIX timestamp (seconds)
    pub created_at: Timestamp,
    /// Kind
    pub kind: Kind,
    /// Tag list
    pub tags: Vec<Tag>,
    /// Content
    pub content: String,
    /// Schnorr signature over the id
    #[serde(
        serialize_with = "serialize_sig",
        deserialize_with = "deserialize_sig"
    )]
    pub sig: Signature,
}

impl Event {
    /// Verify both the id and the signature.
    pub fn verify(&self) -> Result<(), Error> {
        // Recompute the canonical id
        let id: EventId = EventId::new(
            &self.pubkey,
            &self.created_at,
            &self.kind,
            &self.tags,
            &self.content,
        );
        if id != self.id {
            return Err(Error::InvalidId);
        }

        key::verify_schnorr(self.id.to_bytes(), &self.sig, &self.pubkey)
            .map_err(|_| Error::InvalidSignature)
    }

    /// Deserialize from JSON
    pub fn from_json<S>(json: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        Ok(serde_json::from_str(json.as_ref())?)
    }

    /// Serialize to JSON
    pub fn as_json(&self) -> String {
        // Serialization of an already-validated event can't fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Iterate tags with the given name
    pub fn tags_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> {
        self.tags.iter().filter(move |t| t.name() == Some(name))
    }

    /// Get the first value of the first tag with the given name
    pub fn tag_content(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name() == Some(name))
            .and_then(|t| t.content())
    }

    /// Get the `d` tag value
    #[inline]
    pub fn identifier(&self) -> Option<&str> {
        self.tag_content("d")
    }

    /// Check if a tag with name `letter` carries `value` as first value
    pub fn has_tag_value(&self, letter: &SingleLetterTag, value: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.single_letter().as_ref() == Some(letter) && t.content() == Some(value))
    }

    /// Deduplication key per NIP-01 replaceability rules
    pub fn deduplication_key(&self) -> EventKey {
        if self.kind.is_replaceable() {
            EventKey::Replaceable(self.pubkey, self.kind)
        } else if self.kind.is_parameterized_replaceable() {
            EventKey::ParameterizedReplaceable(
                self.pubkey,
                self.kind,
                self.identifier().unwrap_or_default().to_string(),
            )
        } else {
            EventKey::Id(self.id)
        }
    }
}

// Newest first, id as tie-break (stable ordering for event collections)
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.created_at != other.created_at {
            other.created_at.cmp(&self.created_at)
        } else {
            self.id.cmp(&other.id)
        }
    }
}

impl core::hash::Hash for Event {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn serialize_sig<S>(sig: &Signature, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(sig)
}

fn deserialize_sig<'de, D>(deserializer: D) -> Result<Signature, D::Error>
where
    D: Deserializer<'de>,
{
    let hex: String = String::deserialize(deserializer)?;
    Signature::from_str(&hex).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::builder::EventBuilder;
    use super::*;
    use crate::key::Keys;

    #[test]
    fn test_json_round_trip() {
        let json = r#"{"id":"70b10f70c1318967eddf12527799411b1a9780ad9c43858f5e5fcd45486a13a5","pubkey":"379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe","created_at":1612809991,"kind":1,"tags":[],"content":"test","sig":"273a9cd5d11455590f4359500bccb7a89428262b96b3ea87a756b770964472f8c3e87f5d5e64d8d2e859a71462a3f477b554565c4f2f326cb01dd7620db71502"}"#;
        let event = Event::from_json(json).unwrap();
        assert_eq!(event.kind, Kind::TEXT_NOTE);
        assert_eq!(event.content, "test");

        let back = Event::from_json(event.as_json()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_verify_signed_event() {
        let keys = Keys::generate();
        let event = EventBuilder::text_note("hello world")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(event.verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let keys = Keys::generate();
        let mut event = EventBuilder::text_note("hello world")
            .sign_with_keys(&keys)
            .unwrap();
        event.content = String::from("tampered");
        assert!(matches!(event.verify(), Err(Error::InvalidId)));
    }

    #[test]
    fn test_deduplication_key() {
        let keys = Keys::generate();

        let regular = EventBuilder::text_note("note").sign_with_keys(&keys).unwrap();
        assert_eq!(regular.deduplication_key(), EventKey::Id(regular.id));

        let replaceable = EventBuilder::new(Kind::RELAY_LIST, "")
            .sign_with_keys(&keys)
            .unwrap();
        assert_eq!(
            replaceable.deduplication_key(),
            EventKey::Replaceable(keys.public_key(), Kind::RELAY_LIST)
        );

        let param = EventBuilder::new(Kind::new(30_023), "long form")
            .tag(Tag::identifier("my-article"))
            .sign_with_keys(&keys)
            .unwrap();
        assert_eq!(
            param.deduplication_key(),
            EventKey::ParameterizedReplaceable(
                keys.public_key(),
                Kind::new(30_023),
                String::from("my-article")
            )
        );
    }
}
