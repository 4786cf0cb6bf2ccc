// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Subscription filters
//!
//! <https://github.com/nostr-protocol/nips/blob/master/01.md>

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::event::id::EventId;
use crate::event::kind::Kind;
use crate::event::Event;
use crate::key::PublicKey;
use crate::types::time::Timestamp;

type GenericTags = BTreeMap<SingleLetterTag, BTreeSet<String>>;

/// Single-letter tag error
#[derive(Debug, thiserror::Error)]
#[error("invalid single-letter tag")]
pub struct SingleLetterTagError;

/// Single-letter tag name (`a-z`, `A-Z`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SingleLetterTag(char);

impl SingleLetterTag {
    /// `d` tag
    pub const D: Self = Self('d');
    /// `e` tag
    pub const E: Self = Self('e');
    /// `p` tag
    pub const P: Self = Self('p');
    /// `r` tag
    pub const R: Self = Self('r');
    /// `t` tag
    pub const T: Self = Self('t');

    /// Construct from a char
    pub fn from_char(c: char) -> Result<Self, SingleLetterTagError> {
        if c.is_ascii_alphabetic() {
            Ok(Self(c))
        } else {
            Err(SingleLetterTagError)
        }
    }

    /// Construct from a one-char string
    pub fn from_str_exact(s: &str) -> Result<Self, SingleLetterTagError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(SingleLetterTagError),
        }
    }

    /// Get as char
    #[inline]
    pub const fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for SingleLetterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription filter: the logical AND of its populated fields, with
/// OR semantics inside each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Event ids
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub ids: Option<BTreeSet<EventId>>,
    /// Authors
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub authors: Option<BTreeSet<PublicKey>>,
    /// Kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub kinds: Option<BTreeSet<Kind>>,
    /// Events must be newer than this
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub since: Option<Timestamp>,
    /// Events must be older than this
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub until: Option<Timestamp>,
    /// Maximum number of stored events to return
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub limit: Option<usize>,
    /// Generic single-letter tag queries (`#p`, `#e`, ...)
    #[serde(
        flatten,
        serialize_with = "serialize_generic_tags",
        deserialize_with = "deserialize_generic_tags"
    )]
    #[serde(default)]
    pub generic_tags: GenericTags,
}

impl Filter {
    /// New empty filter
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event id
    #[inline]
    pub fn id(self, id: EventId) -> Self {
        self.ids([id])
    }

    /// Add event ids
    pub fn ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = EventId>,
    {
        self.ids.get_or_insert_with(BTreeSet::new).extend(ids);
        self
    }

    /// Add an author
    #[inline]
    pub fn author(self, author: PublicKey) -> Self {
        self.authors([author])
    }

    /// Add authors
    pub fn authors<I>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = PublicKey>,
    {
        self.authors.get_or_insert_with(BTreeSet::new).extend(authors);
        self
    }

    /// Add a kind
    #[inline]
    pub fn kind(self, kind: Kind) -> Self {
        self.kinds([kind])
    }

    /// Add kinds
    pub fn kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = Kind>,
    {
        self.kinds.get_or_insert_with(BTreeSet::new).extend(kinds);
        self
    }

    /// Add an `#e` tag value
    #[inline]
    pub fn event(self, id: EventId) -> Self {
        self.custom_tag(SingleLetterTag::E, id.to_hex())
    }

    /// Add a `#p` tag value
    #[inline]
    pub fn pubkey(self, pubkey: PublicKey) -> Self {
        self.custom_tag(SingleLetterTag::P, pubkey.to_hex())
    }

    /// Add `#p` tag values
    pub fn pubkeys<I>(self, pubkeys: I) -> Self
    where
        I: IntoIterator<Item = PublicKey>,
    {
        self.custom_tags(SingleLetterTag::P, pubkeys.into_iter().map(|p| p.to_hex()))
    }

    /// Add a `#t` tag value
    #[inline]
    pub fn hashtag<S>(self, hashtag: S) -> Self
    where
        S: Into<String>,
    {
        self.custom_tag(SingleLetterTag::T, hashtag)
    }

    /// Add a `#d` tag value
    #[inline]
    pub fn identifier<S>(self, identifier: S) -> Self
    where
        S: Into<String>,
    {
        self.custom_tag(SingleLetterTag::D, identifier)
    }

    /// Add a generic tag value
    pub fn custom_tag<S>(self, tag: SingleLetterTag, value: S) -> Self
    where
        S: Into<String>,
    {
        self.custom_tags(tag, [value])
    }

    /// Add generic tag values
    pub fn custom_tags<I, S>(mut self, tag: SingleLetterTag, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_tags
            .entry(tag)
            .or_default()
            .extend(values.into_iter().map(|v| v.into()));
        self
    }

    /// Set `since`
    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Set `until`
    pub fn until(mut self, until: Timestamp) -> Self {
        self.until = Some(until);
        self
    }

    /// Set `limit`
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if no field is populated
    pub fn is_empty(&self) -> bool {
        self.ids.is_none()
            && self.authors.is_none()
            && self.kinds.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.limit.is_none()
            && self.generic_tags.is_empty()
    }

    /// Check whether the event satisfies every populated field.
    pub fn match_event(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&event.id) {
                return false;
            }
        }

        if let Some(authors) = &self.authors {
            if !authors.contains(&event.pubkey) {
                return false;
            }
        }

        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }

        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }

        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }

        // For every tag constraint, some event tag with that name must
        // carry one of the wanted values in first position.
        for (letter, values) in self.generic_tags.iter() {
            let found: bool = values
                .iter()
                .any(|value| event.has_tag_value(letter, value));
            if !found {
                return false;
            }
        }

        true
    }

    /// Deserialize from JSON
    pub fn from_json<S>(json: S) -> Result<Self, serde_json::Error>
    where
        S: AsRef<str>,
    {
        serde_json::from_str(json.as_ref())
    }

    /// Serialize to JSON
    pub fn as_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn serialize_generic_tags<S>(tags: &GenericTags, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(tags.len()))?;
    for (tag, values) in tags.iter() {
        map.serialize_entry(&format!("#{tag}"), values)?;
    }
    map.end()
}

fn deserialize_generic_tags<'de, D>(deserializer: D) -> Result<GenericTags, D::Error>
where
    D: Deserializer<'de>,
{
    struct GenericTagsVisitor;

    impl<'de> Visitor<'de> for GenericTagsVisitor {
        type Value = GenericTags;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "map with `#`-prefixed single-letter keys")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut generic_tags: GenericTags = BTreeMap::new();
            while let Some(key) = map.next_key::<String>()? {
                match key.strip_prefix('#') {
                    Some(rest) => {
                        let tag = SingleLetterTag::from_str_exact(rest)
                            .map_err(serde::de::Error::custom)?;
                        let values: BTreeSet<String> = map.next_value()?;
                        generic_tags.insert(tag, values);
                    }
                    None => {
                        let _: IgnoredAny = map.next_value()?;
                    }
                }
            }
            Ok(generic_tags)
        }
    }

    deserializer.deserialize_map(GenericTagsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;
    use crate::event::tag::Tag;
    use crate::key::Keys;

    #[test]
    fn test_filter_serialization() {
        let pk = PublicKey::from_hex(
            "379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe",
        )
        .unwrap();

        let filter = Filter::new().kind(Kind::TEXT_NOTE).author(pk).limit(10);
        assert_eq!(
            filter.as_json(),
            r##"{"authors":["379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe"],"kinds":[1],"limit":10}"##
        );

        let filter = Filter::new().pubkey(pk);
        assert_eq!(
            filter.as_json(),
            r##"{"#p":["379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe"]}"##
        );
    }

    #[test]
    fn test_filter_deserialization() {
        let json = r##"{"kinds":[1,7],"#t":["nostr"],"since":1000}"##;
        let filter = Filter::from_json(json).unwrap();
        assert_eq!(
            filter,
            Filter::new()
                .kinds([Kind::TEXT_NOTE, Kind::REACTION])
                .hashtag("nostr")
                .since(Timestamp::from_secs(1000))
        );

        // Round trip
        let again = Filter::from_json(filter.as_json()).unwrap();
        assert_eq!(again, filter);
    }

    #[test]
    fn test_match_event() {
        let keys = Keys::generate();
        let other = Keys::generate();
        let event = EventBuilder::text_note("hello #nostr")
            .tag(Tag::new(["t", "nostr"]))
            .custom_created_at(Timestamp::from_secs(5_000))
            .sign_with_keys(&keys)
            .unwrap();

        assert!(Filter::new().match_event(&event));
        assert!(Filter::new().author(keys.public_key()).match_event(&event));
        assert!(!Filter::new().author(other.public_key()).match_event(&event));
        assert!(Filter::new().kind(Kind::TEXT_NOTE).match_event(&event));
        assert!(!Filter::new().kind(Kind::REACTION).match_event(&event));
        assert!(Filter::new().id(event.id).match_event(&event));
        assert!(Filter::new().hashtag("nostr").match_event(&event));
        assert!(!Filter::new().hashtag("bitcoin").match_event(&event));
        assert!(Filter::new()
            .since(Timestamp::from_secs(4_000))
            .until(Timestamp::from_secs(6_000))
            .match_event(&event));
        assert!(!Filter::new()
            .since(Timestamp::from_secs(6_000))
            .match_event(&event));

        // AND across fields, OR within a field
        assert!(Filter::new()
            .authors([keys.public_key(), other.public_key()])
            .kind(Kind::TEXT_NOTE)
            .match_event(&event));
        assert!(!Filter::new()
            .author(keys.public_key())
            .kind(Kind::REACTION)
            .match_event(&event));
    }
}
