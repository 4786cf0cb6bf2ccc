// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Unsigned event

use secp256k1::schnorr::Signature;
use serde::{Deserialize, Serialize};

use super::id::EventId;
use super::kind::Kind;
use super::tag::Tag;
use super::{Error, Event};
use crate::key::{self, Keys, PublicKey};
use crate::types::time::Timestamp;

/// Event template waiting for a signature.
///
/// The id is already computed over the canonical serialization, so signing
/// only produces the Schnorr signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
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
}

impl UnsignedEvent {
    /// Construct, computing the id.
    pub fn new(
        pubkey: PublicKey,
        created_at: Timestamp,
        kind: Kind,
        tags: Vec<Tag>,
        content: String,
    ) -> Self {
        let id: EventId = EventId::new(&pubkey, &created_at, &kind, &tags, &content);
        Self {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
        }
    }

    /// Sign with local keys.
    pub fn sign_with_keys(self, keys: &Keys) -> Result<Event, Error> {
        let sig: Signature = keys.sign_schnorr(self.id.to_bytes());
        self.add_signature(sig)
    }

    /// Attach an externally produced signature, verifying it.
    pub fn add_signature(self, sig: Signature) -> Result<Event, Error> {
        key::verify_schnorr(self.id.to_bytes(), &sig, &self.pubkey)
            .map_err(|_| Error::InvalidSignature)?;

        Ok(Event {
            id: self.id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
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
        serde_json::to_string(self).unwrap_or_default()
    }
}
