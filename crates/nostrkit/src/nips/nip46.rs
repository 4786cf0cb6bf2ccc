// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-46: Nostr Connect
//!
//! Request/response messages carried in encrypted kind-24133 events, and
//! the `bunker://` / `nostrconnect://` bootstrap URIs.
//!
//! <https://github.com/nostr-protocol/nips/blob/master/46.md>

use core::fmt;

use secp256k1::rand::{self, Rng};
use serde_json::{json, Value};
use url::Url;

use crate::event::unsigned::UnsignedEvent;
use crate::event::Event;
use crate::key::PublicKey;
use crate::types::url::RelayUrl;

/// NIP-46 error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Event error
    #[error(transparent)]
    Event(#[from] crate::event::Error),
    /// Key error
    #[error(transparent)]
    Key(#[from] crate::key::Error),
    /// Malformed message
    #[error("invalid nostr connect message")]
    InvalidMessage,
    /// Method not supported
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    /// Malformed URI
    #[error("invalid nostr connect uri")]
    InvalidUri,
    /// Response carried an unexpected payload
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Signer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `connect`
    Connect {
        /// Remote signer public key
        public_key: PublicKey,
        /// Optional connection secret
        secret: Option<String>,
    },
    /// `get_public_key`
    GetPublicKey,
    /// `sign_event`
    SignEvent(Box<UnsignedEvent>),
    /// `nip44_encrypt`
    Nip44Encrypt {
        /// Counterparty
        public_key: PublicKey,
        /// Plaintext
        text: String,
    },
    /// `nip44_decrypt`
    Nip44Decrypt {
        /// Counterparty
        public_key: PublicKey,
        /// Payload
        ciphertext: String,
    },
    /// `ping`
    Ping,
}

impl Request {
    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::GetPublicKey => "get_public_key",
            Self::SignEvent(..) => "sign_event",
            Self::Nip44Encrypt { .. } => "nip44_encrypt",
            Self::Nip44Decrypt { .. } => "nip44_decrypt",
            Self::Ping => "ping",
        }
    }

    fn params(&self) -> Vec<String> {
        match self {
            Self::Connect { public_key, secret } => {
                let mut params = vec![public_key.to_hex()];
                if let Some(secret) = secret {
                    params.push(secret.clone());
                }
                params
            }
            Self::GetPublicKey | Self::Ping => Vec::new(),
            Self::SignEvent(unsigned) => vec![unsigned.as_json()],
            Self::Nip44Encrypt { public_key, text } => {
                vec![public_key.to_hex(), text.clone()]
            }
            Self::Nip44Decrypt {
                public_key,
                ciphertext,
            } => vec![public_key.to_hex(), ciphertext.clone()],
        }
    }

    fn from_parts(method: &str, params: Vec<String>) -> Result<Self, Error> {
        let mut params = params.into_iter();
        match method {
            "connect" => {
                let public_key: PublicKey =
                    PublicKey::from_hex(params.next().ok_or(Error::InvalidMessage)?)?;
                Ok(Self::Connect {
                    public_key,
                    secret: params.next().filter(|s| !s.is_empty()),
                })
            }
            "get_public_key" => Ok(Self::GetPublicKey),
            "sign_event" => {
                let unsigned: UnsignedEvent =
                    UnsignedEvent::from_json(params.next().ok_or(Error::InvalidMessage)?)?;
                Ok(Self::SignEvent(Box::new(unsigned)))
            }
            "nip44_encrypt" => Ok(Self::Nip44Encrypt {
                public_key: PublicKey::from_hex(params.next().ok_or(Error::InvalidMessage)?)?,
                text: params.next().ok_or(Error::InvalidMessage)?,
            }),
            "nip44_decrypt" => Ok(Self::Nip44Decrypt {
                public_key: PublicKey::from_hex(params.next().ok_or(Error::InvalidMessage)?)?,
                ciphertext: params.next().ok_or(Error::InvalidMessage)?,
            }),
            "ping" => Ok(Self::Ping),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Nostr Connect message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request
    Request {
        /// Request id, echoed in the response
        id: String,
        /// Request
        req: Request,
    },
    /// Response
    Response {
        /// Request id this responds to
        id: String,
        /// Raw result payload (interpretation depends on the request)
        result: Option<String>,
        /// Error message
        error: Option<String>,
    },
}

impl Message {
    /// New request with a random id
    pub fn request(req: Request) -> Self {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        Self::Request {
            id: hex::encode(bytes),
            req,
        }
    }

    /// New response
    pub fn response<S>(id: S, result: Option<String>, error: Option<String>) -> Self
    where
        S: Into<String>,
    {
        Self::Response {
            id: id.into(),
            result,
            error,
        }
    }

    /// Get the message id
    pub fn id(&self) -> &str {
        match self {
            Self::Request { id, .. } => id,
            Self::Response { id, .. } => id,
        }
    }

    /// Serialize to JSON
    pub fn as_json(&self) -> String {
        match self {
            Self::Request { id, req } => json!({
                "id": id,
                "method": req.method(),
                "params": req.params(),
            })
            .to_string(),
            Self::Response { id, result, error } => json!({
                "id": id,
                "result": result,
                "error": error,
            })
            .to_string(),
        }
    }

    /// Deserialize from JSON
    pub fn from_json<S>(json: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        let value: Value = serde_json::from_str(json.as_ref())?;
        let id: String = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(Error::InvalidMessage)?
            .to_string();

        match value.get("method").and_then(|m| m.as_str()) {
            Some(method) => {
                let params: Vec<String> = value
                    .get("params")
                    .and_then(|p| p.as_array())
                    .map(|a| {
                        a.iter()
                            .filter_map(|v| v.as_str().map(|s| s.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Self::Request {
                    id,
                    req: Request::from_parts(method, params)?,
                })
            }
            None => Ok(Self::Response {
                id,
                result: value
                    .get("result")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                error: value
                    .get("error")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            }),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_json())
    }
}

/// Interpret a raw response payload as a signed event.
pub fn response_to_event(result: &str) -> Result<Event, Error> {
    Ok(Event::from_json(result)?)
}

/// Interpret a raw response payload as a public key.
pub fn response_to_public_key(result: &str) -> Result<PublicKey, Error> {
    Ok(PublicKey::from_hex(result)?)
}

/// Nostr Connect bootstrap URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NostrConnectURI {
    /// `bunker://`, signer-initiated
    Bunker {
        /// Remote signer public key
        remote_signer_public_key: PublicKey,
        /// Transport relays
        relays: Vec<RelayUrl>,
        /// Connection secret
        secret: Option<String>,
    },
    /// `nostrconnect://`, client-initiated
    Client {
        /// Client public key
        public_key: PublicKey,
        /// Transport relays
        relays: Vec<RelayUrl>,
        /// Connection secret
        secret: Option<String>,
        /// App name
        name: Option<String>,
    },
}

impl NostrConnectURI {
    /// Parse a `bunker://` or `nostrconnect://` URI
    pub fn parse<S>(uri: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        let url: Url = Url::parse(uri.as_ref()).map_err(|_| Error::InvalidUri)?;

        let public_key: PublicKey = url
            .host_str()
            .and_then(|h| PublicKey::from_hex(h).ok())
            .ok_or(Error::InvalidUri)?;

        let mut relays: Vec<RelayUrl> = Vec::new();
        let mut secret: Option<String> = None;
        let mut name: Option<String> = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "relay" => {
                    relays.push(RelayUrl::parse(value.as_ref()).map_err(|_| Error::InvalidUri)?)
                }
                "secret" => secret = Some(value.to_string()),
                "name" => name = Some(value.to_string()),
                _ => {}
            }
        }

        match url.scheme() {
            "bunker" => Ok(Self::Bunker {
                remote_signer_public_key: public_key,
                relays,
                secret,
            }),
            "nostrconnect" => Ok(Self::Client {
                public_key,
                relays,
                secret,
                name,
            }),
            _ => Err(Error::InvalidUri),
        }
    }

    /// Transport relays
    pub fn relays(&self) -> &[RelayUrl] {
        match self {
            Self::Bunker { relays, .. } => relays,
            Self::Client { relays, .. } => relays,
        }
    }

    /// Connection secret
    pub fn secret(&self) -> Option<&str> {
        match self {
            Self::Bunker { secret, .. } => secret.as_deref(),
            Self::Client { secret, .. } => secret.as_deref(),
        }
    }

    /// Remote signer public key, if already known
    pub fn remote_signer_public_key(&self) -> Option<&PublicKey> {
        match self {
            Self::Bunker {
                remote_signer_public_key,
                ..
            } => Some(remote_signer_public_key),
            Self::Client { .. } => None,
        }
    }

    /// Check if this is a `bunker://` URI
    #[inline]
    pub fn is_bunker(&self) -> bool {
        matches!(self, Self::Bunker { .. })
    }
}

impl fmt::Display for NostrConnectURI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scheme, public_key, relays, secret, name) = match self {
            Self::Bunker {
                remote_signer_public_key,
                relays,
                secret,
            } => ("bunker", remote_signer_public_key, relays, secret, &None),
            Self::Client {
                public_key,
                relays,
                secret,
                name,
            } => ("nostrconnect", public_key, relays, secret, name),
        };

        write!(f, "{scheme}://{public_key}?")?;
        let mut first: bool = true;
        for relay in relays.iter() {
            if !first {
                write!(f, "&")?;
            }
            write!(f, "relay={relay}")?;
            first = false;
        }
        if let Some(secret) = secret {
            if !first {
                write!(f, "&")?;
            }
            write!(f, "secret={secret}")?;
            first = false;
        }
        if let Some(name) = name {
            if !first {
                write!(f, "&")?;
            }
            write!(f, "name={name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;
    use crate::key::Keys;
    use crate::types::time::Timestamp;

    #[test]
    fn test_request_round_trip() {
        let keys = Keys::generate();
        let unsigned = EventBuilder::text_note("sign me")
            .custom_created_at(Timestamp::from_secs(1_700_000_000))
            .build(keys.public_key());

        let msg = Message::request(Request::SignEvent(Box::new(unsigned.clone())));
        let parsed = Message::from_json(msg.as_json()).unwrap();

        match parsed {
            Message::Request {
                req: Request::SignEvent(got),
                ..
            } => assert_eq!(*got, unsigned),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_response_round_trip() {
        let msg = Message::response("abcd", Some(String::from("ack")), None);
        let parsed = Message::from_json(msg.as_json()).unwrap();
        assert_eq!(parsed, msg);

        let msg = Message::response("abcd", None, Some(String::from("denied")));
        let parsed = Message::from_json(msg.as_json()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_bunker_uri() {
        let pk = Keys::generate().public_key();
        let uri = format!(
            "bunker://{pk}?relay=wss://relay.nsec.app&relay=wss://nos.lol&secret=s3cr3t"
        );
        let parsed = NostrConnectURI::parse(&uri).unwrap();

        assert!(parsed.is_bunker());
        assert_eq!(parsed.remote_signer_public_key(), Some(&pk));
        assert_eq!(parsed.relays().len(), 2);
        assert_eq!(parsed.secret(), Some("s3cr3t"));

        // Display round trip
        let again = NostrConnectURI::parse(parsed.to_string()).unwrap();
        assert_eq!(again, parsed);
    }

    #[test]
    fn test_client_uri() {
        let pk = Keys::generate().public_key();
        let uri = format!("nostrconnect://{pk}?relay=wss://relay.nsec.app&name=MyApp");
        let parsed = NostrConnectURI::parse(uri).unwrap();

        assert!(!parsed.is_bunker());
        assert!(parsed.remote_signer_public_key().is_none());
        match parsed {
            NostrConnectURI::Client {
                public_key, name, ..
            } => {
                assert_eq!(public_key, pk);
                assert_eq!(name.as_deref(), Some("MyApp"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_invalid_uri() {
        assert!(NostrConnectURI::parse("https://example.com").is_err());
        assert!(NostrConnectURI::parse("bunker://nothex").is_err());
    }
}
