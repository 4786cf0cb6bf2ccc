// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Account signers and their persistence envelope
//!
//! A signer serializes as a type-tagged payload `{type, data}`; unknown
//! types deserialize to `None` so a forward-compatible store doesn't
//! break older clients. The remote-signer variant rehydrates in two
//! phases: the payload becomes a [`DeferredSigner`] holding configuration
//! only, and `finalize` turns it into a live signer during account
//! restoration.

use std::time::Duration;

use async_trait::async_trait;
use nostrkit::nips::nip46::NostrConnectURI;
use nostrkit::{Event, Keys, NostrSigner, PublicKey, SecretKey, SignerError, UnsignedEvent};
use nostrkit_connect::NostrConnect;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::Error;

/// Payload type tag for local keys
const TYPE_KEYS: &str = "keys";
/// Payload type tag for NIP-46 remote signers
const TYPE_CONNECT: &str = "connect";

/// Signer used by an account
#[derive(Debug, Clone)]
pub enum AccountSigner {
    /// Local secret key
    Keys(Keys),
    /// NIP-46 remote signer
    Connect(NostrConnect),
}

impl From<Keys> for AccountSigner {
    fn from(keys: Keys) -> Self {
        Self::Keys(keys)
    }
}

impl From<NostrConnect> for AccountSigner {
    fn from(connect: NostrConnect) -> Self {
        Self::Connect(connect)
    }
}

impl AccountSigner {
    /// Serialize as a type-tagged envelope
    pub fn to_payload(&self) -> SignerPayload {
        match self {
            Self::Keys(keys) => SignerPayload {
                r#type: TYPE_KEYS.to_string(),
                data: json!({
                    "secret_key": keys.secret_key().to_secret_hex(),
                }),
            },
            Self::Connect(connect) => SignerPayload {
                r#type: TYPE_CONNECT.to_string(),
                data: json!({
                    "uri": connect.uri().to_string(),
                    "app_secret_key": connect.app_keys().secret_key().to_secret_hex(),
                    "timeout_secs": connect.timeout().as_secs(),
                }),
            },
        }
    }
}

#[async_trait]
impl NostrSigner for AccountSigner {
    async fn get_public_key(&self) -> Result<PublicKey, SignerError> {
        match self {
            Self::Keys(keys) => keys.get_public_key().await,
            Self::Connect(connect) => connect.get_public_key().await,
        }
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        match self {
            Self::Keys(keys) => keys.sign_event(unsigned).await,
            Self::Connect(connect) => connect.sign_event(unsigned).await,
        }
    }

    async fn nip44_encrypt(
        &self,
        public_key: &PublicKey,
        content: &str,
    ) -> Result<String, SignerError> {
        match self {
            Self::Keys(keys) => keys.nip44_encrypt(public_key, content).await,
            Self::Connect(connect) => connect.nip44_encrypt(public_key, content).await,
        }
    }

    async fn nip44_decrypt(
        &self,
        public_key: &PublicKey,
        payload: &str,
    ) -> Result<String, SignerError> {
        match self {
            Self::Keys(keys) => keys.nip44_decrypt(public_key, payload).await,
            Self::Connect(connect) => connect.nip44_decrypt(public_key, payload).await,
        }
    }
}

/// Type-tagged signer envelope, the only thing the account store holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerPayload {
    /// Signer type tag
    pub r#type: String,
    /// Signer-specific configuration
    pub data: Value,
}

impl SignerPayload {
    /// Serialize to the opaque store blob
    pub fn to_blob(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from a store blob
    pub fn from_blob(blob: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(blob)?)
    }
}

/// Rehydrated signer configuration, not yet live.
#[derive(Debug)]
pub enum DeferredSigner {
    /// Ready immediately (local keys)
    Ready(AccountSigner),
    /// Remote signer configuration; goes live on [`finalize`](Self::finalize)
    Connect {
        /// Bootstrap URI
        uri: NostrConnectURI,
        /// Local throwaway keys
        app_keys: Keys,
        /// Per-request timeout
        timeout: Duration,
    },
}

impl DeferredSigner {
    /// Dispatch a payload by its type tag.
    ///
    /// Unknown tags yield `None`: entries written by newer clients are
    /// skipped, not fatal.
    pub fn from_payload(payload: &SignerPayload) -> Option<Result<Self, Error>> {
        match payload.r#type.as_str() {
            TYPE_KEYS => Some(Self::keys_from_data(&payload.data)),
            TYPE_CONNECT => Some(Self::connect_from_data(&payload.data)),
            other => {
                tracing::warn!(r#type = other, "Unknown signer payload type, skipping.");
                None
            }
        }
    }

    fn keys_from_data(data: &Value) -> Result<Self, Error> {
        let secret_key: &str = data
            .get("secret_key")
            .and_then(|v| v.as_str())
            .ok_or(Error::InvalidSignerPayload)?;
        let secret_key = SecretKey::from_hex(secret_key).map_err(|_| Error::InvalidSignerPayload)?;
        Ok(Self::Ready(AccountSigner::Keys(Keys::new(secret_key))))
    }

    fn connect_from_data(data: &Value) -> Result<Self, Error> {
        let uri: &str = data
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or(Error::InvalidSignerPayload)?;
        let app_secret_key: &str = data
            .get("app_secret_key")
            .and_then(|v| v.as_str())
            .ok_or(Error::InvalidSignerPayload)?;
        let timeout_secs: u64 = data
            .get("timeout_secs")
            .and_then(|v| v.as_u64())
            .unwrap_or(30);

        let uri = NostrConnectURI::parse(uri).map_err(|_| Error::InvalidSignerPayload)?;
        let app_keys = Keys::new(
            SecretKey::from_hex(app_secret_key).map_err(|_| Error::InvalidSignerPayload)?,
        );

        Ok(Self::Connect {
            uri,
            app_keys,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Turn the configuration into a live signer.
    ///
    /// The remote variant owns a dedicated transport pool and bootstraps
    /// lazily on first use, so finalization itself is cheap.
    pub fn finalize(self) -> Result<AccountSigner, Error> {
        match self {
            Self::Ready(signer) => Ok(signer),
            Self::Connect {
                uri,
                app_keys,
                timeout,
            } => Ok(AccountSigner::Connect(
                NostrConnect::new(uri, app_keys, timeout)
                    .map_err(|_| Error::InvalidSignerPayload)?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_payload_round_trip() {
        let keys = Keys::generate();
        let signer = AccountSigner::Keys(keys.clone());

        let blob = signer.to_payload().to_blob().unwrap();
        let payload = SignerPayload::from_blob(&blob).unwrap();
        assert_eq!(payload.r#type, "keys");

        let deferred = DeferredSigner::from_payload(&payload).unwrap().unwrap();
        match deferred.finalize().unwrap() {
            AccountSigner::Keys(restored) => {
                assert_eq!(restored.public_key(), keys.public_key());
            }
            other => panic!("unexpected signer: {other:?}"),
        }
    }

    #[test]
    fn test_connect_payload_round_trip() {
        let remote = Keys::generate();
        let app_keys = Keys::generate();
        let uri = NostrConnectURI::parse(format!(
            "bunker://{}?relay=wss://relay.nsec.app",
            remote.public_key()
        ))
        .unwrap();
        let signer = AccountSigner::Connect(
            NostrConnect::new(uri.clone(), app_keys.clone(), Duration::from_secs(20)).unwrap(),
        );

        let blob = signer.to_payload().to_blob().unwrap();
        let payload = SignerPayload::from_blob(&blob).unwrap();
        assert_eq!(payload.r#type, "connect");

        // Deferred: configuration only
        let deferred = DeferredSigner::from_payload(&payload).unwrap().unwrap();
        match &deferred {
            DeferredSigner::Connect {
                uri: got_uri,
                app_keys: got_keys,
                timeout,
            } => {
                assert_eq!(got_uri, &uri);
                assert_eq!(got_keys.public_key(), app_keys.public_key());
                assert_eq!(*timeout, Duration::from_secs(20));
            }
            other => panic!("unexpected deferred signer: {other:?}"),
        }

        // Finalize activates it
        match deferred.finalize().unwrap() {
            AccountSigner::Connect(connect) => {
                assert_eq!(connect.uri(), &uri);
            }
            other => panic!("unexpected signer: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_none() {
        let payload = SignerPayload {
            r#type: String::from("hardware-hsm"),
            data: json!({}),
        };
        assert!(DeferredSigner::from_payload(&payload).is_none());
    }

    #[test]
    fn test_malformed_data_is_error_not_panic() {
        let payload = SignerPayload {
            r#type: String::from("keys"),
            data: json!({"secret_key": 42}),
        };
        assert!(DeferredSigner::from_payload(&payload).unwrap().is_err());
    }
}
