// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Signer abstraction
//!
//! Anything that can expose a public key, sign event templates and run
//! NIP-44 encryption on behalf of that key.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::unsigned::UnsignedEvent;
use crate::event::Event;
use crate::key::{Keys, PublicKey};
use crate::nips::nip44;

/// Opaque signer error
#[derive(Debug)]
pub struct SignerError(Box<dyn std::error::Error + Send + Sync>);

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SignerError {}

impl SignerError {
    /// Wrap a backend error
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

/// Signer abstraction
#[async_trait]
pub trait NostrSigner: fmt::Debug + Send + Sync {
    /// Get the signer public key
    async fn get_public_key(&self) -> Result<PublicKey, SignerError>;

    /// Sign an unsigned event
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError>;

    /// NIP-44 encrypt `content` for `public_key`
    async fn nip44_encrypt(
        &self,
        public_key: &PublicKey,
        content: &str,
    ) -> Result<String, SignerError>;

    /// NIP-44 decrypt `payload` from `public_key`
    async fn nip44_decrypt(
        &self,
        public_key: &PublicKey,
        payload: &str,
    ) -> Result<String, SignerError>;
}

#[doc(hidden)]
pub trait IntoNostrSigner {
    fn into_nostr_signer(self) -> Arc<dyn NostrSigner>;
}

impl<T> IntoNostrSigner for T
where
    T: NostrSigner + 'static,
{
    fn into_nostr_signer(self) -> Arc<dyn NostrSigner> {
        Arc::new(self)
    }
}

#[async_trait]
impl NostrSigner for Arc<dyn NostrSigner> {
    #[inline]
    async fn get_public_key(&self) -> Result<PublicKey, SignerError> {
        self.as_ref().get_public_key().await
    }

    #[inline]
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.as_ref().sign_event(unsigned).await
    }

    #[inline]
    async fn nip44_encrypt(
        &self,
        public_key: &PublicKey,
        content: &str,
    ) -> Result<String, SignerError> {
        self.as_ref().nip44_encrypt(public_key, content).await
    }

    #[inline]
    async fn nip44_decrypt(
        &self,
        public_key: &PublicKey,
        payload: &str,
    ) -> Result<String, SignerError> {
        self.as_ref().nip44_decrypt(public_key, payload).await
    }
}

#[async_trait]
impl NostrSigner for Keys {
    async fn get_public_key(&self) -> Result<PublicKey, SignerError> {
        Ok(self.public_key())
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        unsigned.sign_with_keys(self).map_err(SignerError::backend)
    }

    async fn nip44_encrypt(
        &self,
        public_key: &PublicKey,
        content: &str,
    ) -> Result<String, SignerError> {
        nip44::encrypt(self.secret_key(), public_key, content).map_err(SignerError::backend)
    }

    async fn nip44_decrypt(
        &self,
        public_key: &PublicKey,
        payload: &str,
    ) -> Result<String, SignerError> {
        nip44::decrypt(self.secret_key(), public_key, payload).map_err(SignerError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;

    #[tokio::test]
    async fn test_keys_signer() {
        let keys = Keys::generate();
        let signer: Arc<dyn NostrSigner> = keys.clone().into_nostr_signer();

        assert_eq!(signer.get_public_key().await.unwrap(), keys.public_key());

        let event = EventBuilder::text_note("signed via trait")
            .sign(&signer)
            .await
            .unwrap();
        assert!(event.verify().is_ok());
    }
}
