// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Keys
//!
//! BIP-340 x-only keys, Schnorr signing and ECDH.

use core::fmt;

use bitcoin_hashes::{sha256, Hash};
use secp256k1::rand::thread_rng;
use secp256k1::schnorr::Signature;
use secp256k1::{ecdh, Keypair, Message, Parity, XOnlyPublicKey, SECP256K1};

mod public_key;
mod secret_key;

pub use self::public_key::PublicKey;
pub use self::secret_key::SecretKey;

/// Key error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
    /// Hex decoding error
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Invalid byte length
    #[error("invalid key length")]
    InvalidLength,
}

/// Nostr keys: a secret key with its derived x-only public key.
#[derive(Clone)]
pub struct Keys {
    public_key: PublicKey,
    secret_key: SecretKey,
    key_pair: Keypair,
}

impl Keys {
    /// Construct from a secret key
    pub fn new(secret_key: SecretKey) -> Self {
        let key_pair: Keypair = Keypair::from_secret_key(SECP256K1, secret_key.as_inner());
        let (public_key, _parity) = key_pair.x_only_public_key();

        Self {
            public_key: PublicKey::from(public_key),
            secret_key,
            key_pair,
        }
    }

    /// Generate new random keys
    pub fn generate() -> Self {
        let secret_key = secp256k1::SecretKey::new(&mut thread_rng());
        Self::new(SecretKey::from(secret_key))
    }

    /// Parse secret key from hex
    pub fn parse(secret_key: &str) -> Result<Self, Error> {
        Ok(Self::new(SecretKey::from_hex(secret_key)?))
    }

    /// Get the public key
    #[inline]
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Get the secret key
    #[inline]
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Schnorr-sign a 32-byte digest
    pub fn sign_schnorr(&self, digest: [u8; 32]) -> Signature {
        let message: Message = Message::from_digest(digest);
        SECP256K1.sign_schnorr(&message, &self.key_pair)
    }
}

impl PartialEq for Keys {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for Keys {}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Verify a Schnorr signature over a 32-byte digest.
pub fn verify_schnorr(
    digest: [u8; 32],
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<(), Error> {
    let message: Message = Message::from_digest(digest);
    let public_key: XOnlyPublicKey = public_key.into_inner();
    SECP256K1.verify_schnorr(signature, &message, &public_key)?;
    Ok(())
}

/// Compute the shared secret: SHA-256 of the x-coordinate of `sk·pk`.
pub fn shared_secret(secret_key: &SecretKey, public_key: &PublicKey) -> [u8; 32] {
    let public_key: secp256k1::PublicKey =
        secp256k1::PublicKey::from_x_only_public_key(public_key.into_inner(), Parity::Even);
    let point: [u8; 64] = ecdh::shared_secret_point(&public_key, secret_key.as_inner());
    let hash = sha256::Hash::hash(&point[..32]);
    hash.to_byte_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_sign() {
        let keys = Keys::generate();
        let digest: [u8; 32] = [7u8; 32];
        let sig = keys.sign_schnorr(digest);
        assert!(verify_schnorr(digest, &sig, &keys.public_key()).is_ok());

        // Different digest must not verify
        assert!(verify_schnorr([8u8; 32], &sig, &keys.public_key()).is_err());
    }

    #[test]
    fn test_parse_hex() {
        let keys = Keys::parse("aa4fc8665f5696e33db7e1a572e3b0f5b3d615837b0f362dcb1c8068b098c7b4")
            .unwrap();
        let other = Keys::new(keys.secret_key().clone());
        assert_eq!(keys.public_key(), other.public_key());
    }

    #[test]
    fn test_shared_secret_is_symmetric() {
        let a = Keys::generate();
        let b = Keys::generate();

        let ab = shared_secret(a.secret_key(), &b.public_key());
        let ba = shared_secret(b.secret_key(), &a.public_key());
        assert_eq!(ab, ba);
    }
}
