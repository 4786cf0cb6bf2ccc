// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-44 (v2): Encrypted payloads
//!
//! Conversation key is `sha256(x-coordinate of ECDH(sk, pk))`; payload is
//! `base64(0x02 ‖ nonce24 ‖ ciphertext)` with XChaCha20-Poly1305.

use base64::engine::{general_purpose, Engine};
use chacha20poly1305::aead::{Aead, OsRng};
use chacha20poly1305::{AeadCore, KeyInit, XChaCha20Poly1305, XNonce};

use crate::key::{self, PublicKey, SecretKey};

/// Payload version byte
const VERSION: u8 = 0x02;
/// XChaCha20 nonce size
const NONCE_SIZE: usize = 24;
/// Poly1305 tag size
const TAG_SIZE: usize = 16;

/// NIP-44 error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64 decoding error
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    /// Payload too short or otherwise malformed
    #[error("invalid payload")]
    InvalidPayload,
    /// Version byte not supported
    #[error("unsupported payload version: {0}")]
    UnsupportedVersion(u8),
    /// AEAD failure (wrong key or corrupted ciphertext)
    #[error("decryption failed")]
    Aead,
    /// UTF-8 decoding error
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn cipher(secret_key: &SecretKey, public_key: &PublicKey) -> XChaCha20Poly1305 {
    let conversation_key: [u8; 32] = key::shared_secret(secret_key, public_key);
    XChaCha20Poly1305::new(&conversation_key.into())
}

/// Encrypt `plaintext` from `secret_key` to `public_key`.
pub fn encrypt(
    secret_key: &SecretKey,
    public_key: &PublicKey,
    plaintext: &str,
) -> Result<String, Error> {
    let cipher: XChaCha20Poly1305 = cipher(secret_key, public_key);
    let nonce: XNonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext: Vec<u8> = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| Error::Aead)?;

    let mut payload: Vec<u8> = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    payload.push(VERSION);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);

    Ok(general_purpose::STANDARD.encode(payload))
}

/// Decrypt `payload` sent to `secret_key` by `public_key`.
pub fn decrypt(
    secret_key: &SecretKey,
    public_key: &PublicKey,
    payload: &str,
) -> Result<String, Error> {
    let payload: Vec<u8> = general_purpose::STANDARD.decode(payload)?;

    if payload.len() < 1 + NONCE_SIZE + TAG_SIZE {
        return Err(Error::InvalidPayload);
    }

    let version: u8 = payload[0];
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let nonce: &XNonce = XNonce::from_slice(&payload[1..1 + NONCE_SIZE]);
    let ciphertext: &[u8] = &payload[1 + NONCE_SIZE..];

    let cipher: XChaCha20Poly1305 = cipher(secret_key, public_key);
    let plaintext: Vec<u8> = cipher.decrypt(nonce, ciphertext).map_err(|_| Error::Aead)?;

    Ok(String::from_utf8(plaintext)?)
}
