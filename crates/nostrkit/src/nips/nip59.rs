// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-59: Gift wrap
//!
//! Three envelopes: a plaintext rumor (unsigned event), a seal (kind 13,
//! signed by the real sender) and a gift wrap (kind 1059, signed by a
//! one-time key). The outer timestamps are backdated by a random amount
//! to hide timing at the relay level.
//!
//! <https://github.com/nostr-protocol/nips/blob/master/59.md>

use secp256k1::rand::{self, Rng};

use crate::event::builder::EventBuilder;
use crate::event::kind::Kind;
use crate::event::tag::Tag;
use crate::event::unsigned::UnsignedEvent;
use crate::event::Event;
use crate::key::{Keys, PublicKey};
use crate::nips::nip44;
use crate::signer::{NostrSigner, SignerError};
use crate::types::time::Timestamp;

/// Backdating window for seal and gift-wrap timestamps (2 days).
const RANDOM_TIMESTAMP_TWEAK_RANGE: u64 = 2 * 24 * 60 * 60;

/// NIP-59 error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signer error
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// Event error
    #[error(transparent)]
    Event(#[from] crate::event::Error),
    /// NIP-44 error
    #[error(transparent)]
    Nip44(#[from] nip44::Error),
    /// Not a kind-1059 event
    #[error("not a gift wrap")]
    NotGiftWrap,
    /// Inner event is not a kind-13 seal
    #[error("invalid seal")]
    InvalidSeal,
    /// Rumor author doesn't match the seal author
    #[error("rumor sender doesn't match seal author")]
    SenderMismatch,
}

/// Unwrapped gift: the real sender and the plaintext rumor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedGift {
    /// Author of the seal
    pub sender: PublicKey,
    /// Inner unsigned event
    pub rumor: UnsignedEvent,
}

fn backdated_timestamp() -> Timestamp {
    let tweak: u64 = rand::thread_rng().gen_range(0..=RANDOM_TIMESTAMP_TWEAK_RANGE);
    Timestamp::now() - tweak
}

/// Seal a rumor and wrap it for `receiver`.
pub async fn gift_wrap<T>(
    signer: &T,
    receiver: &PublicKey,
    rumor: UnsignedEvent,
) -> Result<Event, Error>
where
    T: NostrSigner,
{
    let sender: PublicKey = signer.get_public_key().await?;

    // Seal: the rumor encrypted sender → receiver, signed by the sender
    let content: String = signer.nip44_encrypt(receiver, &rumor.as_json()).await?;
    let seal: UnsignedEvent = UnsignedEvent::new(
        sender,
        backdated_timestamp(),
        Kind::SEAL,
        Vec::new(),
        content,
    );
    let seal: Event = signer.sign_event(seal).await?;

    // Gift wrap: the seal encrypted with a one-time key
    let ephemeral: Keys = Keys::generate();
    let content: String = nip44::encrypt(ephemeral.secret_key(), receiver, &seal.as_json())?;
    Ok(EventBuilder::new(Kind::GIFT_WRAP, content)
        .tag(Tag::public_key(receiver))
        .custom_created_at(backdated_timestamp())
        .sign_with_keys(&ephemeral)?)
}

/// Unwrap a kind-1059 event addressed to the signer.
pub async fn unwrap_gift_wrap<T>(signer: &T, gift_wrap: &Event) -> Result<UnwrappedGift, Error>
where
    T: NostrSigner,
{
    if gift_wrap.kind != Kind::GIFT_WRAP {
        return Err(Error::NotGiftWrap);
    }

    // Outer layer: one-time key → us
    let seal: String = signer
        .nip44_decrypt(&gift_wrap.pubkey, &gift_wrap.content)
        .await?;
    let seal: Event = Event::from_json(seal)?;
    if seal.kind != Kind::SEAL {
        return Err(Error::InvalidSeal);
    }
    seal.verify().map_err(|_| Error::InvalidSeal)?;

    // Inner layer: sender → us
    let rumor: String = signer.nip44_decrypt(&seal.pubkey, &seal.content).await?;
    let rumor: UnsignedEvent = UnsignedEvent::from_json(rumor).map_err(Error::Event)?;

    // The rumor must be authored by the seal signer
    if rumor.pubkey != seal.pubkey {
        return Err(Error::SenderMismatch);
    }

    Ok(UnwrappedGift {
        sender: seal.pubkey,
        rumor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wrap_and_unwrap() {
        let alice = Keys::generate();
        let bob = Keys::generate();

        let rumor: UnsignedEvent = EventBuilder::new(Kind::PRIVATE_DIRECT_MESSAGE, "psst")
            .tag(Tag::public_key(&bob.public_key()))
            .build(alice.public_key());

        let wrapped: Event = gift_wrap(&alice, &bob.public_key(), rumor.clone())
            .await
            .unwrap();

        // The wrap hides the sender
        assert_eq!(wrapped.kind, Kind::GIFT_WRAP);
        assert_ne!(wrapped.pubkey, alice.public_key());
        assert!(wrapped.verify().is_ok());

        let unwrapped = unwrap_gift_wrap(&bob, &wrapped).await.unwrap();
        assert_eq!(unwrapped.sender, alice.public_key());
        assert_eq!(unwrapped.rumor, rumor);
    }

    #[tokio::test]
    async fn test_unwrap_rejects_other_kinds() {
        let alice = Keys::generate();
        let note = EventBuilder::text_note("not a wrap")
            .sign_with_keys(&alice)
            .unwrap();
        assert!(matches!(
            unwrap_gift_wrap(&alice, &note).await,
            Err(Error::NotGiftWrap)
        ));
    }

    #[tokio::test]
    async fn test_wrong_receiver_cannot_unwrap() {
        let alice = Keys::generate();
        let bob = Keys::generate();
        let eve = Keys::generate();

        let rumor = EventBuilder::text_note("secret").build(alice.public_key());
        let wrapped = gift_wrap(&alice, &bob.public_key(), rumor).await.unwrap();

        assert!(unwrap_gift_wrap(&eve, &wrapped).await.is_err());
    }
}
