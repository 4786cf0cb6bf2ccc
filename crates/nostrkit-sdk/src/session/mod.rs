// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Session engine
//!
//! The logged-in identity's live view over its own replaceable events.
//! A standing subscription filtered on the user's pubkey feeds
//! [`CurrentUser::handle_event`], which keeps one newest-wins slot per
//! kind: follows (kind 3), mutes (10000), blocked relays (10001), relay
//! list (10002) and any registered extra kind.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use nostrkit::nips::nip02;
use nostrkit::nips::nip51::MuteList;
use nostrkit::nips::nip65::RelayList;
use nostrkit::{
    Event, Kind, NostrSigner, PublicKey, RelayUrl, SignerError, SubscriptionId, Timestamp,
    UnsignedEvent,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::signer::AccountSigner;

/// Kinds the session subscription always follows
pub const BASE_SESSION_KINDS: [Kind; 4] = [
    Kind::CONTACT_LIST,
    Kind::MUTE_LIST,
    Kind::BLOCKED_RELAYS,
    Kind::RELAY_LIST,
];

#[derive(Debug)]
pub(crate) struct SessionHandle {
    pub subscription_id: SubscriptionId,
    pub listener: JoinHandle<()>,
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[derive(Debug)]
struct SessionState {
    follows: watch::Sender<BTreeSet<PublicKey>>,
    mutes: watch::Sender<MuteList>,
    relay_list: watch::Sender<RelayList>,
    blocked_relays: watch::Sender<HashSet<RelayUrl>>,
    /// Latest event per registered extra kind
    session_events: watch::Sender<HashMap<Kind, Event>>,
    /// Newest-wins guard, one timestamp per kind
    last_seen: Mutex<HashMap<Kind, Timestamp>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            follows: watch::channel(BTreeSet::new()).0,
            mutes: watch::channel(MuteList::default()).0,
            relay_list: watch::channel(RelayList::default()).0,
            blocked_relays: watch::channel(HashSet::new()).0,
            session_events: watch::channel(HashMap::new()).0,
            last_seen: Mutex::new(HashMap::new()),
        }
    }
}

/// A logged-in identity
#[derive(Debug, Clone)]
pub struct CurrentUser {
    public_key: PublicKey,
    signer: Arc<AccountSigner>,
    /// Extra kinds this session follows beyond the base set
    extra_kinds: BTreeSet<Kind>,
    state: Arc<SessionState>,
    pub(crate) session: Arc<Mutex<Option<SessionHandle>>>,
}

impl CurrentUser {
    pub(crate) fn new(
        public_key: PublicKey,
        signer: AccountSigner,
        extra_kinds: BTreeSet<Kind>,
    ) -> Self {
        Self {
            public_key,
            signer: Arc::new(signer),
            extra_kinds,
            state: Arc::new(SessionState::default()),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// The identity's public key
    #[inline]
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// The account signer
    #[inline]
    pub fn signer(&self) -> &AccountSigner {
        &self.signer
    }

    /// Kinds the session subscription follows
    pub fn session_kinds(&self) -> BTreeSet<Kind> {
        let mut kinds: BTreeSet<Kind> = BASE_SESSION_KINDS.into_iter().collect();
        kinds.extend(self.extra_kinds.iter().copied());
        kinds
    }

    /// Thin passthrough to the signer
    pub async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.signer.sign_event(unsigned).await
    }

    /// Observable set of followed public keys
    pub fn follows(&self) -> watch::Receiver<BTreeSet<PublicKey>> {
        self.state.follows.subscribe()
    }

    /// Observable mute list
    pub fn mutes(&self) -> watch::Receiver<MuteList> {
        self.state.mutes.subscribe()
    }

    /// Observable relay list
    pub fn relay_list(&self) -> watch::Receiver<RelayList> {
        self.state.relay_list.subscribe()
    }

    /// Observable set of blocked relays
    pub fn blocked_relays(&self) -> watch::Receiver<HashSet<RelayUrl>> {
        self.state.blocked_relays.subscribe()
    }

    /// Observable map of the latest event per registered extra kind
    pub fn session_events(&self) -> watch::Receiver<HashMap<Kind, Event>> {
        self.state.session_events.subscribe()
    }

    /// Id of the standing session subscription, when started
    pub async fn session_subscription_id(&self) -> Option<SubscriptionId> {
        let session = self.session.lock().await;
        session.as_ref().map(|s| s.subscription_id.clone())
    }

    pub(crate) async fn stop_session(&self) -> Option<SubscriptionId> {
        let mut session = self.session.lock().await;
        // Dropping the handle aborts the listener
        session.take().map(|s| s.subscription_id.clone())
    }

    /// Feed one event from the standing subscription.
    ///
    /// Events by other authors are ignored; per kind, only an event newer
    /// than the last applied one changes the state (processing `{a, b}`
    /// in any order ends in the same state).
    pub async fn handle_event(&self, event: &Event) {
        if event.pubkey != self.public_key {
            return;
        }

        // Newest-wins per kind
        {
            let mut last_seen = self.state.last_seen.lock().await;
            match last_seen.get(&event.kind) {
                Some(last) if event.created_at <= *last => return,
                _ => {
                    last_seen.insert(event.kind, event.created_at);
                }
            }
        }

        match event.kind {
            Kind::CONTACT_LIST => {
                let follows: BTreeSet<PublicKey> = nip02::extract_follow_keys(event);
                let _ = self.state.follows.send(follows);
            }
            Kind::MUTE_LIST => {
                let _ = self.state.mutes.send(MuteList::from_event(event));
            }
            Kind::RELAY_LIST => {
                let _ = self.state.relay_list.send(RelayList::from_event(event));
            }
            Kind::BLOCKED_RELAYS => {
                let blocked: HashSet<RelayUrl> = event
                    .tags_by_name("relay")
                    .filter_map(|t| RelayUrl::parse(t.content()?).ok())
                    .collect();
                let _ = self.state.blocked_relays.send(blocked);
            }
            kind if self.extra_kinds.contains(&kind) => {
                self.state.session_events.send_modify(|events| {
                    events.insert(kind, event.clone());
                });
            }
            kind => {
                tracing::debug!(%kind, "Unexpected kind on session subscription.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nostrkit::nips::nip02::Contact;
    use nostrkit::{EventBuilder, Keys, Tag};

    use super::*;

    fn user(keys: &Keys) -> CurrentUser {
        CurrentUser::new(
            keys.public_key(),
            AccountSigner::Keys(keys.clone()),
            BTreeSet::new(),
        )
    }

    fn contact_list(keys: &Keys, follows: &[PublicKey], created_at: u64) -> Event {
        EventBuilder::contact_list(follows.iter().map(|pk| Contact::new(*pk)))
            .custom_created_at(Timestamp::from_secs(created_at))
            .sign_with_keys(keys)
            .unwrap()
    }

    #[tokio::test]
    async fn test_newest_contact_list_wins_in_any_order() {
        let keys = Keys::generate();
        let a = Keys::generate().public_key();
        let b = Keys::generate().public_key();
        let c = Keys::generate().public_key();

        let ev1 = contact_list(&keys, &[a, b], 1_000);
        let ev2 = contact_list(&keys, &[c], 2_000);

        for order in [[&ev1, &ev2], [&ev2, &ev1]] {
            let user = user(&keys);
            for event in order {
                user.handle_event(event).await;
            }

            let follows = user.follows().borrow().clone();
            assert_eq!(follows, [c].into_iter().collect::<BTreeSet<_>>());
        }
    }

    #[tokio::test]
    async fn test_foreign_events_ignored() {
        let keys = Keys::generate();
        let stranger = Keys::generate();
        let user = user(&keys);

        let foreign = contact_list(&stranger, &[stranger.public_key()], 1_000);
        user.handle_event(&foreign).await;

        assert!(user.follows().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_newest_wins_is_per_kind() {
        let keys = Keys::generate();
        let user = user(&keys);

        // A newer mute list must not shadow an older contact list
        let mutes = EventBuilder::new(Kind::MUTE_LIST, "")
            .tag(Tag::new(["word", "spam"]))
            .custom_created_at(Timestamp::from_secs(5_000))
            .sign_with_keys(&keys)
            .unwrap();
        let contacts = contact_list(&keys, &[keys.public_key()], 1_000);

        user.handle_event(&mutes).await;
        user.handle_event(&contacts).await;

        assert_eq!(user.follows().borrow().len(), 1);
        assert!(user.mutes().borrow().words.contains("spam"));
    }

    #[tokio::test]
    async fn test_blocked_relays_slot() {
        let keys = Keys::generate();
        let user = user(&keys);

        let event = EventBuilder::blocked_relays([
            RelayUrl::parse("wss://bad.example.com").unwrap(),
        ])
        .sign_with_keys(&keys)
        .unwrap();
        user.handle_event(&event).await;

        let blocked = user.blocked_relays().borrow().clone();
        assert!(blocked.contains(&RelayUrl::parse("wss://bad.example.com").unwrap()));
    }

    #[tokio::test]
    async fn test_registered_extra_kind() {
        let keys = Keys::generate();
        let kind = Kind::new(10_015);
        let user = CurrentUser::new(
            keys.public_key(),
            AccountSigner::Keys(keys.clone()),
            [kind].into_iter().collect(),
        );
        assert!(user.session_kinds().contains(&kind));

        let event = EventBuilder::new(kind, "")
            .tag(Tag::new(["t", "rust"]))
            .sign_with_keys(&keys)
            .unwrap();
        user.handle_event(&event).await;

        let events = user.session_events().borrow().clone();
        assert_eq!(events.get(&kind).map(|e| e.id), Some(event.id));
    }

    #[tokio::test]
    async fn test_relay_list_slot_newest_wins() {
        let keys = Keys::generate();
        let user = user(&keys);

        let newer = EventBuilder::relay_list([(
            RelayUrl::parse("wss://new.example.com").unwrap(),
            None,
        )])
        .custom_created_at(Timestamp::from_secs(2_000))
        .sign_with_keys(&keys)
        .unwrap();
        let older = EventBuilder::relay_list([(
            RelayUrl::parse("wss://old.example.com").unwrap(),
            None,
        )])
        .custom_created_at(Timestamp::from_secs(1_000))
        .sign_with_keys(&keys)
        .unwrap();

        user.handle_event(&newer).await;
        user.handle_event(&older).await;

        let list = user.relay_list().borrow().clone();
        assert!(list
            .map
            .contains_key(&RelayUrl::parse("wss://new.example.com").unwrap()));
        assert_eq!(list.map.len(), 1);
    }
}
