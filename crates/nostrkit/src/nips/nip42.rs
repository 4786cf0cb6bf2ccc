// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! NIP-42: Authentication of clients to relays
//!
//! <https://github.com/nostr-protocol/nips/blob/master/42.md>

use crate::event::kind::Kind;
use crate::event::Event;
use crate::types::url::RelayUrl;

/// Check if the event is a valid authentication response for the given
/// relay and challenge: kind 22242 with matching `relay` and `challenge`
/// tags.
pub fn is_valid_auth_event(event: &Event, relay_url: &RelayUrl, challenge: &str) -> bool {
    if event.kind != Kind::AUTHENTICATION {
        return false;
    }

    match event.tag_content("relay").map(RelayUrl::parse) {
        Some(Ok(url)) if &url == relay_url => {}
        _ => return false,
    }

    match event.tag_content("challenge") {
        Some(c) if c == challenge => {}
        _ => return false,
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::builder::EventBuilder;
    use crate::key::Keys;

    #[test]
    fn test_valid_auth_event() {
        let keys = Keys::generate();
        let relay_url = RelayUrl::parse("wss://relay.damus.io").unwrap();
        let challenge = "1234567890";

        let event = EventBuilder::auth(challenge, relay_url.clone())
            .sign_with_keys(&keys)
            .unwrap();

        assert!(is_valid_auth_event(&event, &relay_url, challenge));
    }

    #[test]
    fn test_invalid_auth_event() {
        let keys = Keys::generate();
        let relay_url = RelayUrl::parse("wss://relay.damus.io").unwrap();
        let challenge = "1234567890";

        // Wrong challenge
        let event = EventBuilder::auth("abcd", relay_url.clone())
            .sign_with_keys(&keys)
            .unwrap();
        assert!(!is_valid_auth_event(&event, &relay_url, challenge));

        // Wrong relay url
        let event = EventBuilder::auth(challenge, RelayUrl::parse("wss://example.com").unwrap())
            .sign_with_keys(&keys)
            .unwrap();
        assert!(!is_valid_auth_event(&event, &relay_url, challenge));

        // Wrong kind
        let event = EventBuilder::text_note("abcd")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(!is_valid_auth_event(&event, &relay_url, challenge));
    }
}
