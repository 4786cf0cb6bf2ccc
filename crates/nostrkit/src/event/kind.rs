// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Event kind

use core::fmt;

use serde::{Deserialize, Serialize};

/// Event kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Kind(u16);

impl Kind {
    /// Metadata (NIP-01)
    pub const METADATA: Self = Self(0);
    /// Short text note (NIP-01)
    pub const TEXT_NOTE: Self = Self(1);
    /// Contact list (NIP-02)
    pub const CONTACT_LIST: Self = Self(3);
    /// Reaction (NIP-25)
    pub const REACTION: Self = Self(7);
    /// Seal (NIP-59)
    pub const SEAL: Self = Self(13);
    /// Private direct message rumor (NIP-17)
    pub const PRIVATE_DIRECT_MESSAGE: Self = Self(14);
    /// Gift wrap (NIP-59)
    pub const GIFT_WRAP: Self = Self(1059);
    /// Mute list (NIP-51)
    pub const MUTE_LIST: Self = Self(10_000);
    /// Blocked relays list
    pub const BLOCKED_RELAYS: Self = Self(10_001);
    /// Relay list (NIP-65)
    pub const RELAY_LIST: Self = Self(10_002);
    /// Client authentication (NIP-42)
    pub const AUTHENTICATION: Self = Self(22_242);
    /// Nostr Connect (NIP-46)
    pub const NOSTR_CONNECT: Self = Self(24_133);

    /// Construct from a raw kind number
    #[inline]
    pub const fn new(kind: u16) -> Self {
        Self(kind)
    }

    /// Get the raw kind number
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Replaceable: kind `0`, `3` or `10000..=19999`
    #[inline]
    pub const fn is_replaceable(&self) -> bool {
        matches!(self.0, 0 | 3 | 10_000..=19_999)
    }

    /// Parameterized replaceable: kind `30000..=39999`
    #[inline]
    pub const fn is_parameterized_replaceable(&self) -> bool {
        matches!(self.0, 30_000..=39_999)
    }

    /// Ephemeral: kind `20000..=29999`
    #[inline]
    pub const fn is_ephemeral(&self) -> bool {
        matches!(self.0, 20_000..=29_999)
    }

    /// Regular: neither replaceable nor ephemeral
    #[inline]
    pub const fn is_regular(&self) -> bool {
        !self.is_replaceable() && !self.is_parameterized_replaceable() && !self.is_ephemeral()
    }
}

impl From<u16> for Kind {
    fn from(kind: u16) -> Self {
        Self(kind)
    }
}

impl From<Kind> for u16 {
    fn from(kind: Kind) -> Self {
        kind.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(Kind::METADATA.is_replaceable());
        assert!(Kind::CONTACT_LIST.is_replaceable());
        assert!(Kind::RELAY_LIST.is_replaceable());
        assert!(Kind::new(30_023).is_parameterized_replaceable());
        assert!(Kind::new(20_001).is_ephemeral());
        assert!(Kind::TEXT_NOTE.is_regular());
        assert!(Kind::REACTION.is_regular());
        assert!(!Kind::TEXT_NOTE.is_replaceable());
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&Kind::TEXT_NOTE).unwrap(), "1");
        let k: Kind = serde_json::from_str("10002").unwrap();
        assert_eq!(k, Kind::RELAY_LIST);
    }
}
