// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay status

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Relay connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelayStatus {
    /// Relay created, `connect` never called
    Initialized,
    /// Opening the WebSocket
    Connecting,
    /// Session established
    Connected,
    /// Relay sent an `AUTH` challenge and no signer is configured
    AuthRequired,
    /// Answering an `AUTH` challenge
    Authenticating,
    /// `AUTH` accepted by the relay
    Authenticated,
    /// Sleeping before the next connection attempt
    Reconnecting,
    /// Session dropped right after opening
    Flapping,
    /// Session lost, or reconnection attempts exhausted
    Disconnected,
    /// Completely disconnected, no reconnection
    Terminated,
}

impl RelayStatus {
    /// Check if the session is established (authenticated or not)
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::AuthRequired | Self::Authenticating | Self::Authenticated
        )
    }

    /// Check if disconnected (`disconnected`, `flapping` or `terminated`)
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Flapping | Self::Terminated)
    }

    /// Check if completely disconnected
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Check if `connect` was never called
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Initialized => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::AuthRequired => 3,
            Self::Authenticating => 4,
            Self::Authenticated => 5,
            Self::Reconnecting => 6,
            Self::Flapping => 7,
            Self::Disconnected => 8,
            Self::Terminated => 9,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Initialized,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::AuthRequired,
            4 => Self::Authenticating,
            5 => Self::Authenticated,
            6 => Self::Reconnecting,
            7 => Self::Flapping,
            8 => Self::Disconnected,
            _ => Self::Terminated,
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => write!(f, "Initialized"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::AuthRequired => write!(f, "AuthRequired"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Flapping => write!(f, "Flapping"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Lock-free status cell
#[derive(Debug)]
pub(super) struct AtomicRelayStatus {
    value: AtomicU8,
}

impl Default for AtomicRelayStatus {
    fn default() -> Self {
        Self {
            value: AtomicU8::new(RelayStatus::Initialized.to_u8()),
        }
    }
}

impl AtomicRelayStatus {
    #[inline]
    pub fn set(&self, status: RelayStatus) {
        self.value.store(status.to_u8(), Ordering::SeqCst);
    }

    #[inline]
    pub fn load(&self) -> RelayStatus {
        RelayStatus::from_u8(self.value.load(Ordering::SeqCst))
    }
}
