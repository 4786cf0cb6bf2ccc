// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Unix timestamps

use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;
use std::num::ParseIntError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get the current unix timestamp
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(now.as_secs())
    }

    /// Timestamp `0`
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Construct from seconds
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Get as seconds
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check if the timestamp is `0`
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs.as_secs()))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_sub(rhs.as_secs()))
    }
}

impl Add<u64> for Timestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<u64> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Timestamp {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ops() {
        let t = Timestamp::from_secs(1_000);
        assert_eq!(t + 60, Timestamp::from_secs(1_060));
        assert_eq!(t - 60, Timestamp::from_secs(940));
        assert_eq!(Timestamp::zero() - 1, Timestamp::zero());
    }

    #[test]
    fn test_timestamp_serde() {
        let t = Timestamp::from_secs(1_612_809_991);
        assert_eq!(serde_json::to_string(&t).unwrap(), "1612809991");
        let t: Timestamp = serde_json::from_str("1612809991").unwrap();
        assert_eq!(t.as_u64(), 1_612_809_991);
    }
}
