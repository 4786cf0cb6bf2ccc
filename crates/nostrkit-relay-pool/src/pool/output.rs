// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Per-relay operation outcome

use std::collections::{HashMap, HashSet};

use nostrkit::RelayUrl;

/// Output of a multi-relay operation: which relays took it, which
/// refused and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output<T> {
    /// Operation-specific value (e.g. the event id of a publish)
    pub val: T,
    /// Relays that accepted
    pub success: HashSet<RelayUrl>,
    /// Relays that failed, with the reason
    pub failed: HashMap<RelayUrl, String>,
}

impl<T> Output<T> {
    /// New empty output around a value
    pub fn new(val: T) -> Self {
        Self {
            val,
            success: HashSet::new(),
            failed: HashMap::new(),
        }
    }

    /// Check if at least one relay accepted
    #[inline]
    pub fn any_success(&self) -> bool {
        !self.success.is_empty()
    }
}

impl Default for Output<()> {
    fn default() -> Self {
        Self::new(())
    }
}
