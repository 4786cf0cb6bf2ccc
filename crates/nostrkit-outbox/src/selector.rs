// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Relay-set calculation
//!
//! Greedy two-pass selection over cached relay lists: prefer relays that
//! are already connected, then fill each author's coverage up to the goal
//! with their remaining write-relays, preferring relays shared by the
//! most still-uncovered authors.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use nostrkit::{Filter, PublicKey, RelayUrl};

use crate::tracker::OutboxTracker;

/// Result of a relay-set calculation
#[derive(Debug, Clone, Default)]
pub struct RelaySelection {
    /// Relays the subscription should attach to
    pub relays: HashSet<RelayUrl>,
    /// Authors with no cached relay list; their lists should be fetched
    /// asynchronously and the subscription expanded on discovery
    pub uncovered: HashSet<PublicKey>,
}

/// Compute the relay set for a subscription.
///
/// Consults only the tracker cache (never the network). Authors without a
/// cached relay list land in `uncovered`; when nothing can be selected,
/// the connected set is the fallback.
pub async fn select_relays(
    tracker: &OutboxTracker,
    filters: &[Filter],
    connected: &HashSet<RelayUrl>,
    goal: usize,
) -> RelaySelection {
    // Authors named across all filters
    let authors: BTreeSet<PublicKey> = filters
        .iter()
        .filter_map(|f| f.authors.as_ref())
        .flatten()
        .copied()
        .collect();

    if authors.is_empty() {
        return RelaySelection {
            relays: connected.clone(),
            uncovered: HashSet::new(),
        };
    }

    let known: HashMap<PublicKey, Vec<RelayUrl>> = tracker.write_relays_of(authors.iter()).await;

    compute_selection(&authors, &known, connected, goal)
}

fn compute_selection(
    authors: &BTreeSet<PublicKey>,
    known: &HashMap<PublicKey, Vec<RelayUrl>>,
    connected: &HashSet<RelayUrl>,
    goal: usize,
) -> RelaySelection {
    let mut uncovered: HashSet<PublicKey> = HashSet::new();

    // Sorted write-relay lists per author, for deterministic selection
    let mut writes: BTreeMap<PublicKey, BTreeSet<RelayUrl>> = BTreeMap::new();
    for author in authors.iter() {
        match known.get(author) {
            Some(urls) if !urls.is_empty() => {
                writes.insert(*author, urls.iter().cloned().collect());
            }
            _ => {
                uncovered.insert(*author);
            }
        }
    }

    // How many covered authors share each relay (for the tie-break)
    let mut frequency: HashMap<&RelayUrl, usize> = HashMap::new();
    for urls in writes.values() {
        for url in urls.iter() {
            *frequency.entry(url).or_default() += 1;
        }
    }

    let mut selected: HashSet<RelayUrl> = HashSet::new();
    let mut coverage: BTreeMap<PublicKey, usize> = BTreeMap::new();

    let mut select = |url: &RelayUrl,
                      selected: &mut HashSet<RelayUrl>,
                      coverage: &mut BTreeMap<PublicKey, usize>| {
        if selected.insert(url.clone()) {
            // One relay can cover several authors at once
            for (author, urls) in writes.iter() {
                if urls.contains(url) {
                    *coverage.entry(*author).or_default() += 1;
                }
            }
        }
    };

    // First pass: already-connected write-relays
    for (author, urls) in writes.iter() {
        for url in urls.iter() {
            if coverage.get(author).copied().unwrap_or(0) >= goal {
                break;
            }
            if connected.contains(url) && !selected.contains(url) {
                select(url, &mut selected, &mut coverage);
            }
        }
    }

    // Second pass: fill the gap with the remaining write-relays,
    // preferring relays shared by the most authors
    for (author, urls) in writes.iter() {
        let mut missing: usize =
            goal.saturating_sub(coverage.get(author).copied().unwrap_or(0));
        if missing == 0 {
            continue;
        }

        let mut candidates: Vec<&RelayUrl> =
            urls.iter().filter(|u| !selected.contains(*u)).collect();
        candidates.sort_by(|a, b| {
            let fa: usize = frequency.get(*a).copied().unwrap_or(0);
            let fb: usize = frequency.get(*b).copied().unwrap_or(0);
            fb.cmp(&fa).then_with(|| a.cmp(b))
        });

        for url in candidates.into_iter() {
            if missing == 0 {
                break;
            }
            select(url, &mut selected, &mut coverage);
            missing = missing.saturating_sub(1);
        }
    }

    // Unknown authors contribute nothing: without any selection, fall
    // back to the connected set
    if selected.is_empty() {
        return RelaySelection {
            relays: connected.clone(),
            uncovered,
        };
    }

    RelaySelection {
        relays: selected,
        uncovered,
    }
}
