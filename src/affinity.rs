// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Affinity links between related keys.
//!
//! Keys with similar identifiers (`user:42:profile`, `user:42:settings`) tend
//! to be used together. The tracker keeps a symmetric link set per key; the
//! cache uses it to share freshness between linked keys on access and to
//! favour keys with many cached neighbours when scoring evictions.
//!
//! # Similarity
//!
//! ```text
//! positional = matching chars at the same index / longer key length
//! namespace  = everything up to the last ':' '.' or '/'
//!
//! similarity = max(positional, 0.75)   if both keys share a namespace of ≥ 2 segments
//!            = positional              otherwise
//! ```
//!
//! The namespace floor keeps sibling keys with differently sized leaves
//! (`user:42:profile` vs `user:42:settings`, positional 0.56) linked, while a
//! single shared top-level segment (`user:`) is not enough on its own.

use std::collections::{HashMap, HashSet};

/// Fraction of a key's freshness pushed to each linked key on access.
pub const PROPAGATION_FRACTION: f64 = 0.1;

/// Cached neighbours at which affinity strength saturates.
pub const AFFINITY_SATURATION: usize = 5;

/// Similarity assigned to keys in the same multi-segment namespace.
const NAMESPACE_SIMILARITY: f64 = 0.75;

const DELIMITERS: [char; 3] = [':', '.', '/'];

/// Fraction of character positions at which both keys agree.
#[must_use]
pub fn positional_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    matches as f64 / longest as f64
}

/// Namespace of a key with its segment count, if it has at least one delimiter.
fn namespace(key: &str) -> Option<(&str, usize)> {
    let end = key.rfind(DELIMITERS)?;
    let ns = &key[..end];
    let segments = ns.split(DELIMITERS).filter(|s| !s.is_empty()).count();
    Some((ns, segments))
}

/// Identifier similarity in `[0, 1]`. Symmetric.
#[must_use]
pub fn identifier_similarity(a: &str, b: &str) -> f64 {
    let positional = positional_similarity(a, b);
    match (namespace(a), namespace(b)) {
        (Some((ns_a, segments)), Some((ns_b, _))) if ns_a == ns_b && segments >= 2 => {
            positional.max(NAMESPACE_SIMILARITY)
        }
        _ => positional,
    }
}

/// Affinity strength from the number of linked keys currently cached.
#[must_use]
pub fn affinity_strength(cached_links: usize) -> f64 {
    (cached_links as f64 / AFFINITY_SATURATION as f64).min(1.0)
}

/// Symmetric link graph between keys.
#[derive(Debug, Clone)]
pub struct AffinityTracker {
    links: HashMap<String, HashSet<String>>,
    threshold: f64,
}

impl AffinityTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            links: HashMap::new(),
            threshold,
        }
    }

    /// Link a newly inserted key with every similar existing key.
    ///
    /// Returns the number of links created.
    pub fn link_new_key<'a, I>(&mut self, key: &str, existing: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let related: Vec<String> = existing
            .into_iter()
            .filter(|other| *other != key)
            .filter(|other| identifier_similarity(key, other) > self.threshold)
            .map(str::to_owned)
            .collect();

        for other in &related {
            self.links.entry(other.clone()).or_default().insert(key.to_owned());
            self.links.entry(key.to_owned()).or_default().insert(other.clone());
        }
        related.len()
    }

    /// Keys linked to `key`.
    pub fn linked(&self, key: &str) -> impl Iterator<Item = &str> {
        self.links.get(key).into_iter().flatten().map(String::as_str)
    }

    #[must_use]
    pub fn are_linked(&self, a: &str, b: &str) -> bool {
        self.links.get(a).is_some_and(|set| set.contains(b))
    }

    /// Drop `key` and every link pointing at it.
    pub fn remove(&mut self, key: &str) {
        let Some(neighbours) = self.links.remove(key) else {
            return;
        };
        for other in neighbours {
            if let Some(set) = self.links.get_mut(&other) {
                set.remove(key);
                if set.is_empty() {
                    self.links.remove(&other);
                }
            }
        }
    }

    /// Number of distinct symmetric links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.values().map(HashSet::len).sum::<usize>() / 2
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }
}
