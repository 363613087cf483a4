//! Key-to-fragment routing.
//!
//! Routing is a pure function of the key and the fragment count. There is no
//! seed and no process-wide state, so two clients built with the same count
//! always agree on the owner of a key.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Map `key` to a fragment index in `[0, fragment_count)`.
///
/// A `fragment_count` of zero is treated as one.
pub fn fragment_of(key: &str, fragment_count: usize) -> usize {
    if fragment_count <= 1 {
        return 0;
    }
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    // Fold the high half in; Fx leaves the low bits weakly mixed.
    let folded = hash ^ (hash >> 32);
    (folded % fragment_count as u64) as usize
}

/// Router bound to a fixed fragment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    fragment_count: usize,
}

impl Router {
    pub fn new(fragment_count: usize) -> Self {
        Self {
            fragment_count: fragment_count.max(1),
        }
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn fragment_of(&self, key: &str) -> usize {
        fragment_of(key, self.fragment_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_always_zero() {
        for idx in 0..500 {
            assert_eq!(fragment_of(&format!("S{idx}"), 1), 0);
        }
        assert_eq!(fragment_of("", 1), 0);
        assert_eq!(fragment_of("anything", 0), 0);
    }

    #[test]
    fn routing_is_deterministic_and_in_range() {
        for count in 1..=16 {
            for idx in 0..200 {
                let key = format!("student-{idx}");
                let first = fragment_of(&key, count);
                let second = fragment_of(&key, count);
                assert_eq!(first, second);
                assert!(first < count);
            }
        }
    }

    #[test]
    fn router_matches_free_function() {
        let router = Router::new(5);
        assert_eq!(router.fragment_count(), 5);
        assert_eq!(router.fragment_of("S42"), fragment_of("S42", 5));
        assert_eq!(Router::new(0).fragment_count(), 1);
    }

    #[test]
    fn keys_spread_over_all_fragments() {
        let count = 4;
        let mut buckets = vec![0usize; count];
        for idx in 0..4000 {
            buckets[fragment_of(&format!("S{idx:05}"), count)] += 1;
        }
        for (fragment, hits) in buckets.iter().enumerate() {
            assert!(*hits > 500, "fragment {fragment} only received {hits} keys");
        }
    }
}
