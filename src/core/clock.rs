//! Vector clocks
//!
//! The causal-ordering primitive every hologram carries. A clock is a
//! mapping from agent id to a monotonic counter; it never shrinks and
//! is always passed around by value (a new clock is returned by every
//! operation rather than mutating in place).

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Causal ordering between two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Before,
    After,
    Concurrent,
    Equal,
}

/// An immutable vector clock: agent id -> monotonic counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VectorClock(BTreeMap<String, u64>);

impl VectorClock {
    /// An empty clock.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Counter for `id`, or zero if `id` has never ticked.
    #[must_use]
    pub fn get(&self, id: &str) -> u64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Returns a new clock with `id`'s counter incremented by one.
    #[must_use]
    pub fn increment(&self, id: &str) -> Self {
        let mut next = self.0.clone();
        next.entry(id.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        Self(next)
    }

    /// Pointwise max merge over the union of both clocks' keys.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        for (id, count) in &other.0 {
            merged
                .entry(id.clone())
                .and_modify(|c| *c = (*c).max(*count))
                .or_insert(*count);
        }
        Self(merged)
    }

    /// Compares two clocks by scanning the union of their keys.
    ///
    /// `a` is `Before` `b` when every component of `a` is <= the
    /// matching component of `b` and at least one is strictly less;
    /// symmetric for `After`; `Equal` when all components match;
    /// otherwise `Concurrent`.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let keys = self.0.keys().chain(other.0.keys());
        let mut any_less = false;
        let mut any_greater = false;

        let mut seen = std::collections::HashSet::new();
        for id in keys {
            if !seen.insert(id.clone()) {
                continue;
            }
            match self.get(id).cmp(&other.get(id)) {
                CmpOrdering::Less => any_less = true,
                CmpOrdering::Greater => any_greater = true,
                CmpOrdering::Equal => {}
            }
        }

        match (any_less, any_greater) {
            (false, false) => Ordering::Equal,
            (true, false) => Ordering::Before,
            (false, true) => Ordering::After,
            (true, true) => Ordering::Concurrent,
        }
    }

    /// True if `id` has a non-zero counter in this clock.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clock_is_empty() {
        let c = VectorClock::new();
        assert_eq!(c.get("a"), 0);
    }

    #[test]
    fn increment_bumps_only_named_agent() {
        let c = VectorClock::new().increment("a");
        assert_eq!(c.get("a"), 1);
        assert_eq!(c.get("b"), 0);
        let c2 = c.increment("a");
        assert_eq!(c2.get("a"), 2);
    }

    #[test]
    fn merge_is_commutative() {
        let a = VectorClock::new().increment("a").increment("a");
        let b = VectorClock::new().increment("b");
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn merge_is_associative() {
        let a = VectorClock::new().increment("a");
        let b = VectorClock::new().increment("b").increment("b");
        let c = VectorClock::new().increment("c");
        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn merge_takes_pointwise_max() {
        let a = VectorClock::new().increment("a").increment("a").increment("b");
        let b = VectorClock::new().increment("a").increment("b").increment("b");
        let merged = a.merge(&b);
        assert_eq!(merged.get("a"), 2);
        assert_eq!(merged.get("b"), 2);
    }

    #[test]
    fn compare_equal_clocks() {
        let a = VectorClock::new().increment("a");
        let b = a.clone();
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn compare_before_and_after() {
        let a = VectorClock::new().increment("x");
        let b = a.increment("x");
        assert_eq!(a.compare(&b), Ordering::Before);
        assert_eq!(b.compare(&a), Ordering::After);
    }

    #[test]
    fn compare_concurrent() {
        let a = VectorClock::new().increment("a");
        let b = VectorClock::new().increment("b");
        assert_eq!(a.compare(&b), Ordering::Concurrent);
    }

    #[test]
    fn clock_monotonic_per_agent() {
        let mut c = VectorClock::new();
        let mut last = 0;
        for _ in 0..10 {
            c = c.increment("h1");
            assert!(c.get("h1") >= last);
            last = c.get("h1");
        }
    }
}
