//! Duplicate-event filter for real data.

use std::collections::HashSet;

use haa_core::EventId;

/// Remembers every `(run, lumi, event)` triple seen so far.
///
/// No eviction: one process handles one bounded input, so the set simply
/// grows for the lifetime of the run.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    seen: HashSet<EventId>,
}

impl DuplicateFilter {
    /// Empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the triple was already seen; otherwise records it and returns `false`.
    pub fn is_duplicate(&mut self, run: u32, lumi: u32, event: u64) -> bool {
        !self.seen.insert(EventId { run, lumi, event })
    }

    /// Same as [`is_duplicate`](Self::is_duplicate) for an [`EventId`].
    pub fn check(&mut self, id: EventId) -> bool {
        self.is_duplicate(id.run, id.lumi, id.event)
    }

    /// Number of distinct triples recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Fold another filter's seen-set into this one (merging per-range passes).
    pub fn merge(&mut self, other: DuplicateFilter) {
        self.seen.extend(other.seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn second_sighting_is_duplicate() {
        let mut f = DuplicateFilter::new();
        assert!(!f.is_duplicate(1, 2, 3));
        assert!(f.is_duplicate(1, 2, 3));
        assert!(f.is_duplicate(1, 2, 3));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn any_component_distinguishes() {
        let mut f = DuplicateFilter::new();
        assert!(!f.is_duplicate(1, 2, 3));
        assert!(!f.is_duplicate(2, 2, 3));
        assert!(!f.is_duplicate(1, 3, 3));
        assert!(!f.is_duplicate(1, 2, 4));
    }

    #[test]
    fn merge_combines_seen_sets() {
        let mut a = DuplicateFilter::new();
        let mut b = DuplicateFilter::new();
        a.is_duplicate(1, 1, 1);
        b.is_duplicate(1, 1, 2);
        a.merge(b);
        assert!(a.is_duplicate(1, 1, 2));
        assert_eq!(a.len(), 2);
    }

    proptest! {
        #[test]
        fn distinct_triples_never_flagged(
            triples in proptest::collection::hash_set((0u32..50, 0u32..50, 0u64..1000), 0..200)
        ) {
            let mut f = DuplicateFilter::new();
            for &(r, l, e) in &triples {
                prop_assert!(!f.is_duplicate(r, l, e));
            }
            prop_assert_eq!(f.len(), triples.len());
        }
    }
}
