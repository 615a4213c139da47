use crate::body::BodyHandle;
use std::collections::BTreeMap;

/// Unordered body pair, stored with the lower handle first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PairKey {
    pair: CollisionPair,
    is_trigger: bool,
}

/// Remembers which pairs touched last step so that enter and exit are each
/// reported once per transition.
#[derive(Debug, Default)]
pub struct PairTracker {
    // value is "seen during the current step"
    pairs: BTreeMap<PairKey, bool>,
}

impl PairTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains(&self, pair: CollisionPair, is_trigger: bool) -> bool {
        self.pairs.contains_key(&PairKey { pair, is_trigger })
    }

    pub fn begin_step(&mut self) {
        for seen in self.pairs.values_mut() {
            *seen = false;
        }
    }

    /// Marks the pair as touching. Returns true on the first step of contact.
    pub fn touch(&mut self, pair: CollisionPair, is_trigger: bool) -> bool {
        let key = PairKey { pair, is_trigger };
        match self.pairs.get_mut(&key) {
            Some(seen) => {
                *seen = true;
                false
            }
            None => {
                self.pairs.insert(key, true);
                true
            }
        }
    }

    /// Drops the pairs not touched since `begin_step` and returns them in pair
    /// order with their trigger flag.
    pub fn end_step(&mut self) -> Vec<(CollisionPair, bool)> {
        let exited: Vec<_> = self
            .pairs
            .iter()
            .filter(|(_, seen)| !**seen)
            .map(|(key, _)| (key.pair, key.is_trigger))
            .collect();
        self.pairs.retain(|_, seen| *seen);
        exited
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arena::Arena, body::Body};

    #[test]
    fn test_enter_stay_exit() {
        let mut arena = Arena::new();
        let a = arena.insert(Body::default());
        let b = arena.insert(Body::default());
        let pair = CollisionPair::new(b, a);
        assert_eq!(pair.a, a);

        let mut tracker = PairTracker::new();
        tracker.begin_step();
        assert!(tracker.touch(pair, true));
        assert!(tracker.end_step().is_empty());

        for _ in 0..5 {
            tracker.begin_step();
            assert!(!tracker.touch(CollisionPair::new(a, b), true));
            assert!(tracker.end_step().is_empty());
        }

        tracker.begin_step();
        assert_eq!(tracker.end_step(), vec![(pair, true)]);
        assert!(tracker.is_empty());

        tracker.begin_step();
        assert!(tracker.end_step().is_empty());
    }

    #[test]
    fn test_trigger_and_solid_tracked_apart() {
        let mut arena = Arena::new();
        let a = arena.insert(Body::default());
        let b = arena.insert(Body::default());
        let pair = CollisionPair::new(a, b);
        let mut tracker = PairTracker::new();
        tracker.begin_step();
        assert!(tracker.touch(pair, false));
        assert!(tracker.touch(pair, true));
        assert_eq!(tracker.len(), 2);
    }
}
