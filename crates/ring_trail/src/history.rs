//! Keyed trail history.
//!
//! Maps an entity key (e.g. a hand id) to its `RingTrail`. Entries are
//! created when the entity is first observed, pushed on every update and
//! removed when the entity is lost.

use std::collections::hash_map::{self, HashMap};
use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::RingTrail;

/// Trail per tracked entity
pub struct TrailHistory<K, T> {
    trails: HashMap<K, RingTrail<T>>,
    trail_capacity: usize,
}

impl<K, T> fmt::Debug for TrailHistory<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrailHistory")
            .field("entities", &self.trails.len())
            .field("trail_capacity", &self.trail_capacity)
            .finish()
    }
}

impl<K, T> TrailHistory<K, T>
where
    K: Eq + Hash + Copy + fmt::Debug,
    T: Default,
{
    /// Create an empty history whose trails keep `trail_capacity` samples
    ///
    /// # Panics
    ///
    /// Panics if `trail_capacity` is zero.
    pub fn new(trail_capacity: usize) -> Self {
        assert!(trail_capacity > 0, "trail capacity must be > 0");
        Self {
            trails: HashMap::new(),
            trail_capacity,
        }
    }

    /// Start tracking an entity
    ///
    /// An entity that is already tracked keeps its existing trail.
    pub fn add(&mut self, key: K) -> &mut RingTrail<T> {
        let capacity = self.trail_capacity;
        self.trails.entry(key).or_insert_with(|| {
            trace!(key = ?key, "trail added");
            RingTrail::new(capacity)
        })
    }

    /// Push a sample for a tracked entity
    ///
    /// Returns `false` (and drops the sample) if the entity is unknown.
    #[inline]
    pub fn push(&mut self, key: K, sample: T) -> bool {
        match self.trails.get_mut(&key) {
            Some(trail) => {
                trail.push(sample);
                true
            }
            None => {
                trace!(key = ?key, "update for untracked entity skipped");
                false
            }
        }
    }

    /// Stop tracking an entity, returning its trail
    pub fn remove(&mut self, key: K) -> Option<RingTrail<T>> {
        let removed = self.trails.remove(&key);
        if removed.is_some() {
            trace!(key = ?key, "trail removed");
        }
        removed
    }

    /// Look up a trail
    #[inline]
    pub fn find(&self, key: K) -> Option<&RingTrail<T>> {
        self.trails.get(&key)
    }

    /// Look up a trail mutably
    #[inline]
    pub fn find_mut(&mut self, key: K) -> Option<&mut RingTrail<T>> {
        self.trails.get_mut(&key)
    }

    /// Check if an entity is tracked
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.trails.contains_key(&key)
    }

    /// Iterate over all tracked entities (unordered)
    #[inline]
    pub fn iter(&self) -> hash_map::Iter<'_, K, RingTrail<T>> {
        self.trails.iter()
    }

    /// Tracked entity keys (unordered)
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.trails.keys().copied()
    }

    /// Number of tracked entities
    #[inline]
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    /// Check if nothing is tracked
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Capacity given to new trails
    #[inline]
    pub fn trail_capacity(&self) -> usize {
        self.trail_capacity
    }

    /// Forget every entity
    pub fn clear(&mut self) {
        self.trails.clear();
    }
}

impl<'a, K, T> IntoIterator for &'a TrailHistory<K, T> {
    type Item = (&'a K, &'a RingTrail<T>);
    type IntoIter = hash_map::Iter<'a, K, RingTrail<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.trails.iter()
    }
}
