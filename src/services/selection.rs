//! Random selection of one factoid per key.

use crate::models::Factoid;
use crate::storage::FactoidStore;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Source of randomness for selection.
///
/// Swappable so tests can pin outcomes with a seed.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..n`. `n` is never zero.
    fn below(&self, n: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn unit(&self) -> f64;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, n: usize) -> usize {
        rand::rng().random_range(0..n)
    }

    fn unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic RNG seeded once.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a source that replays the same sequence for the same seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut rng)
    }
}

impl RandomSource for SeededRandom {
    fn below(&self, n: usize) -> usize {
        self.with_rng(|rng| rng.random_range(0..n))
    }

    fn unit(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }
}

/// Result of a recall attempt.
#[derive(Debug, Clone)]
pub enum Recall {
    /// No factoid is stored under the key.
    Miss,
    /// A factoid was picked but its chance roll failed.
    Suppressed(Factoid),
    /// A factoid was picked and should be spoken.
    Hit(Factoid),
}

impl Recall {
    /// Metrics label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Miss => "miss",
            Self::Suppressed(_) => "suppressed",
            Self::Hit(_) => "hit",
        }
    }

    /// Whether no candidate existed.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Picks one factoid for a key, uniformly, then applies its chance gate.
#[derive(Clone)]
pub struct SelectionEngine {
    store: Arc<dyn FactoidStore>,
    random: Arc<dyn RandomSource>,
}

impl SelectionEngine {
    /// Creates a selector over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn FactoidStore>, random: Arc<dyn RandomSource>) -> Self {
        Self { store, random }
    }

    /// Uniformly picks one factoid stored under `key`.
    ///
    /// Reservoir sampling over the store's lazy sequence, so only the
    /// current pick is held in memory however many factoids share the key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the store fails mid-iteration.
    pub fn choose(&self, key: &str) -> Result<Option<Factoid>> {
        let mut seen = 0usize;
        let mut chosen = None;
        self.store.for_each_by_key(key, &mut |factoid| {
            seen += 1;
            if self.random.below(seen) == 0 {
                chosen = Some(factoid);
            }
            Ok(())
        })?;
        Ok(chosen)
    }

    /// Picks a factoid for `key` and rolls its chance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the store fails.
    pub fn recall(&self, key: &str) -> Result<Recall> {
        if key.is_empty() {
            return Ok(Recall::Miss);
        }
        let recall = match self.choose(key)? {
            None => Recall::Miss,
            Some(factoid) if factoid.chance.admits(self.random.unit()) => Recall::Hit(factoid),
            Some(factoid) => Recall::Suppressed(factoid),
        };
        metrics::counter!("factoid_recall_total", "outcome" => recall.label()).increment(1);
        tracing::debug!(key, outcome = recall.label(), "recall");
        Ok(recall)
    }
}

impl std::fmt::Debug for SelectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chance, Provenance, ScopeId, Speaker};
    use crate::storage::MemoryFactoidStore;

    fn provenance() -> Provenance {
        Provenance::now(&Speaker::new("alice", "al", "host"), &ScopeId::new("#c"))
    }

    fn store_with(key: &str, values: &[&str]) -> Arc<MemoryFactoidStore> {
        let store = Arc::new(MemoryFactoidStore::new());
        for value in values {
            store
                .insert(&Factoid::new(key, value, provenance()))
                .expect("insert");
        }
        store
    }

    /// Always answers with the same roll.
    struct FixedRoll(f64);

    impl RandomSource for FixedRoll {
        fn below(&self, _n: usize) -> usize {
            0
        }

        fn unit(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_miss_on_unknown_and_empty_key() {
        let store = store_with("foo", &["bar"]);
        let selector = SelectionEngine::new(store, Arc::new(SeededRandom::new(1)));
        assert!(selector.recall("nope").expect("recall").is_miss());
        assert!(selector.recall("").expect("recall").is_miss());
    }

    #[test]
    fn test_single_factoid_always_hits() {
        let store = store_with("foo", &["bar"]);
        let selector = SelectionEngine::new(store, Arc::new(SeededRandom::new(7)));
        for _ in 0..20 {
            assert!(matches!(selector.recall("foo").expect("recall"), Recall::Hit(_)));
        }
    }

    #[test]
    fn test_chance_gate_uses_strict_less_than() {
        let store = Arc::new(MemoryFactoidStore::new());
        let mut factoid = Factoid::new("foo", "bar", provenance());
        factoid.chance = Chance::new(0.5).expect("chance");
        store.insert(&factoid).expect("insert");

        let below = SelectionEngine::new(store.clone(), Arc::new(FixedRoll(0.49)));
        assert!(matches!(below.recall("foo").expect("recall"), Recall::Hit(_)));

        let at = SelectionEngine::new(store, Arc::new(FixedRoll(0.5)));
        assert!(matches!(at.recall("foo").expect("recall"), Recall::Suppressed(_)));
    }

    #[test]
    fn test_choose_reaches_every_candidate() {
        let store = store_with("foo", &["a", "b", "c"]);
        let selector = SelectionEngine::new(store, Arc::new(SeededRandom::new(42)));
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let picked = selector.choose("foo").expect("choose").expect("some");
            seen.insert(picked.value);
        }
        assert_eq!(seen.len(), 3);
    }
}
