//! Factoid store trait.

use crate::models::{Factoid, FactoidId};
use crate::Result;

/// Trait for factoid persistence backends.
///
/// Any document or relational store that can satisfy these operations is
/// interchangeable. Failures surface as [`crate::Error::StoreUnavailable`]
/// or [`crate::Error::NotFound`]; backends never swallow them.
///
/// # Concurrency
///
/// Updates are whole-record overwrites keyed by id. Two callers doing
/// read-modify-write on the same id race, and the last write wins. There is
/// no optimistic versioning.
pub trait FactoidStore: Send + Sync {
    /// Stores a new factoid and returns its id.
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId>;

    /// Overwrites the factoid stored under `id`.
    ///
    /// Returns [`crate::Error::NotFound`] if nothing is stored under `id`.
    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()>;

    /// Deletes the factoid stored under `id`.
    ///
    /// Returns [`crate::Error::NotFound`] if nothing is stored under `id`.
    fn delete_by_id(&self, id: &FactoidId) -> Result<()>;

    /// Fetches a factoid by id.
    ///
    /// Returns [`crate::Error::NotFound`] if nothing is stored under `id`.
    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid>;

    /// Counts the factoids stored under a normalized key.
    fn count_by_key(&self, key: &str) -> Result<usize>;

    /// Streams every factoid stored under a normalized key to `visit`.
    ///
    /// The sequence is finite, its order is unspecified, and calling again
    /// restarts it. `visit` must not call back into the same store. An error
    /// returned by `visit` stops the iteration and is passed through.
    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()>;

    /// Streams every stored factoid to `visit`.
    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()>;

    /// Collects every factoid stored under a normalized key.
    fn find_by_key(&self, key: &str) -> Result<Vec<Factoid>> {
        let mut found = Vec::new();
        self.for_each_by_key(key, &mut |factoid| {
            found.push(factoid);
            Ok(())
        })?;
        Ok(found)
    }

    /// Returns the total number of stored factoids.
    fn count(&self) -> Result<usize> {
        let mut total = 0;
        self.for_each(&mut |_| {
            total += 1;
            Ok(())
        })?;
        Ok(total)
    }
}
