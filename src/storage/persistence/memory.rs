//! In-memory factoid store.

use crate::models::{Factoid, FactoidId};
use crate::storage::traits::FactoidStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Volatile store for tests and throwaway sessions.
///
/// Factoids live in a `BTreeMap` ordered by id, so iteration order is
/// creation order for generated ids.
#[derive(Default)]
pub struct MemoryFactoidStore {
    factoids: RwLock<BTreeMap<FactoidId, Factoid>>,
}

impl MemoryFactoidStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<FactoidId, Factoid>> {
        self.factoids.read().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<FactoidId, Factoid>> {
        self.factoids.write().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl FactoidStore for MemoryFactoidStore {
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId> {
        let mut factoids = self.write();
        if factoids.contains_key(&factoid.id) {
            return Err(Error::store(
                "insert",
                format!("duplicate factoid id '{}'", factoid.id),
            ));
        }
        factoids.insert(factoid.id.clone(), factoid.clone());
        Ok(factoid.id.clone())
    }

    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()> {
        let mut factoids = self.write();
        let slot = factoids
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        *slot = Factoid {
            id: id.clone(),
            ..factoid.clone()
        };
        Ok(())
    }

    fn delete_by_id(&self, id: &FactoidId) -> Result<()> {
        self.write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn count_by_key(&self, key: &str) -> Result<usize> {
        Ok(self.read().values().filter(|f| f.key == key).count())
    }

    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        let factoids = self.read();
        for factoid in factoids.values().filter(|f| f.key == key) {
            visit(factoid.clone())?;
        }
        Ok(())
    }

    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()> {
        let factoids = self.read();
        for factoid in factoids.values() {
            visit(factoid.clone())?;
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provenance, ScopeId, Speaker};

    fn factoid(key: &str, value: &str) -> Factoid {
        let provenance = Provenance::now(&Speaker::new("bob", "b", "host"), &ScopeId::new("#t"));
        Factoid::new(key, value, provenance)
    }

    #[test]
    fn test_point_operations() {
        let store = MemoryFactoidStore::new();
        let mut fact = factoid("tea", "hot");
        let id = store.insert(&fact).unwrap();

        fact.value = "cold".to_string();
        store.update_by_id(&id, &fact).unwrap();
        assert_eq!(store.get_by_id(&id).unwrap().value, "cold");

        store.delete_by_id(&id).unwrap();
        assert!(matches!(store.get_by_id(&id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete_by_id(&id), Err(Error::NotFound(_))));
        assert!(matches!(store.update_by_id(&id, &fact), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemoryFactoidStore::new();
        let fact = factoid("tea", "hot");
        store.insert(&fact).unwrap();
        assert!(matches!(
            store.insert(&fact),
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_key_queries() {
        let store = MemoryFactoidStore::new();
        store.insert(&factoid("lol", "a")).unwrap();
        store.insert(&factoid("lol", "b")).unwrap();
        store.insert(&factoid("rofl", "c")).unwrap();

        assert_eq!(store.count_by_key("lol").unwrap(), 2);
        assert_eq!(store.find_by_key("rofl").unwrap().len(), 1);
        assert!(store.find_by_key("").unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }
}
