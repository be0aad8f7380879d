//! Shared helpers for integration tests.

#![allow(dead_code)]

use factkeeper::storage::MemoryFactoidStore;
use factkeeper::{
    ChatMessage, Error, Factoid, FactoidId, FactoidStore, FloodControl, MessageKind, Result,
    ScopeId, Speaker,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};

/// Wraps a memory store and counts every call by operation.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryFactoidStore,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub gets: AtomicUsize,
    pub counts: AtomicUsize,
    pub iterations: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls that read or write factoid rows, as opposed to counting them.
    pub fn row_touches(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.iterations.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.row_touches() + self.counts.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        for counter in [
            &self.inserts,
            &self.updates,
            &self.deletes,
            &self.gets,
            &self.counts,
            &self.iterations,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl FactoidStore for CountingStore {
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(factoid)
    }

    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_by_id(id, factoid)
    }

    fn delete_by_id(&self, id: &FactoidId) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id)
    }

    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id)
    }

    fn count_by_key(&self, key: &str) -> Result<usize> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count_by_key(key)
    }

    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        self.inner.for_each_by_key(key, visit)
    }

    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()> {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        self.inner.for_each(visit)
    }
}

/// Wraps a memory store and fails one named operation on demand.
///
/// Operation names match the trait methods: `insert`, `update_by_id`,
/// `delete_by_id`, `get_by_id`, `count_by_key`, `for_each_by_key`.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryFactoidStore,
    failing: Mutex<Option<&'static str>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, operation: &'static str) {
        *self.failing.lock().expect("lock") = Some(operation);
    }

    pub fn heal(&self) {
        *self.failing.lock().expect("lock") = None;
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if *self.failing.lock().expect("lock") == Some(operation) {
            return Err(Error::store(operation, "disk unplugged"));
        }
        Ok(())
    }
}

impl FactoidStore for FailingStore {
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId> {
        self.check("insert")?;
        self.inner.insert(factoid)
    }

    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()> {
        self.check("update_by_id")?;
        self.inner.update_by_id(id, factoid)
    }

    fn delete_by_id(&self, id: &FactoidId) -> Result<()> {
        self.check("delete_by_id")?;
        self.inner.delete_by_id(id)
    }

    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid> {
        self.check("get_by_id")?;
        self.inner.get_by_id(id)
    }

    fn count_by_key(&self, key: &str) -> Result<usize> {
        self.check("count_by_key")?;
        self.inner.count_by_key(key)
    }

    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        self.check("for_each_by_key")?;
        self.inner.for_each_by_key(key, visit)
    }

    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()> {
        self.inner.for_each(visit)
    }
}

/// Wraps a memory store; once armed, every `get_by_id` waits at a barrier
/// after reading, so concurrent edits all read before any of them writes.
pub struct LockstepStore {
    inner: MemoryFactoidStore,
    armed: AtomicBool,
    barrier: Barrier,
}

impl LockstepStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: MemoryFactoidStore::new(),
            armed: AtomicBool::new(false),
            barrier: Barrier::new(parties),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl FactoidStore for LockstepStore {
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId> {
        self.inner.insert(factoid)
    }

    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()> {
        self.inner.update_by_id(id, factoid)
    }

    fn delete_by_id(&self, id: &FactoidId) -> Result<()> {
        self.inner.delete_by_id(id)
    }

    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid> {
        let snapshot = self.inner.get_by_id(id);
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait();
        }
        snapshot
    }

    fn count_by_key(&self, key: &str) -> Result<usize> {
        self.inner.count_by_key(key)
    }

    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        self.inner.for_each_by_key(key, visit)
    }

    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()> {
        self.inner.for_each(visit)
    }
}

/// Records suspend/resume calls in order.
#[derive(Default)]
pub struct RecordingFlood {
    pub calls: Mutex<Vec<String>>,
}

impl FloodControl for RecordingFlood {
    fn suspend(&self, scope: &ScopeId) {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("suspend {scope}"));
    }

    fn resume(&self, scope: &ScopeId) {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("resume {scope}"));
    }
}

/// An addressed statement from `nick` in `scope`.
pub fn say(scope: &str, nick: &str, text: &str) -> ChatMessage {
    ChatMessage::new(
        Speaker::new(nick, nick, "example.org"),
        ScopeId::new(scope),
        text,
    )
    .with_public(scope.starts_with('#'))
}

/// An unaddressed statement.
pub fn chatter(scope: &str, nick: &str, text: &str) -> ChatMessage {
    say(scope, nick, text).with_addressed(false)
}

/// An unaddressed `/me` action.
pub fn act(scope: &str, nick: &str, text: &str) -> ChatMessage {
    chatter(scope, nick, text).with_kind(MessageKind::Action)
}
