//! Per-scope "last factoid touched" tracking.

use crate::models::{FactoidId, ScopeId};
use dashmap::DashMap;

/// Remembers, per scope, which factoid a follow-up "that" refers to.
///
/// Slots are independent: focus set in one scope is never visible in another.
/// Held in memory only, so focus does not survive a restart.
#[derive(Debug, Default)]
pub struct FocusState {
    slots: DashMap<ScopeId, FactoidId>,
}

impl FocusState {
    /// Creates empty focus state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `scope` at `id`, replacing any previous focus.
    pub fn set(&self, scope: &ScopeId, id: FactoidId) {
        self.slots.insert(scope.clone(), id);
    }

    /// The factoid currently in focus for `scope`.
    #[must_use]
    pub fn get(&self, scope: &ScopeId) -> Option<FactoidId> {
        self.slots.get(scope).map(|entry| entry.value().clone())
    }

    /// Empties the slot for `scope`.
    pub fn clear(&self, scope: &ScopeId) {
        self.slots.remove(scope);
    }

    /// Number of scopes with something in focus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no scope has anything in focus.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_isolated() {
        let focus = FocusState::new();
        let a = ScopeId::new("#a");
        let b = ScopeId::new("#b");

        focus.set(&a, FactoidId::new("one"));
        assert_eq!(focus.get(&a), Some(FactoidId::new("one")));
        assert_eq!(focus.get(&b), None);

        focus.set(&b, FactoidId::new("two"));
        focus.clear(&a);
        assert_eq!(focus.get(&a), None);
        assert_eq!(focus.get(&b), Some(FactoidId::new("two")));
        assert_eq!(focus.len(), 1);
    }

    #[test]
    fn test_set_replaces() {
        let focus = FocusState::new();
        let scope = ScopeId::new("alice");
        focus.set(&scope, FactoidId::new("old"));
        focus.set(&scope, FactoidId::new("new"));
        assert_eq!(focus.get(&scope), Some(FactoidId::new("new")));
    }
}
