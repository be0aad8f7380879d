//! Factoid event types for audit and observability.

use super::{FactoidId, ScopeId};
use crate::current_timestamp;
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Event source component.
    pub source: &'static str,
    /// Timestamp (Unix epoch seconds).
    pub timestamp: u64,
}

impl EventMeta {
    /// Creates new event metadata using the current timestamp.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self::with_timestamp(source, current_timestamp())
    }

    /// Creates new event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(source: &'static str, timestamp: u64) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp,
        }
    }
}

/// Events emitted by the factoid engine.
#[derive(Debug, Clone)]
pub enum FactoidEvent {
    /// A factoid was taught.
    Added {
        /// Event metadata.
        meta: EventMeta,
        /// The new factoid.
        factoid_id: FactoidId,
        /// Its key.
        key: String,
        /// Scope it was taught in.
        scope: ScopeId,
    },
    /// A factoid passed selection and its chance gate.
    Recalled {
        /// Event metadata.
        meta: EventMeta,
        /// The recalled factoid.
        factoid_id: FactoidId,
        /// Scope it was recalled in.
        scope: ScopeId,
    },
    /// A factoid's value was replaced.
    Replaced {
        /// Event metadata.
        meta: EventMeta,
        /// The edited factoid.
        factoid_id: FactoidId,
        /// Scope the edit came from.
        scope: ScopeId,
    },
    /// A factoid's chance was changed.
    ChanceChanged {
        /// Event metadata.
        meta: EventMeta,
        /// The edited factoid.
        factoid_id: FactoidId,
        /// Previous probability.
        old: f64,
        /// New probability.
        new: f64,
    },
    /// A factoid was forgotten.
    Deleted {
        /// Event metadata.
        meta: EventMeta,
        /// The removed factoid.
        factoid_id: FactoidId,
        /// Scope the delete came from.
        scope: ScopeId,
    },
}

impl FactoidEvent {
    /// Returns the event type identifier.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Recalled { .. } => "recalled",
            Self::Replaced { .. } => "replaced",
            Self::ChanceChanged { .. } => "chance_changed",
            Self::Deleted { .. } => "deleted",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::Added { meta, .. }
            | Self::Recalled { meta, .. }
            | Self::Replaced { meta, .. }
            | Self::ChanceChanged { meta, .. }
            | Self::Deleted { meta, .. } => meta,
        }
    }

    /// Returns the factoid the event is about.
    #[must_use]
    pub const fn factoid_id(&self) -> &FactoidId {
        match self {
            Self::Added { factoid_id, .. }
            | Self::Recalled { factoid_id, .. }
            | Self::Replaced { factoid_id, .. }
            | Self::ChanceChanged { factoid_id, .. }
            | Self::Deleted { factoid_id, .. } => factoid_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_meta() {
        let event = FactoidEvent::Deleted {
            meta: EventMeta::with_timestamp("test", 42),
            factoid_id: FactoidId::new("f1"),
            scope: ScopeId::new("#c"),
        };
        assert_eq!(event.event_type(), "deleted");
        assert_eq!(event.meta().timestamp, 42);
        assert_eq!(event.factoid_id().as_str(), "f1");
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = EventMeta::new("test");
        let b = EventMeta::new("test");
        assert_ne!(a.event_id, b.event_id);
    }
}
