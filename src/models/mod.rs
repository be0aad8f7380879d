//! Data models for factkeeper.
//!
//! This module contains the core data structures shared by the store,
//! the engine and the transports.

mod events;
mod factoid;
mod message;

pub use events::{EventMeta, FactoidEvent};
pub use factoid::{Chance, Factoid, FactoidId, FactoidKind, Provenance};
pub use message::{ChatMessage, MessageKind, Reply, ScopeId, Speaker};
