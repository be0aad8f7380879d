//! Storage backend traits.

mod factoid;

pub use factoid::FactoidStore;
