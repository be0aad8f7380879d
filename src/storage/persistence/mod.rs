//! Factoid store implementations.

mod memory;
mod sqlite;

pub use memory::MemoryFactoidStore;
pub use sqlite::SqliteFactoidStore;
