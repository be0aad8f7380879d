//! # Factkeeper
//!
//! A community-edited factoid knowledge engine for chat bots.
//!
//! Factkeeper keeps short text snippets ("factoids") keyed by free-form
//! phrases and answers chat messages by probabilistically recalling one of
//! them. Anyone in a conversation can teach, replace, delete or re-weight a
//! factoid by referring to "that", the most recently touched entry in the
//! same conversation scope.
//!
//! ## Features
//!
//! - Pluggable persistence (`SQLite`, in-memory) behind [`FactoidStore`]
//! - Uniform selection among polysemous keys, gated by per-factoid chance
//! - Per-scope focus so follow-up commands never cross channels
//! - Single-pass `$directive` template expansion with registrable plugins
//!
//! ## Example
//!
//! ```rust
//! use factkeeper::services::{EngineConfig, FactoidEngine};
//! use factkeeper::storage::MemoryFactoidStore;
//! use factkeeper::transport::BufferedSink;
//! use factkeeper::{ChatMessage, ScopeId, Speaker};
//! use std::sync::Arc;
//!
//! let engine = FactoidEngine::new(EngineConfig::default(), Arc::new(MemoryFactoidStore::new()));
//! let sink = BufferedSink::new();
//! let alice = Speaker::new("alice", "alice", "example.org");
//! let scope = ScopeId::new("#rust");
//!
//! engine.handle(&ChatMessage::new(alice.clone(), scope.clone(), "ferris := a crab"), &sink)?;
//! engine.handle(&ChatMessage::new(alice, scope, "ferris"), &sink)?;
//! assert_eq!(sink.texts().last().map(String::as_str), Some("a crab"));
//! # Ok::<(), factkeeper::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod storage;
pub mod transport;

pub use config::{EngineSettings, FactkeeperConfig};
pub use models::{
    Chance, ChatMessage, Factoid, FactoidEvent, FactoidId, FactoidKind, MessageKind, Provenance,
    Reply, ScopeId, Speaker,
};
pub use rendering::{ExpandContext, TemplatePipeline, TemplatePlugin};
pub use services::{
    Command, EngineConfig, FactoidEngine, FocusState, KeyNormalizer, SelectionEngine, classify,
};
pub use storage::FactoidStore;
pub use transport::{FloodControl, ReplySink};

/// Error type for factkeeper operations.
///
/// Every variant below the "command" line is recovered at the dispatcher
/// boundary and turned into a chat reply; none of them end the process.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `EmptyKey` | An add command has nothing left of the delimiter |
/// | `EmptyValue` | An add or replace leaves nothing to store |
/// | `NothingInFocus` | delete/replace/chance with no focused factoid in the scope |
/// | `BadChanceFormat` | A chance expression does not parse |
/// | `ChanceOutOfRange` | A parsed chance is `<= 0` or `> 1` |
/// | `UnknownKey` | `literal` on a key with no factoids |
/// | `TooManyMatchesPublic` | `literal` on a crowded key in a public scope |
/// | `StoreUnavailable` | The persistence backend failed |
/// | `NotFound` | A point operation referenced an id that no longer exists |
/// | `ReplyFailed` | The chat transport could not deliver a reply |
/// | `InvalidInput` | Malformed configuration or CLI input |
/// | `OperationFailed` | IO and initialisation failures outside the store |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The key side of an add command was blank.
    #[error("empty key")]
    EmptyKey,

    /// The value side of an add or replace was blank.
    #[error("nothing to remember about '{key}'")]
    EmptyValue {
        /// The normalized key the value was meant for.
        key: String,
    },

    /// A follow-up command arrived with no focused factoid in its scope.
    #[error("nothing in focus")]
    NothingInFocus,

    /// The chance expression could not be parsed.
    ///
    /// `percent` records whether the input used the `%` form, which only
    /// changes how the problem is reported.
    #[error("'{input}' is not a chance")]
    BadChanceFormat {
        /// The raw expression.
        input: String,
        /// Whether the expression ended in `%`.
        percent: bool,
    },

    /// The chance expression parsed but lies outside `(0, 1]`.
    #[error("'{0}' is outside possible chance ranges")]
    ChanceOutOfRange(String),

    /// No factoid is stored under the key.
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    /// A literal dump was refused in a shared scope.
    #[error("too many factoids ({count}) for '{key}' to list publicly")]
    TooManyMatchesPublic {
        /// The normalized key.
        key: String,
        /// How many factoids share it.
        count: usize,
    },

    /// The persistence backend failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail or the database cannot be opened
    /// - The backend lock cannot be taken
    #[error("store unavailable during '{operation}': {cause}")]
    StoreUnavailable {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A point operation referenced a factoid that does not exist.
    #[error("factoid '{0}' not found")]
    NotFound(FactoidId),

    /// The transport could not deliver a reply.
    ///
    /// Unlike the other chat-facing variants this one is not reported back
    /// to the channel, since the channel is what failed.
    #[error("reply could not be delivered: {0}")]
    ReplyFailed(String),

    /// Invalid input outside the chat command language.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Configuration files cannot be read or parsed
    /// - Logging or metrics cannot be initialised
    /// - Import/export files cannot be read or written
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::StoreUnavailable`] from any displayable cause.
    pub fn store(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Short, stable label used for metrics and structured logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EmptyKey => "empty_key",
            Self::EmptyValue { .. } => "empty_value",
            Self::NothingInFocus => "nothing_in_focus",
            Self::BadChanceFormat { .. } => "bad_chance_format",
            Self::ChanceOutOfRange(_) => "chance_out_of_range",
            Self::UnknownKey(_) => "unknown_key",
            Self::TooManyMatchesPublic { .. } => "too_many_matches_public",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::NotFound(_) => "not_found",
            Self::ReplyFailed(_) => "reply_failed",
            Self::InvalidInput(_) => "invalid_input",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Result type alias for factkeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::store("insert", "disk full");
        assert_eq!(
            err.to_string(),
            "store unavailable during 'insert': disk full"
        );

        let err = Error::TooManyMatchesPublic {
            key: "lol".to_string(),
            count: 11,
        };
        assert_eq!(
            err.to_string(),
            "too many factoids (11) for 'lol' to list publicly"
        );
    }

    #[test]
    fn test_error_labels_are_distinct() {
        let errors = [
            Error::EmptyKey,
            Error::NothingInFocus,
            Error::ChanceOutOfRange("2".to_string()),
            Error::UnknownKey("x".to_string()),
            Error::NotFound(FactoidId::new("id")),
        ];
        let mut labels: Vec<_> = errors.iter().map(Error::label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), errors.len());
    }
}
