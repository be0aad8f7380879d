//! Factoid services.
//!
//! Normalization, selection, focus tracking and command classification,
//! wired together by [`FactoidEngine`].

mod dispatcher;
mod engine;
mod focus;
mod normalizer;
mod selection;

pub use dispatcher::{AddForm, Command, classify, classify_message, rule_names};
pub use engine::{EngineConfig, FactoidEngine, describe};
pub use focus::FocusState;
pub use normalizer::KeyNormalizer;
pub use selection::{RandomSource, Recall, SeededRandom, SelectionEngine, ThreadRandom};
