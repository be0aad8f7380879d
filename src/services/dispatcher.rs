//! Command classification.
//!
//! Addressed messages are matched against an ordered rule list; the first
//! rule that recognizes the text decides the command. Anything unmatched,
//! every unaddressed message and every action is a lookup.

use crate::models::{ChatMessage, MessageKind};

/// Which delimiter an add command used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddForm {
    /// `key := value`, stored as written.
    Assign,
    /// `key :is value`, stored as "key is value".
    Is,
}

/// A classified chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Teach a new factoid.
    Add {
        /// Raw text left of the delimiter.
        key: String,
        /// Raw text right of the delimiter.
        value: String,
        /// Which delimiter was matched.
        form: AddForm,
    },
    /// Forget the focused factoid.
    Delete,
    /// Rewrite the focused factoid's value.
    Replace {
        /// The new raw value.
        value: String,
    },
    /// Change the focused factoid's chance.
    SetChance {
        /// The raw chance expression.
        expr: String,
    },
    /// Dump every value under a key.
    Literal {
        /// The raw key.
        key: String,
    },
    /// Recall one factoid matching the whole text.
    Lookup {
        /// The raw text.
        text: String,
    },
}

impl Command {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Delete => "delete",
            Self::Replace { .. } => "replace",
            Self::SetChance { .. } => "set_chance",
            Self::Literal { .. } => "literal",
            Self::Lookup { .. } => "lookup",
        }
    }
}

/// One classification rule: takes the original text and its ASCII-lowercased
/// twin (same byte offsets) and returns a command if it matches.
type Rule = fn(&str, &str) -> Option<Command>;

/// Rules in priority order.
const RULES: &[(&str, Rule)] = &[
    ("add", classify_add),
    ("delete", classify_delete),
    ("replace", classify_replace),
    ("set_chance", classify_set_chance),
    ("literal", classify_literal),
];

/// Classifies the text of an addressed message.
///
/// Only leading whitespace is dropped before matching, so a prefix such as
/// `replace that with ` still matches when nothing but blanks follow it.
#[must_use]
pub fn classify(text: &str) -> Command {
    let text = text.trim_start();
    let lower = text.to_ascii_lowercase();
    RULES
        .iter()
        .find_map(|(_, rule)| rule(text, &lower))
        .unwrap_or_else(|| Command::Lookup {
            text: text.trim_end().to_string(),
        })
}

/// Classifies a message, sending unaddressed chatter and `/me` actions
/// straight to lookup.
#[must_use]
pub fn classify_message(message: &ChatMessage) -> Command {
    if message.addressed && message.kind == MessageKind::Statement {
        classify(&message.text)
    } else {
        Command::Lookup {
            text: message.text.trim().to_string(),
        }
    }
}

fn classify_add(text: &str, lower: &str) -> Option<Command> {
    let (pos, delimiter, form) = lower
        .find(":=")
        .map(|pos| (pos, ":=", AddForm::Assign))
        .or_else(|| lower.find(":is").map(|pos| (pos, ":is", AddForm::Is)))?;
    Some(Command::Add {
        key: text[..pos].to_string(),
        value: text[pos + delimiter.len()..].to_string(),
        form,
    })
}

fn classify_delete(_text: &str, lower: &str) -> Option<Command> {
    (lower.starts_with("forget that") || lower.starts_with("delete that"))
        .then_some(Command::Delete)
}

fn classify_replace(text: &str, lower: &str) -> Option<Command> {
    remainder(text, lower, "replace that with ").map(|value| Command::Replace { value })
}

fn classify_set_chance(text: &str, lower: &str) -> Option<Command> {
    remainder(text, lower, "chance of that is ").map(|expr| Command::SetChance { expr })
}

fn classify_literal(text: &str, lower: &str) -> Option<Command> {
    remainder(text, lower, "literal ").map(|key| Command::Literal { key })
}

/// Text after `prefix`, if `lower` starts with it, without trailing blanks.
fn remainder(text: &str, lower: &str, prefix: &str) -> Option<String> {
    lower
        .starts_with(prefix)
        .then(|| text[prefix.len()..].trim_end().to_string())
}

/// Names of the classification rules in priority order.
#[must_use]
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|(name, _)| *name).collect()
}
