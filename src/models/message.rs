//! Inbound chat messages and outbound replies.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FactoidKind;

/// Identifies a conversation scope (a channel, or a private query).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Creates a scope ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The person who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Speaker {
    /// Display nick.
    pub nick: String,
    /// Identity (ident/username).
    pub ident: String,
    /// Host the speaker connects from.
    pub host: String,
}

impl Speaker {
    /// Creates a speaker.
    #[must_use]
    pub fn new(nick: impl Into<String>, ident: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
        }
    }
}

/// Whether a message was said or acted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Ordinary message.
    #[default]
    Statement,
    /// `/me` action.
    Action,
}

impl From<FactoidKind> for MessageKind {
    fn from(kind: FactoidKind) -> Self {
        match kind {
            FactoidKind::Statement => Self::Statement,
            FactoidKind::Action => Self::Action,
        }
    }
}

/// An inbound chat-message event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it.
    pub speaker: Speaker,
    /// Where it was said.
    pub scope: ScopeId,
    /// Raw text, with any addressing prefix already removed.
    pub text: String,
    /// Statement or action.
    pub kind: MessageKind,
    /// Whether the bot was addressed directly.
    pub addressed: bool,
    /// Whether the scope is shared (a channel) rather than private.
    pub public: bool,
}

impl ChatMessage {
    /// Creates an addressed statement in a public scope.
    #[must_use]
    pub fn new(speaker: Speaker, scope: ScopeId, text: impl Into<String>) -> Self {
        Self {
            speaker,
            scope,
            text: text.into(),
            kind: MessageKind::Statement,
            addressed: true,
            public: true,
        }
    }

    /// Sets whether the bot was addressed.
    #[must_use]
    pub const fn with_addressed(mut self, addressed: bool) -> Self {
        self.addressed = addressed;
        self
    }

    /// Sets whether the scope is public.
    #[must_use]
    pub const fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Sets the message kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }
}

/// An outbound reply event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Scope to deliver into.
    pub scope: ScopeId,
    /// Display text.
    pub text: String,
    /// Statement or action.
    pub kind: MessageKind,
}

impl Reply {
    /// A plain message.
    #[must_use]
    pub fn statement(scope: &ScopeId, text: impl Into<String>) -> Self {
        Self {
            scope: scope.clone(),
            text: text.into(),
            kind: MessageKind::Statement,
        }
    }

    /// A `/me` action.
    #[must_use]
    pub fn action(scope: &ScopeId, text: impl Into<String>) -> Self {
        Self {
            scope: scope.clone(),
            text: text.into(),
            kind: MessageKind::Action,
        }
    }

    /// A message addressed to a nick, `"<nick>: <text>"`.
    #[must_use]
    pub fn to_nick(scope: &ScopeId, nick: &str, text: impl fmt::Display) -> Self {
        Self::statement(scope, format!("{nick}: {text}"))
    }
}
