//! Factoid types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ScopeId, Speaker};
use crate::{Error, Result};

/// Unique identifier for a factoid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactoidId(String);

impl FactoidId {
    /// Creates a factoid ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactoidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FactoidId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FactoidId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a recalled factoid is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactoidKind {
    /// Sent as a normal message.
    #[default]
    Statement,
    /// Sent as a first-person action (`/me ...`).
    Action,
}

impl FactoidKind {
    const ACTION_MARKER: &'static str = "<action>";
    const REPLY_MARKER: &'static str = "<reply>";

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Action => "action",
        }
    }

    /// Parses a kind from its storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "statement" | "reply" => Some(Self::Statement),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    /// Splits a leading `<action>` or `<reply>` marker off a value.
    ///
    /// Markers are matched case-insensitively. Without a marker the value is
    /// a statement and is returned trimmed.
    #[must_use]
    pub fn from_value(value: &str) -> (Self, String) {
        let trimmed = value.trim();
        for (marker, kind) in [
            (Self::ACTION_MARKER, Self::Action),
            (Self::REPLY_MARKER, Self::Statement),
        ] {
            let has_marker = trimmed
                .get(..marker.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(marker));
            if has_marker {
                return (kind, trimmed[marker.len()..].trim().to_string());
            }
        }
        (Self::Statement, trimmed.to_string())
    }
}

impl fmt::Display for FactoidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Probability that a matched factoid is actually emitted.
///
/// Always within `(0.0, 1.0]`. Out-of-range values are rejected, never
/// clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Chance(f64);

impl Chance {
    /// A chance that always emits.
    pub const ALWAYS: Self = Self(1.0);

    /// Validates a raw probability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadChanceFormat`] for non-finite values and
    /// [`Error::ChanceOutOfRange`] for values `<= 0` or `> 1`.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::BadChanceFormat {
                input: value.to_string(),
                percent: false,
            });
        }
        if value <= 0.0 || value > 1.0 {
            return Err(Error::ChanceOutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parses a chance expression typed in chat.
    ///
    /// A trailing `%` means an integer percentage (`"50%"` is `0.5`).
    /// Anything else is read as a bare fraction, so `"50"` is out of range
    /// rather than fifty percent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadChanceFormat`] when the expression does not parse
    /// and [`Error::ChanceOutOfRange`] when it falls outside `(0, 1]`. Both
    /// carry the expression as typed.
    pub fn parse(expr: &str) -> Result<Self> {
        let input = expr.trim();
        let (value, percent) = if let Some(digits) = input.strip_suffix('%') {
            let value = digits
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::BadChanceFormat {
                    input: input.to_string(),
                    percent: true,
                })?;
            #[allow(clippy::cast_precision_loss)]
            let fraction = value as f64 / 100.0;
            (fraction, true)
        } else {
            let value = input.parse::<f64>().map_err(|_| Error::BadChanceFormat {
                input: input.to_string(),
                percent: false,
            })?;
            (value, false)
        };

        match Self::new(value) {
            Ok(chance) => Ok(chance),
            Err(Error::BadChanceFormat { .. }) => Err(Error::BadChanceFormat {
                input: input.to_string(),
                percent,
            }),
            Err(_) => Err(Error::ChanceOutOfRange(input.to_string())),
        }
    }

    /// Returns the probability.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns the probability as a whole percentage.
    #[must_use]
    pub fn percent(self) -> f64 {
        (self.0 * 100.0).round()
    }

    /// Whether a uniform roll in `[0, 1)` lets the factoid through.
    #[must_use]
    pub fn admits(self, roll: f64) -> bool {
        roll < self.0
    }
}

impl Default for Chance {
    fn default() -> Self {
        Self::ALWAYS
    }
}

impl TryFrom<f64> for Chance {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Chance> for f64 {
    fn from(chance: Chance) -> Self {
        chance.0
    }
}

impl fmt::Display for Chance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.percent())
    }
}

/// Who touched a factoid, where, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Speaker nick.
    pub nick: String,
    /// Speaker identity (ident/username).
    pub ident: String,
    /// Speaker host.
    pub host: String,
    /// Conversation scope the action happened in.
    pub channel: ScopeId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl Provenance {
    /// Records a speaker acting in a scope now.
    #[must_use]
    pub fn now(speaker: &Speaker, channel: &ScopeId) -> Self {
        Self::at(speaker, channel, Utc::now())
    }

    /// Records a speaker acting in a scope at a given time.
    #[must_use]
    pub fn at(speaker: &Speaker, channel: &ScopeId, timestamp: DateTime<Utc>) -> Self {
        Self {
            nick: speaker.nick.clone(),
            ident: speaker.ident.clone(),
            host: speaker.host.clone(),
            channel: channel.clone(),
            timestamp,
        }
    }
}

/// A stored knowledge unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factoid {
    /// Unique identifier, fixed at creation.
    pub id: FactoidId,
    /// Normalized lookup key. Many factoids may share one.
    pub key: String,
    /// Display text, may contain template directives.
    pub value: String,
    /// Statement or action.
    pub kind: FactoidKind,
    /// Emission probability.
    pub chance: Chance,
    /// Set on creation.
    pub created: Provenance,
    /// Set on value and chance edits.
    pub modified: Provenance,
    /// Set on successful recall.
    pub accessed: Provenance,
    /// Number of successful recalls.
    pub access_count: u64,
}

impl Factoid {
    /// Creates a factoid with a fresh id, full chance and matching
    /// created/modified/accessed provenance.
    ///
    /// `value` is scanned for a leading kind marker.
    #[must_use]
    pub fn new(key: impl Into<String>, value: &str, provenance: Provenance) -> Self {
        let (kind, value) = FactoidKind::from_value(value);
        Self {
            id: FactoidId::generate(),
            key: key.into(),
            value,
            kind,
            chance: Chance::ALWAYS,
            created: provenance.clone(),
            modified: provenance.clone(),
            accessed: provenance,
            access_count: 0,
        }
    }

    /// Records an edit of the value or chance.
    pub fn modify(&mut self, provenance: Provenance) {
        self.modified = provenance;
    }

    /// Records a successful recall.
    pub fn access(&mut self, provenance: Provenance) {
        self.accessed = provenance;
        self.access_count = self.access_count.saturating_add(1);
    }
}
