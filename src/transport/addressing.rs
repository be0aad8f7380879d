//! Turning raw console lines into chat messages.

use crate::config::EngineSettings;
use crate::models::{ChatMessage, MessageKind, ScopeId, Speaker};

/// Separators accepted after the bot's nick in "bot: do a thing".
const ADDRESS_SEPARATORS: &[char] = &[':', ',', ';'];

const ACTION_PREFIX: &str = "/me ";

/// Parses `<scope> <nick> <text>` lines the way a chat transport would
/// present them to the engine.
#[derive(Debug, Clone)]
pub struct Addressing {
    bot_nick: String,
    settings: EngineSettings,
}

impl Addressing {
    /// Creates a parser for a bot called `bot_nick`.
    #[must_use]
    pub fn new(bot_nick: impl Into<String>, settings: EngineSettings) -> Self {
        Self {
            bot_nick: bot_nick.into(),
            settings,
        }
    }

    /// Parses one line. Returns `None` for blank or incomplete lines.
    #[must_use]
    pub fn parse_line(&self, line: &str) -> Option<ChatMessage> {
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let scope = parts.next().filter(|s| !s.is_empty())?;
        let nick = parts.next().filter(|s| !s.is_empty())?;
        let text = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
        Some(self.message(scope, nick, text))
    }

    /// Builds a message from its parts.
    #[must_use]
    pub fn message(&self, scope: &str, nick: &str, text: &str) -> ChatMessage {
        let public = self.settings.is_public_scope(scope);
        let (kind, text) = text
            .strip_prefix(ACTION_PREFIX)
            .map_or((MessageKind::Statement, text), |rest| {
                (MessageKind::Action, rest.trim_start())
            });
        let (addressed, text) = match strip_bot_prefix(text, &self.bot_nick) {
            Some(rest) => (true, rest),
            None => (!public, text),
        };

        ChatMessage::new(Speaker::new(nick, nick, "console"), ScopeId::new(scope), text)
            .with_kind(kind)
            .with_public(public)
            .with_addressed(addressed)
    }
}

/// Strips a leading `<nick>:`, `<nick>,` or `<nick>;` (any case).
#[must_use]
pub fn strip_bot_prefix<'a>(text: &'a str, bot_nick: &str) -> Option<&'a str> {
    if bot_nick.is_empty() {
        return None;
    }
    let head = text.get(..bot_nick.len())?;
    if !head.eq_ignore_ascii_case(bot_nick) {
        return None;
    }
    let rest = text[bot_nick.len()..].strip_prefix(ADDRESS_SEPARATORS)?;
    Some(rest.trim_start())
}
