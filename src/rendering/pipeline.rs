//! Plugin-driven `$directive` substitution.

use crate::models::{ChatMessage, ScopeId};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::sync::{Arc, LazyLock};

use super::{ClockPlugin, IdentityPlugin};

/// A directive is `$` followed by one or more ASCII letters or underscores.
/// `$5` and a lone `$` are left alone.
static DIRECTIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_]+)").unwrap_or_else(|_| unreachable!()));

/// What a plugin may read while expanding a value.
#[derive(Debug, Clone)]
pub struct ExpandContext {
    /// Nick of whoever triggered the recall.
    pub nick: String,
    /// Scope the recall happened in.
    pub scope: ScopeId,
    /// The bot's own nick.
    pub bot_nick: String,
    /// Whether the triggering message was addressed to the bot.
    pub addressed: bool,
    /// When the triggering message was handled.
    pub now: DateTime<Utc>,
}

impl ExpandContext {
    /// Builds a context for `message`, stamped with the current time.
    #[must_use]
    pub fn from_message(message: &ChatMessage, bot_nick: &str) -> Self {
        Self::at(message, bot_nick, Utc::now())
    }

    /// Builds a context for `message` at a fixed time.
    #[must_use]
    pub fn at(message: &ChatMessage, bot_nick: &str, now: DateTime<Utc>) -> Self {
        Self {
            nick: message.speaker.nick.clone(),
            scope: message.scope.clone(),
            bot_nick: bot_nick.to_string(),
            addressed: message.addressed,
            now,
        }
    }
}

/// Substitutes one family of directives.
pub trait TemplatePlugin: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the substitution for `directive` (without the `$`), or `None`
    /// if this plugin does not recognize it.
    fn expand(&self, directive: &str, ctx: &ExpandContext) -> Option<String>;
}

/// Ordered set of plugins applied to recalled values.
///
/// Each directive is offered to the plugins in registration order and the
/// first one that recognizes it wins. Substituted text is never rescanned,
/// and directives nobody recognizes are left verbatim.
#[derive(Clone, Default)]
pub struct TemplatePipeline {
    plugins: Vec<Arc<dyn TemplatePlugin>>,
}

impl TemplatePipeline {
    /// Creates an empty pipeline. Expansion is the identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline with the built-in identity and clock plugins.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with_plugin(Arc::new(IdentityPlugin))
            .with_plugin(Arc::new(ClockPlugin))
    }

    /// Appends a plugin. Earlier plugins take precedence.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Arc<dyn TemplatePlugin>) -> Self {
        self.register(plugin);
        self
    }

    /// Appends a plugin in place.
    pub fn register(&mut self, plugin: Arc<dyn TemplatePlugin>) {
        tracing::debug!(plugin = plugin.name(), "registered template plugin");
        self.plugins.push(plugin);
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Expands every directive in `value`.
    #[must_use]
    pub fn expand(&self, value: &str, ctx: &ExpandContext) -> String {
        if self.plugins.is_empty() {
            return value.to_string();
        }
        DIRECTIVE_PATTERN
            .replace_all(value, |caps: &Captures<'_>| {
                let directive = &caps[1];
                self.plugins
                    .iter()
                    .find_map(|plugin| plugin.expand(directive, ctx))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl std::fmt::Debug for TemplatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
