//! The factoid engine: one entry point per inbound chat message.

use super::dispatcher::{AddForm, Command, classify_message};
use super::selection::{RandomSource, Recall, SelectionEngine, ThreadRandom};
use super::{FocusState, KeyNormalizer};
use crate::config::FactkeeperConfig;
use crate::models::{
    Chance, ChatMessage, EventMeta, Factoid, FactoidEvent, FactoidId, FactoidKind, MessageKind,
    Provenance, Reply, ScopeId,
};
use crate::observability::EventBus;
use crate::rendering::{ExpandContext, TemplatePipeline};
use crate::storage::FactoidStore;
use crate::transport::{FloodControl, FloodSuspension, NoFloodControl, ReplySink};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const EVENT_SOURCE: &str = "factoid_engine";

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The bot's own nick, for addressing and `$bot`.
    pub bot_nick: String,
    /// Largest key `literal` will dump in a public scope.
    pub literal_public_limit: usize,
}

impl EngineConfig {
    /// Takes the engine tunables out of the loaded configuration.
    #[must_use]
    pub fn from_config(config: &FactkeeperConfig) -> Self {
        Self {
            bot_nick: config.bot_nick.clone(),
            literal_public_limit: config.engine.literal_public_limit,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&FactkeeperConfig::default())
    }
}

/// Classifies chat messages and runs the matching factoid command.
///
/// Every command error except [`Error::ReplyFailed`] is answered in the
/// channel it came from and then swallowed; only a transport that cannot
/// take replies at all is reported back to the caller.
///
/// Mutations are read-modify-write against the store with no versioning, so
/// two edits racing on the same factoid resolve as last write wins.
pub struct FactoidEngine {
    config: EngineConfig,
    store: Arc<dyn FactoidStore>,
    normalizer: KeyNormalizer,
    selector: SelectionEngine,
    pipeline: TemplatePipeline,
    focus: FocusState,
    flood: Arc<dyn FloodControl>,
    events: Option<EventBus>,
}

impl FactoidEngine {
    /// Creates an engine with the built-in template plugins, thread-local
    /// randomness and no flood control.
    #[must_use]
    pub fn new(config: EngineConfig, store: Arc<dyn FactoidStore>) -> Self {
        Self {
            normalizer: KeyNormalizer::new(&config.bot_nick),
            selector: SelectionEngine::new(Arc::clone(&store), Arc::new(ThreadRandom)),
            pipeline: TemplatePipeline::with_builtins(),
            focus: FocusState::new(),
            flood: Arc::new(NoFloodControl),
            events: None,
            config,
            store,
        }
    }

    /// Replaces the randomness used for selection and chance rolls.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.selector = SelectionEngine::new(Arc::clone(&self.store), random);
        self
    }

    /// Replaces the template pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: TemplatePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Sets the flood control suspended around `literal` dumps.
    #[must_use]
    pub fn with_flood_control(mut self, flood: Arc<dyn FloodControl>) -> Self {
        self.flood = flood;
        self
    }

    /// Publishes factoid events to `events`.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Per-scope focus.
    #[must_use]
    pub const fn focus(&self) -> &FocusState {
        &self.focus
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FactoidStore> {
        &self.store
    }

    /// Handles one inbound message, sending zero or more replies to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplyFailed`] if `sink` rejects a reply. Command
    /// failures are reported in-channel and do not surface here.
    #[instrument(
        skip_all,
        fields(scope = %message.scope, nick = %message.speaker.nick, command = tracing::field::Empty)
    )]
    pub fn handle(&self, message: &ChatMessage, sink: &dyn ReplySink) -> Result<()> {
        let start = Instant::now();
        let command = classify_message(message);
        let label = command.label();
        tracing::Span::current().record("command", label);

        let result = match command {
            Command::Add { key, value, form } => self.add(message, &key, &value, form, sink),
            Command::Delete => self.delete(message, sink),
            Command::Replace { value } => self.replace(message, &value, sink),
            Command::SetChance { expr } => self.set_chance(message, &expr, sink),
            Command::Literal { key } => self.literal(message, &key, sink),
            Command::Lookup { text } => self.lookup(message, &text, sink),
        };

        let outcome = match &result {
            Ok(()) => "ok",
            Err(err) => err.label(),
        };
        metrics::counter!("factoid_commands_total", "command" => label, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("factoid_command_duration_ms", "command" => label)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => Ok(()),
            Err(err @ Error::ReplyFailed(_)) => {
                tracing::warn!(error = %err, "reply not delivered");
                Err(err)
            },
            Err(err) => {
                if matches!(err, Error::StoreUnavailable { .. }) {
                    tracing::warn!(error = %err, "command failed");
                } else {
                    tracing::debug!(error = %err, "command refused");
                }
                sink.send(Reply::to_nick(
                    &message.scope,
                    &message.speaker.nick,
                    describe(&err),
                ))
            },
        }
    }

    fn add(
        &self,
        message: &ChatMessage,
        raw_key: &str,
        raw_value: &str,
        form: AddForm,
        sink: &dyn ReplySink,
    ) -> Result<()> {
        let key = self.normalizer.normalize(raw_key, false);
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if raw_value.trim().is_empty() {
            return Err(Error::EmptyValue { key });
        }
        let value = match form {
            AddForm::Assign => raw_value.trim().to_string(),
            AddForm::Is => format!("{} is {}", raw_key.trim(), raw_value.trim()),
        };

        let factoid = Factoid::new(key.as_str(), &value, self.provenance(message));
        if factoid.value.is_empty() {
            return Err(Error::EmptyValue { key });
        }
        let id = self.store.insert(&factoid)?;
        self.focus.set(&message.scope, id.clone());
        tracing::info!(key = %key, factoid_id = %id, kind = %factoid.kind, "factoid added");
        self.publish(FactoidEvent::Added {
            meta: EventMeta::new(EVENT_SOURCE),
            factoid_id: id,
            key: key.clone(),
            scope: message.scope.clone(),
        });

        let count = self.store.count_by_key(&key)?;
        sink.send(Reply::to_nick(
            &message.scope,
            &message.speaker.nick,
            format!("Woo, I now know {count} things about '{key}'."),
        ))
    }

    fn delete(&self, message: &ChatMessage, sink: &dyn ReplySink) -> Result<()> {
        self.with_focus_cleared(&message.scope, || {
            let id = self.focused(&message.scope)?;
            let factoid = self.store.get_by_id(&id)?;
            self.store.delete_by_id(&id)?;
            tracing::info!(key = %factoid.key, factoid_id = %id, "factoid deleted");
            self.publish(FactoidEvent::Deleted {
                meta: EventMeta::new(EVENT_SOURCE),
                factoid_id: id,
                scope: message.scope.clone(),
            });
            sink.send(Reply::to_nick(
                &message.scope,
                &message.speaker.nick,
                format!("I forgot that '{}' was '{}'.", factoid.key, factoid.value),
            ))
        })
    }

    fn replace(&self, message: &ChatMessage, raw_value: &str, sink: &dyn ReplySink) -> Result<()> {
        self.with_focus_cleared(&message.scope, || {
            let id = self.focused(&message.scope)?;
            let mut factoid = self.store.get_by_id(&id)?;
            let (kind, value) = FactoidKind::from_value(raw_value);
            if value.is_empty() {
                return Err(Error::EmptyValue { key: factoid.key });
            }

            let old = std::mem::replace(&mut factoid.value, value);
            factoid.kind = kind;
            factoid.modify(self.provenance(message));
            self.store.update_by_id(&id, &factoid)?;
            tracing::info!(key = %factoid.key, factoid_id = %id, "factoid replaced");
            self.publish(FactoidEvent::Replaced {
                meta: EventMeta::new(EVENT_SOURCE),
                factoid_id: id,
                scope: message.scope.clone(),
            });
            sink.send(Reply::to_nick(
                &message.scope,
                &message.speaker.nick,
                format!("'{}' was '{old}', now is '{}'.", factoid.key, factoid.value),
            ))
        })
    }

    fn set_chance(&self, message: &ChatMessage, expr: &str, sink: &dyn ReplySink) -> Result<()> {
        self.with_focus_cleared(&message.scope, || {
            let id = self.focused(&message.scope)?;
            let chance = Chance::parse(expr)?;
            let mut factoid = self.store.get_by_id(&id)?;

            let old = std::mem::replace(&mut factoid.chance, chance);
            factoid.modify(self.provenance(message));
            self.store.update_by_id(&id, &factoid)?;
            tracing::info!(key = %factoid.key, factoid_id = %id, %old, new = %chance, "chance changed");
            self.publish(FactoidEvent::ChanceChanged {
                meta: EventMeta::new(EVENT_SOURCE),
                factoid_id: id,
                old: old.value(),
                new: chance.value(),
            });
            sink.send(Reply::to_nick(
                &message.scope,
                &message.speaker.nick,
                format!(
                    "'{}' was at {old} chance, now is at {chance}.",
                    factoid.key
                ),
            ))
        })
    }

    fn literal(&self, message: &ChatMessage, raw_key: &str, sink: &dyn ReplySink) -> Result<()> {
        let key = self.normalizer.normalize(raw_key, false);
        let count = self.store.count_by_key(&key)?;
        if count == 0 {
            return Err(Error::UnknownKey(key));
        }
        if message.public && count > self.config.literal_public_limit {
            return Err(Error::TooManyMatchesPublic { key, count });
        }

        let _suspended = FloodSuspension::new(self.flood.as_ref(), &message.scope);
        let mut last = None;
        self.store.for_each_by_key(&key, &mut |factoid| {
            sink.send(Reply::statement(&message.scope, factoid.value))?;
            last = Some(factoid.id);
            Ok(())
        })?;
        if let Some(id) = last {
            self.focus.set(&message.scope, id);
        }
        tracing::debug!(key = %key, count, "literal dump");
        Ok(())
    }

    fn lookup(&self, message: &ChatMessage, text: &str, sink: &dyn ReplySink) -> Result<()> {
        let key = self.normalizer.normalize(text, !message.addressed);
        let mut recall = self.selector.recall(&key)?;
        if recall.is_miss()
            && message.kind == MessageKind::Action
            && let Some(stripped) = self.normalizer.strip_trailing_nick(&key)
        {
            tracing::debug!(key = %stripped, "retrying action without bot nick");
            recall = self.selector.recall(&stripped)?;
        }
        let Recall::Hit(mut factoid) = recall else {
            return Ok(());
        };

        let ctx = ExpandContext::from_message(message, &self.config.bot_nick);
        let text = self.pipeline.expand(&factoid.value, &ctx);
        let reply = match factoid.kind {
            FactoidKind::Statement => Reply::statement(&message.scope, text),
            FactoidKind::Action => Reply::action(&message.scope, text),
        };
        sink.send(reply)?;

        factoid.access(self.provenance(message));
        self.store.update_by_id(&factoid.id, &factoid)?;
        self.focus.set(&message.scope, factoid.id.clone());
        self.publish(FactoidEvent::Recalled {
            meta: EventMeta::new(EVENT_SOURCE),
            factoid_id: factoid.id,
            scope: message.scope.clone(),
        });
        Ok(())
    }

    /// Runs a follow-up command, clearing the scope's focus however it ends.
    fn with_focus_cleared(&self, scope: &ScopeId, op: impl FnOnce() -> Result<()>) -> Result<()> {
        let result = op();
        self.focus.clear(scope);
        result
    }

    fn focused(&self, scope: &ScopeId) -> Result<FactoidId> {
        self.focus.get(scope).ok_or(Error::NothingInFocus)
    }

    fn provenance(&self, message: &ChatMessage) -> Provenance {
        Provenance::now(&message.speaker, &message.scope)
    }

    fn publish(&self, event: FactoidEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl std::fmt::Debug for FactoidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoidEngine")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("focused_scopes", &self.focus.len())
            .finish_non_exhaustive()
    }
}

/// The in-channel wording for a failed command, without the nick prefix.
#[must_use]
pub fn describe(err: &Error) -> String {
    match err {
        Error::EmptyKey => "I can't learn something about nothing.".to_string(),
        Error::EmptyValue { key } => format!("I can't remember nothing about '{key}'."),
        Error::NothingInFocus | Error::NotFound(_) => {
            "Whatever that was, I've already forgotten it.".to_string()
        },
        Error::BadChanceFormat { input, percent } => {
            let form = if *percent { "a % chance" } else { "a chance" };
            format!("'{input}' didn't look like {form} to me.")
        },
        Error::ChanceOutOfRange(input) => {
            format!("'{input}' was outside possible chance ranges.")
        },
        Error::UnknownKey(key) => format!("I don't know anything about '{key}'."),
        Error::TooManyMatchesPublic { key, .. } => {
            format!("I know too much about '{key}', ask me privately.")
        },
        other => format!("Oh no! {other}."),
    }
}
