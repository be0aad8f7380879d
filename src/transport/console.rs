//! Line-oriented console transport.

use super::{FloodControl, ReplySink, reply_failed};
use crate::Result;
use crate::models::{MessageKind, Reply, ScopeId};
use dashmap::DashMap;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Writes replies to a stream, pacing them per scope unless flood control
/// is suspended for that scope.
pub struct ConsoleTransport {
    bot_nick: String,
    out: Mutex<Box<dyn Write + Send>>,
    min_interval: Duration,
    last_sent: DashMap<ScopeId, Instant>,
    suspended: DashMap<ScopeId, usize>,
}

impl ConsoleTransport {
    /// Console transport writing to stdout.
    #[must_use]
    pub fn stdout(bot_nick: impl Into<String>, min_interval: Duration) -> Self {
        Self::with_writer(bot_nick, min_interval, Box::new(io::stdout()))
    }

    /// Console transport writing to an arbitrary stream.
    #[must_use]
    pub fn with_writer(
        bot_nick: impl Into<String>,
        min_interval: Duration,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            bot_nick: bot_nick.into(),
            out: Mutex::new(out),
            min_interval,
            last_sent: DashMap::new(),
            suspended: DashMap::new(),
        }
    }

    /// Whether flood control is currently suspended for `scope`.
    #[must_use]
    pub fn is_suspended(&self, scope: &ScopeId) -> bool {
        self.suspended.get(scope).is_some_and(|depth| *depth > 0)
    }

    fn pace(&self, scope: &ScopeId) {
        if self.min_interval.is_zero() || self.is_suspended(scope) {
            return;
        }
        let wait = self
            .last_sent
            .get(scope)
            .map(|last| self.min_interval.saturating_sub(last.elapsed()));
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            std::thread::sleep(wait);
        }
    }

    fn format(&self, reply: &Reply) -> String {
        match reply.kind {
            MessageKind::Statement => format!("[{}] <{}> {}", reply.scope, self.bot_nick, reply.text),
            MessageKind::Action => format!("[{}] * {} {}", reply.scope, self.bot_nick, reply.text),
        }
    }
}

impl ReplySink for ConsoleTransport {
    fn send(&self, reply: Reply) -> Result<()> {
        self.pace(&reply.scope);
        let line = self.format(&reply);
        {
            let mut out = self
                .out
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            writeln!(out, "{line}").map_err(|e| reply_failed(&e))?;
            out.flush().map_err(|e| reply_failed(&e))?;
        }
        self.last_sent.insert(reply.scope, Instant::now());
        Ok(())
    }
}

impl FloodControl for ConsoleTransport {
    fn suspend(&self, scope: &ScopeId) {
        *self.suspended.entry(scope.clone()).or_insert(0) += 1;
    }

    fn resume(&self, scope: &ScopeId) {
        if let Some(mut depth) = self.suspended.get_mut(scope) {
            *depth = depth.saturating_sub(1);
        }
        // Re-checked under the shard lock: a suspend in between keeps the entry.
        self.suspended.remove_if(scope, |_, depth| *depth == 0);
    }
}

impl std::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("bot_nick", &self.bot_nick)
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}
