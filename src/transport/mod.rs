//! Boundary between the engine and a chat network.
//!
//! The engine never talks to a network directly: it hands replies to a
//! [`ReplySink`] and asks a [`FloodControl`] to stand aside while it dumps a
//! key with `literal`.

mod addressing;
mod console;

pub use addressing::{Addressing, strip_bot_prefix};
pub use console::ConsoleTransport;

use crate::models::{Reply, ScopeId};
use crate::{Error, Result};
use std::sync::Mutex;

/// Delivers outbound replies.
pub trait ReplySink: Send + Sync {
    /// Sends one reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplyFailed`] if the transport cannot deliver it.
    fn send(&self, reply: Reply) -> Result<()>;
}

/// A transport's outbound rate limiter, as seen by the engine.
pub trait FloodControl: Send + Sync {
    /// Lets replies to `scope` through unthrottled.
    fn suspend(&self, scope: &ScopeId);

    /// Restores normal throttling for `scope`.
    fn resume(&self, scope: &ScopeId);
}

/// Suspends flood control for a scope until dropped.
#[must_use = "flood control resumes as soon as the guard is dropped"]
pub struct FloodSuspension<'a> {
    control: &'a dyn FloodControl,
    scope: ScopeId,
}

impl<'a> FloodSuspension<'a> {
    /// Suspends `control` for `scope`.
    pub fn new(control: &'a dyn FloodControl, scope: &ScopeId) -> Self {
        control.suspend(scope);
        tracing::debug!(scope = %scope, "flood control suspended");
        Self {
            control,
            scope: scope.clone(),
        }
    }
}

impl Drop for FloodSuspension<'_> {
    fn drop(&mut self) {
        self.control.resume(&self.scope);
        tracing::debug!(scope = %self.scope, "flood control resumed");
    }
}

/// Flood control for transports without a rate limiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFloodControl;

impl FloodControl for NoFloodControl {
    fn suspend(&self, _scope: &ScopeId) {}

    fn resume(&self, _scope: &ScopeId) {}
}

/// Sink that keeps replies in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct BufferedSink {
    replies: Mutex<Vec<Reply>>,
}

impl BufferedSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything sent so far.
    pub fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.lock())
    }

    /// Text of everything sent so far, leaving the buffer intact.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.text.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Reply>> {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ReplySink for BufferedSink {
    fn send(&self, reply: Reply) -> Result<()> {
        self.lock().push(reply);
        Ok(())
    }
}

/// Converts an IO failure into [`Error::ReplyFailed`].
pub(crate) fn reply_failed(e: &std::io::Error) -> Error {
    Error::ReplyFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Default)]
    struct Counting(AtomicI32);

    impl FloodControl for Counting {
        fn suspend(&self, _scope: &ScopeId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&self, _scope: &ScopeId) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_suspension_resumes_on_drop() {
        let control = Counting::default();
        {
            let _guard = FloodSuspension::new(&control, &ScopeId::new("#c"));
            assert_eq!(control.0.load(Ordering::SeqCst), 1);
        }
        assert_eq!(control.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suspension_resumes_on_early_return() {
        fn dump(control: &Counting) -> Result<()> {
            let _guard = FloodSuspension::new(control, &ScopeId::new("#c"));
            Err(Error::store("for_each_by_key", "gone"))
        }

        let control = Counting::default();
        assert!(dump(&control).is_err());
        assert_eq!(control.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_buffered_sink_take_drains() {
        let sink = BufferedSink::new();
        sink.send(Reply::statement(&ScopeId::new("#c"), "one"))
            .expect("send");
        assert_eq!(sink.texts(), ["one"]);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.take().is_empty());
    }
}
