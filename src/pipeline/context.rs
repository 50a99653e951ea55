use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::Error;

const PENDING: u8 = 0;
const CANCELLED: u8 = 1;
const DEADLINE_EXCEEDED: u8 = 2;

/// Cancellation scope shared by every task a pipeline spawns.
///
/// A `Context` starts pending and finishes at most once, either through an
/// explicit [`cancel`](Context::cancel) or through an expired deadline; the
/// first cause wins and is reported by [`err`](Context::err). Child scopes
/// derived with [`child`](Context::child) or
/// [`child_with_timeout`](Context::child_with_timeout) finish when their
/// parent does.
///
/// [`is_done`](Context::is_done) and [`err`](Context::err) consult the
/// ancestor chain and deadlines synchronously, so a check never trails a
/// timer that already fired; [`done`](Context::done) wake-ups ride on small
/// watcher tasks that end with their scope.
#[derive(Clone, Default)]
pub struct Context {
    state: Arc<State>,
}

#[derive(Default)]
struct State {
    cause: AtomicU8,
    notify: Notify,
    deadline: Option<Instant>,
    parent: Option<Arc<State>>,
}

impl State {
    fn effective_cause(&self) -> u8 {
        let cause = self.cause.load(Ordering::SeqCst);
        if cause != PENDING {
            return cause;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return DEADLINE_EXCEEDED;
            }
        }
        match &self.parent {
            Some(parent) => parent.effective_cause(),
            None => PENDING,
        }
    }
}

impl Context {
    /// A scope that finishes only when the caller cancels it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Cancel this scope. Idempotent.
    pub fn cancel(&self) {
        self.finish(CANCELLED);
    }

    fn finish(&self, cause: u8) {
        if self
            .state
            .cause
            .compare_exchange(PENDING, cause, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_done(&self) -> bool {
        self.state.effective_cause() != PENDING
    }

    /// The error a work unit should fail with, or `None` while the scope is
    /// still live.
    pub fn err(&self) -> Option<Error> {
        match self.state.effective_cause() {
            CANCELLED => Some(Error::Cancelled),
            DEADLINE_EXCEEDED => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the scope finishes. Safe to await from many tasks.
    pub async fn done(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        // Register interest before re-checking, so a concurrent cancel
        // cannot slip between the check and the await.
        notified.as_mut().enable();
        if self.is_done() {
            return;
        }
        notified.await;
    }

    /// Derive a scope that finishes when `self` finishes.
    pub fn child(&self) -> Context {
        let child = self.derive(None);
        if self.is_done() {
            child.finish(self.state.effective_cause());
            return child;
        }

        let parent = self.clone();
        let watched = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.done() => watched.finish(parent.state.effective_cause()),
                _ = watched.done() => {}
            }
        });

        child
    }

    /// Derive a scope that additionally expires after `timeout`.
    ///
    /// Must be called from within a tokio runtime; the watcher tracking the
    /// deadline ends as soon as either scope finishes.
    pub fn child_with_timeout(&self, timeout: Duration) -> Context {
        let deadline = Instant::now() + timeout;
        let child = self.derive(Some(deadline));
        if self.is_done() {
            child.finish(self.state.effective_cause());
            return child;
        }

        let parent = self.clone();
        let watched = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.done() => watched.finish(parent.state.effective_cause()),
                _ = tokio::time::sleep_until(deadline) => watched.finish(DEADLINE_EXCEEDED),
                _ = watched.done() => {}
            }
        });

        child
    }

    fn derive(&self, deadline: Option<Instant>) -> Context {
        Context {
            state: Arc::new(State {
                cause: AtomicU8::new(PENDING),
                notify: Notify::new(),
                deadline,
                parent: Some(Arc::clone(&self.state)),
            }),
        }
    }
}
