//! Disposable Scope - cleanup callbacks released together.
//!
//! Every layout owns one scope. Hooks register event subscriptions and
//! reactive effects into it, and the lifecycle core flushes it at teardown:
//! callbacks run in registration order, async ones are awaited before the
//! next one starts.
//!
//! # Example
//!
//! ```ignore
//! let scope = DisposableScope::new();
//!
//! // Effect runs now and is stopped on flush
//! scope.effect(move || println!("count = {}", count.get()));
//!
//! // Listener is removed on flush
//! scope.listen(&window, "resize", |_| relayout());
//!
//! scope.flush().await;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use futures::future::LocalBoxFuture;
use spark_signals::effect;

use crate::dom::{Event, ListenerId, Node};
use crate::types::Cleanup;

// =============================================================================
// Disposer
// =============================================================================

/// A cleanup callback, synchronous or asynchronous.
pub enum Disposer {
    Sync(Cleanup),
    Async(Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>),
}

impl Disposer {
    /// Wrap a synchronous callback.
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Disposer::Sync(Box::new(callback))
    }

    /// Wrap a callback that returns a future.
    pub fn future<F, Fut>(callback: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Disposer::Async(Box::new(move || Box::pin(callback())))
    }

    /// Run the callback, awaiting it if it is asynchronous.
    pub async fn dispose(self) {
        match self {
            Disposer::Sync(callback) => callback(),
            Disposer::Async(callback) => callback().await,
        }
    }
}

impl From<Cleanup> for Disposer {
    fn from(cleanup: Cleanup) -> Self {
        Disposer::Sync(cleanup)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposer::Sync(_) => f.write_str("Disposer::Sync"),
            Disposer::Async(_) => f.write_str("Disposer::Async"),
        }
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Bag of cleanup callbacks owned by one layout.
#[derive(Default)]
pub struct DisposableScope {
    disposers: RefCell<Vec<Disposer>>,
}

impl DisposableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous cleanup.
    pub fn add(&self, callback: impl FnOnce() + 'static) {
        self.push(Disposer::new(callback));
    }

    /// Register an asynchronous cleanup.
    pub fn add_future<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.push(Disposer::future(callback));
    }

    /// Register an existing disposer.
    pub fn push(&self, disposer: Disposer) {
        self.disposers.borrow_mut().push(disposer);
    }

    /// Run `f` as a reactive effect and stop it when the scope is flushed.
    ///
    /// The effect runs once immediately and again whenever a signal it read
    /// changes.
    pub fn effect(&self, f: impl FnMut() + 'static) {
        let stop = effect(f);
        self.add(stop);
    }

    /// Add an event listener to `target` and remove it when the scope is
    /// flushed.
    pub fn listen(
        &self,
        target: &Node,
        event: &str,
        handler: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        let id = target.add_listener(event, handler);
        let target = target.clone();
        self.add(move || {
            target.remove_listener(id);
        });
        id
    }

    /// Number of pending cleanups.
    pub fn len(&self) -> usize {
        self.disposers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.disposers.borrow().is_empty()
    }

    /// Run every registered cleanup in registration order.
    ///
    /// Cleanups registered while flushing are kept for the next flush.
    /// Returns how many ran.
    pub async fn flush(&self) -> usize {
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        let count = disposers.len();
        for disposer in disposers {
            disposer.dispose().await;
        }
        if count > 0 {
            tracing::trace!(count, "disposable scope flushed");
        }
        count
    }
}
