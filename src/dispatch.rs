//! Cross-thread work dispatch onto the presentation thread
//!
//! Everything that touches the rendering surface, the rolling buffers or the
//! subscription epoch lives in one presentation context that is only ever
//! mutated on one thread. Network callbacks arrive on other threads and hand
//! their work over through a [`Dispatcher`].
//!
//! # Main Types
//!
//! - [`Dispatcher`] - Owns the presentation context and a queue of pending work
//! - [`WeakDispatcher`] - Non-owning handle for producers held by the context
//! - [`Waitable`] - Completion signal returned by [`Dispatcher::invoke`]
//!
//! # Ordering
//!
//! Work from one producer thread runs in the order it was invoked. A call to
//! [`Dispatcher::drain`] only runs what was queued when it started; work
//! queued by a drained item waits for the next drain.
//!
//! ```ignore
//! let dispatcher = Dispatcher::new(Vec::<u32>::new());
//! let remote = dispatcher.clone();
//! std::thread::spawn(move || {
//!     remote.invoke(|ctx| ctx.push(7));
//! }).join().unwrap();
//! dispatcher.drain()?;
//! ```

use crate::error::{GridLinesError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Interval used when polling a [`Waitable`] from the tick
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

type Work<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

struct Queued<T> {
    work: Work<T>,
    done: Waitable,
}

struct Inner<T> {
    tx: Sender<Queued<T>>,
    rx: Receiver<Queued<T>>,
    owner: ThreadId,
    context: Mutex<T>,
    ready: Waitable,
}

/// Single-consumer dispatcher bound to the thread that created it
///
/// Cloning is cheap; every clone shares the same queue and context.
pub struct Dispatcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Dispatcher<T> {
    /// Create a dispatcher whose presentation thread is the calling thread
    pub fn new(context: T) -> Self {
        let (tx, rx) = unbounded();
        Self {
            inner: Arc::new(Inner {
                tx,
                rx,
                owner: thread::current().id(),
                context: Mutex::new(context),
                ready: Waitable::signaled(),
            }),
        }
    }

    /// Non-owning handle, for producers stored inside the context itself
    pub fn downgrade(&self) -> WeakDispatcher<T> {
        WeakDispatcher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether the caller is on the presentation thread
    pub fn is_presentation_thread(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    /// Number of work items waiting for the next drain
    pub fn pending(&self) -> usize {
        self.inner.rx.len()
    }

    /// Run `work` against the presentation context.
    ///
    /// On the presentation thread the work runs before this returns and the
    /// returned signal is already set. Anywhere else, or when the context is
    /// already in use further up the presentation stack, the work is queued
    /// for the next [`drain`](Self::drain).
    pub fn invoke<F>(&self, work: F) -> Waitable
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        if self.is_presentation_thread() {
            let guard = match self.inner.context.try_lock() {
                Ok(guard) => Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => None,
            };

            if let Some(mut ctx) = guard {
                work(&mut ctx);
                return self.inner.ready.clone();
            }
            tracing::trace!("Re-entrant invoke deferred to next drain");
        }

        let done = Waitable::new();
        let queued = Queued {
            work: Box::new(work),
            done: done.clone(),
        };

        // The receiver lives in `inner`, so the channel cannot be disconnected
        // while a sender exists.
        let _ = self.inner.tx.send(queued);
        done
    }

    /// Run every queued work item available right now, in FIFO order.
    ///
    /// Returns the number of items executed.
    pub fn drain(&self) -> Result<usize> {
        if !self.is_presentation_thread() {
            return Err(GridLinesError::WrongThread("Dispatcher::drain"));
        }

        let mut ctx = self.lock_for("Dispatcher::drain")?;
        let available = self.inner.rx.len();
        let mut executed = 0;

        for _ in 0..available {
            let Ok(queued) = self.inner.rx.try_recv() else {
                break;
            };
            (queued.work)(&mut ctx);
            queued.done.signal();
            executed += 1;
        }

        if executed > 0 {
            tracing::trace!("Drained {} dispatched work item(s)", executed);
        }
        Ok(executed)
    }

    /// Borrow the presentation context directly
    pub fn with_context<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        if !self.is_presentation_thread() {
            return Err(GridLinesError::WrongThread("Dispatcher::with_context"));
        }

        let mut ctx = self.lock_for("Dispatcher::with_context")?;
        Ok(f(&mut ctx))
    }

    fn lock_for(&self, operation: &'static str) -> Result<MutexGuard<'_, T>> {
        match self.inner.context.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(GridLinesError::Reentrant(operation)),
        }
    }
}

/// Weak counterpart of [`Dispatcher`]
pub struct WeakDispatcher<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for WeakDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakDispatcher<T> {
    /// The dispatcher, if it is still alive
    pub fn upgrade(&self) -> Option<Dispatcher<T>> {
        self.inner.upgrade().map(|inner| Dispatcher { inner })
    }
}

/// One-shot completion signal
#[derive(Clone)]
pub struct Waitable {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Default for Waitable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Waitable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waitable")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

impl Waitable {
    /// Create an unsignaled waitable
    pub fn new() -> Self {
        Self {
            state: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Create a waitable that is already signaled
    pub fn signaled() -> Self {
        Self {
            state: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    /// Set the signal and wake every waiter
    pub fn signal(&self) {
        let (flag, cvar) = &*self.state;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Whether the signal has been set
    pub fn is_signaled(&self) -> bool {
        *self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout` for the signal; returns whether it was set
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.state;
        let deadline = Instant::now() + timeout;
        let mut signaled = flag.lock().unwrap_or_else(PoisonError::into_inner);

        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(signaled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            signaled = guard;
        }
        true
    }

    /// Block until the signal is set
    ///
    /// Never call this on the presentation thread for work queued to the
    /// same dispatcher; nothing would drain it.
    pub fn wait(&self) {
        let (flag, cvar) = &*self.state;
        let mut signaled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*signaled {
            signaled = cvar.wait(signaled).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_on_owner_runs_synchronously() {
        let dispatcher = Dispatcher::new(0u32);
        let done = dispatcher.invoke(|ctx| *ctx += 1);

        assert!(done.is_signaled());
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(dispatcher.with_context(|ctx| *ctx).unwrap(), 1);
    }

    #[test]
    fn test_invoke_from_other_thread_is_deferred() {
        let dispatcher = Dispatcher::new(Vec::<u32>::new());
        let remote = dispatcher.clone();

        let signals = thread::spawn(move || {
            (1..=3)
                .map(|i| remote.invoke(move |ctx| ctx.push(i)))
                .collect::<Vec<_>>()
        })
        .join()
        .unwrap();

        assert!(signals.iter().all(|s| !s.is_signaled()));
        assert!(dispatcher.with_context(|ctx| ctx.is_empty()).unwrap());

        assert_eq!(dispatcher.drain().unwrap(), 3);
        assert!(signals.iter().all(|s| s.is_signaled()));
        assert_eq!(dispatcher.with_context(|ctx| ctx.clone()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reentrant_invoke_runs_on_next_drain() {
        let dispatcher = Dispatcher::new(Vec::<&'static str>::new());
        let inner = dispatcher.clone();

        let remote = dispatcher.clone();
        thread::spawn(move || {
            remote.invoke(move |ctx| {
                ctx.push("outer");
                let nested = inner.invoke(|ctx| ctx.push("nested"));
                assert!(!nested.is_signaled());
            });
        })
        .join()
        .unwrap();

        assert_eq!(dispatcher.drain().unwrap(), 1);
        assert_eq!(dispatcher.with_context(|ctx| ctx.clone()).unwrap(), vec!["outer"]);

        assert_eq!(dispatcher.drain().unwrap(), 1);
        assert_eq!(
            dispatcher.with_context(|ctx| ctx.clone()).unwrap(),
            vec!["outer", "nested"]
        );
    }

    #[test]
    fn test_drain_off_thread_is_rejected() {
        let dispatcher = Dispatcher::new(());
        let remote = dispatcher.clone();

        let result = thread::spawn(move || remote.drain()).join().unwrap();
        assert!(matches!(result, Err(GridLinesError::WrongThread(_))));
    }

    #[test]
    fn test_with_context_inside_work_is_reentrant_error() {
        let dispatcher = Dispatcher::new(0u32);
        let nested = dispatcher.clone();

        let result = dispatcher
            .with_context(|_| nested.with_context(|ctx| *ctx))
            .unwrap();
        assert!(matches!(result, Err(GridLinesError::Reentrant(_))));
    }

    #[test]
    fn test_weak_handle_does_not_keep_context_alive() {
        let dispatcher = Dispatcher::new(());
        let weak = dispatcher.downgrade();
        assert!(weak.upgrade().is_some());

        drop(dispatcher);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_waitable_timeout_and_signal() {
        let waitable = Waitable::new();
        assert!(!waitable.wait_timeout(POLL_INTERVAL));

        let remote = waitable.clone();
        let handle = thread::spawn(move || remote.signal());
        waitable.wait();
        handle.join().unwrap();

        assert!(waitable.is_signaled());
        assert!(waitable.wait_timeout(Duration::ZERO));
    }
}
