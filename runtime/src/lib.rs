//! # Intent Pay Runtime
//!
//! Runtime implementation for the intent-pay state container.
//!
//! This crate provides the Store runtime that owns state, runs the reducer
//! on every dispatched event, and fans the resulting change out to
//! subscribers.
//!
//! ## Core Components
//!
//! - **Store**: Owns state and coordinates dispatch
//! - **Subscriptions**: Synchronous listeners invoked on every state change
//! - **Wait helpers**: Async bridges that resolve once state matches a condition
//! - **Metrics**: Prometheus instrumentation for dispatch, effects, and pollers
//!
//! ## Example
//!
//! ```ignore
//! use intent_pay_runtime::Store;
//!
//! let store = Store::new(PaymentState::Idle, PaymentReducer);
//!
//! let subscription = store.subscribe(|change| {
//!     println!("{:?} -> {:?}", change.prev, change.next);
//! });
//!
//! store.dispatch(PaymentEvent::Reset);
//!
//! store.unsubscribe(subscription);
//! ```

use intent_pay_core::{Reducer, StateChange};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Prometheus metrics for observability
pub mod metrics;

/// Async helpers for awaiting state conditions
pub mod wait;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while waiting on Store state
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The state machine entered its error state while waiting
        ///
        /// The display form is the error state's own message, so this
        /// variant can be surfaced to callers unchanged.
        #[error("{message}")]
        ErrorState {
            /// Message carried by the error state
            message: String,
        },

        /// State change channel closed
        ///
        /// The change feed was closed, which only happens when the store
        /// itself has been dropped.
        #[error("State change channel closed")]
        ChannelClosed,

        /// Timeout waiting for a matching state
        ///
        /// Returned by `wait_for_state_timeout` when the deadline expires
        /// before the condition is met.
        #[error("Timeout waiting for state")]
        Timeout,
    }
}

/// Store runtime that owns state and fans out change notifications.
pub mod store {
    use super::{
        Arc, AssertUnwindSafe, AtomicU64, Instant, Mutex, Ordering, Reducer, RwLock, StateChange,
        catch_unwind,
    };
    use crate::metrics::StoreMetrics;
    use tokio::sync::broadcast;

    /// Handle returned by [`Store::subscribe`], used to unsubscribe.
    ///
    /// Ids are unique per store and never reused, so unsubscribing twice
    /// (or unsubscribing an already-removed listener) is a no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SubscriptionId(u64);

    impl SubscriptionId {
        /// Numeric value of this id, for logging.
        #[must_use]
        pub const fn value(self) -> u64 {
            self.0
        }
    }

    type Listener<S, E> = Arc<dyn Fn(&StateChange<S, E>) + Send + Sync>;

    /// The Store - owns state for a reducer and notifies subscribers of
    /// every transition
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (pure transition logic)
    /// 3. Subscribers (synchronous listeners, notified on every dispatch)
    /// 4. A broadcast feed of changes for async waiters
    ///
    /// Dispatch is synchronous: by the time [`Store::dispatch`] returns, the
    /// state has been swapped and every subscriber has observed the change.
    /// Cloning a Store is cheap and clones share the same state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::new(PaymentState::Idle, PaymentReducer);
    ///
    /// store.dispatch(PaymentEvent::SetPayId { id });
    ///
    /// let state = store.state();
    /// ```
    pub struct Store<R>
    where
        R: Reducer,
    {
        inner: Arc<Inner<R>>,
    }

    struct Inner<R>
    where
        R: Reducer,
    {
        state: RwLock<R::State>,
        reducer: R,
        listeners: Mutex<Vec<(SubscriptionId, Listener<R::State, R::Event>)>>,
        next_subscription: AtomicU64,
        changes: broadcast::Sender<StateChange<R::State, R::Event>>,
    }

    impl<R> Store<R>
    where
        R: Reducer,
        R::Event: Clone,
    {
        /// Create a new store with an initial state and reducer
        ///
        /// The change feed buffers 16 changes for async waiters; use
        /// [`Store::with_change_capacity`] if waiters are expected to lag.
        #[must_use]
        pub fn new(initial_state: R::State, reducer: R) -> Self {
            Self::with_change_capacity(initial_state, reducer, 16)
        }

        /// Create a new store with a custom change feed capacity
        ///
        /// A waiter that falls more than `capacity` changes behind receives
        /// a lag notice and re-reads the current state, so nothing is lost,
        /// but intermediate changes will not be observed individually.
        #[must_use]
        pub fn with_change_capacity(
            initial_state: R::State,
            reducer: R,
            capacity: usize,
        ) -> Self {
            let (changes, _) = broadcast::channel(capacity);

            Self {
                inner: Arc::new(Inner {
                    state: RwLock::new(initial_state),
                    reducer,
                    listeners: Mutex::new(Vec::new()),
                    next_subscription: AtomicU64::new(0),
                    changes,
                }),
            }
        }

        /// Dispatch an event through the reducer
        ///
        /// Runs the reducer against the current state, swaps in the result,
        /// then notifies subscribers in registration order with the full
        /// change (previous state, next state, and the event). Async waiters
        /// on the change feed are notified after synchronous subscribers.
        ///
        /// A subscriber that panics is logged and skipped; the remaining
        /// subscribers are still notified. A subscriber may itself dispatch
        /// further events; the nested change is applied and notified in full
        /// before the outer notification continues.
        ///
        /// Concurrent dispatches from different threads serialize on the
        /// state lock. Every subscriber sees every change, but notification
        /// order between racing dispatches is unspecified.
        #[tracing::instrument(skip(self, event), name = "store_dispatch")]
        pub fn dispatch(&self, event: R::Event) {
            let started = Instant::now();

            let change = {
                let mut state = self
                    .inner
                    .state
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let prev = state.clone();
                let next = self.inner.reducer.reduce(&prev, &event);
                *state = next.clone();
                StateChange { prev, next, event }
            };

            // Listeners are snapshotted so a callback can subscribe or
            // unsubscribe without deadlocking on the registry lock. A
            // listener added during notification sees the next change.
            let listeners: Vec<_> = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone();

            for (id, listener) in &listeners {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(&change))) {
                    let message = if let Some(s) = panic.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "opaque panic payload".to_string()
                    };
                    tracing::error!(
                        subscription = id.value(),
                        panic = %message,
                        "Subscriber panicked during notification"
                    );
                    StoreMetrics::record_subscriber_panic();
                }
            }

            // A send error only means no async waiter is subscribed.
            let _ = self.inner.changes.send(change);

            StoreMetrics::record_dispatch(started.elapsed());
            tracing::debug!(listeners = listeners.len(), "Dispatch completed");
        }

        /// Get a clone of the current state
        #[must_use]
        pub fn state(&self) -> R::State {
            self.inner
                .state
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        /// Read current state via a closure
        ///
        /// Access state through a closure to avoid cloning when only a
        /// projection is needed:
        ///
        /// ```ignore
        /// let order_id = store.read(|s| s.order_id());
        /// ```
        pub fn read<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            let state = self
                .inner
                .state
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            f(&state)
        }

        /// Register a listener invoked synchronously on every state change
        ///
        /// Listeners run in registration order, on the thread that called
        /// [`Store::dispatch`]. The returned id can be passed to
        /// [`Store::unsubscribe`].
        pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
        where
            F: Fn(&StateChange<R::State, R::Event>) + Send + Sync + 'static,
        {
            let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
            self.inner
                .listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((id, Arc::new(listener)));
            id
        }

        /// Remove a previously registered listener
        ///
        /// Unknown or already-removed ids are ignored, so calling this twice
        /// with the same id is harmless.
        pub fn unsubscribe(&self, id: SubscriptionId) {
            self.inner
                .listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .retain(|(existing, _)| *existing != id);
        }

        /// Subscribe to the async change feed
        ///
        /// Returns a receiver that gets a clone of every [`StateChange`]
        /// after synchronous subscribers have run. Used by the helpers in
        /// [`crate::wait`]; most callers want those instead.
        #[must_use]
        pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange<R::State, R::Event>> {
            self.inner.changes.subscribe()
        }

        /// Number of currently registered synchronous listeners
        #[must_use]
        pub fn subscriber_count(&self) -> usize {
            self.inner
                .listeners
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        }
    }

    impl<R> Clone for Store<R>
    where
        R: Reducer,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }
}

// Re-export for convenience
pub use error::StoreError;
pub use store::{Store, SubscriptionId};
pub use wait::{wait_for_state, wait_for_state_timeout};

// Test module
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    // Test state
    #[derive(Debug, Clone, PartialEq)]
    enum TestState {
        Idle,
        Running { count: i32 },
        Failed { message: String },
    }

    // Test event
    #[derive(Debug, Clone)]
    enum TestEvent {
        Start,
        Increment,
        Fail { message: String },
        Reset,
    }

    // Test reducer
    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Event = TestEvent;

        fn reduce(&self, prev: &Self::State, event: &Self::Event) -> Self::State {
            match (prev, event) {
                (TestState::Idle, TestEvent::Start) => TestState::Running { count: 0 },
                (TestState::Running { count }, TestEvent::Increment) => {
                    TestState::Running { count: count + 1 }
                }
                (_, TestEvent::Fail { message }) => TestState::Failed {
                    message: message.clone(),
                },
                (_, TestEvent::Reset) => TestState::Idle,
                _ => prev.clone(),
            }
        }
    }

    fn running_count(state: &TestState) -> Option<i32> {
        match state {
            TestState::Running { count } => Some(*count),
            _ => None,
        }
    }

    fn failure_message(state: &TestState) -> Option<String> {
        match state {
            TestState::Failed { message } => Some(message.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_store_creation() {
        let store = Store::new(TestState::Idle, TestReducer);
        assert_eq!(store.state(), TestState::Idle);
    }

    #[test]
    fn test_dispatch_applies_reducer() {
        let store = Store::new(TestState::Idle, TestReducer);

        store.dispatch(TestEvent::Start);
        assert_eq!(store.state(), TestState::Running { count: 0 });

        store.dispatch(TestEvent::Increment);
        store.dispatch(TestEvent::Increment);
        assert_eq!(store.state(), TestState::Running { count: 2 });
    }

    #[test]
    fn test_unrecognized_event_keeps_state() {
        let store = Store::new(TestState::Idle, TestReducer);

        store.dispatch(TestEvent::Increment);
        assert_eq!(store.state(), TestState::Idle);
    }

    #[test]
    fn test_subscriber_sees_prev_and_next() {
        let store = Store::new(TestState::Idle, TestReducer);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        store.subscribe(move |change| {
            seen_clone
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push((change.prev.clone(), change.next.clone()));
        });

        store.dispatch(TestEvent::Start);
        store.dispatch(TestEvent::Increment);

        let seen = seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(
            *seen,
            vec![
                (TestState::Idle, TestState::Running { count: 0 }),
                (TestState::Running { count: 0 }, TestState::Running { count: 1 }),
            ]
        );
    }

    #[test]
    fn test_subscribers_notified_in_registration_order() {
        let store = Store::new(TestState::Idle, TestReducer);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order_clone = Arc::clone(&order);
            store.subscribe(move |_| {
                order_clone
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(tag);
            });
        }

        store.dispatch(TestEvent::Start);

        let order = order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(*order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Store::new(TestState::Idle, TestReducer);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(TestEvent::Start);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.unsubscribe(id);
        store.dispatch(TestEvent::Increment);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Unsubscribing again is a no-op
        store.unsubscribe(id);
        store.dispatch(TestEvent::Increment);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_panic_does_not_stop_others() {
        let store = Store::new(TestState::Idle, TestReducer);
        let calls = Arc::new(AtomicUsize::new(0));

        #[allow(clippy::panic)] // Intentional panic for testing isolation
        store.subscribe(|_| {
            panic!("listener blew up");
        });

        let calls_clone = Arc::clone(&calls);
        store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(TestEvent::Start);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.state(), TestState::Running { count: 0 });

        // The store keeps working after a subscriber panic
        store.dispatch(TestEvent::Increment);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.state(), TestState::Running { count: 1 });
    }

    #[test]
    fn test_listener_can_dispatch() {
        let store = Store::new(TestState::Idle, TestReducer);

        let store_clone = store.clone();
        store.subscribe(move |change| {
            if matches!(change.event, TestEvent::Start) {
                store_clone.dispatch(TestEvent::Increment);
            }
        });

        store.dispatch(TestEvent::Start);
        assert_eq!(store.state(), TestState::Running { count: 1 });
    }

    #[test]
    fn test_read_projects_state() {
        let store = Store::new(TestState::Running { count: 7 }, TestReducer);
        let count = store.read(running_count);
        assert_eq!(count, Some(7));
    }

    #[tokio::test]
    async fn test_wait_resolves_immediately_when_state_matches() {
        let store = Store::new(TestState::Running { count: 3 }, TestReducer);

        // No dispatch needed - the fast path reads the current state
        let count = wait_for_state(&store, running_count, failure_message)
            .await
            .map_err(|e| e.to_string());
        assert_eq!(count, Ok(3));
    }

    #[tokio::test]
    async fn test_wait_resolves_on_later_dispatch() {
        let store = Store::new(TestState::Idle, TestReducer);

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { wait_for_state(&store, running_count, failure_message).await })
        };

        // Give the waiter a chance to subscribe; even if it has not, the
        // fast path will pick up the dispatched state.
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.dispatch(TestEvent::Start);

        let result = waiter.await.map_err(|e| e.to_string());
        assert_eq!(result.map(|r| r.map_err(|e| e.to_string())), Ok(Ok(0)));
    }

    #[tokio::test]
    async fn test_wait_rejects_on_error_state() {
        let store = Store::new(TestState::Idle, TestReducer);

        store.dispatch(TestEvent::Fail {
            message: "backend unavailable".to_string(),
        });

        let result = wait_for_state(&store, running_count, failure_message).await;
        assert_eq!(
            result,
            Err(StoreError::ErrorState {
                message: "backend unavailable".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_wait_error_display_is_raw_message() {
        let store = Store::new(TestState::Idle, TestReducer);
        store.dispatch(TestEvent::Fail {
            message: "Payment failed".to_string(),
        });

        let err = wait_for_state(&store, running_count, failure_message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string());
        assert_eq!(err, Err("Payment failed".to_string()));
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let store = Store::new(TestState::Idle, TestReducer);

        let result = wait_for_state_timeout(
            &store,
            running_count,
            failure_message,
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_wait_recovers_from_lag() {
        // Capacity 1 forces the waiter to lag once several changes land
        // before it is polled again.
        let store = Store::with_change_capacity(TestState::Idle, TestReducer, 1);

        let mut waiter = tokio_test::task::spawn(wait_for_state(
            &store,
            |s: &TestState| running_count(s).filter(|c| *c == 2),
            failure_message,
        ));

        // First poll subscribes and parks on the change feed.
        tokio_test::assert_pending!(waiter.poll());

        store.dispatch(TestEvent::Start);
        store.dispatch(TestEvent::Increment);
        store.dispatch(TestEvent::Increment);

        // The waiter lagged past the intermediate changes; the re-check of
        // current state must still resolve it.
        assert!(waiter.is_woken());
        let result = tokio_test::assert_ready!(waiter.poll());
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_wait_observes_changes_in_order() {
        let store = Store::new(TestState::Idle, TestReducer);
        let mut rx = store.subscribe_changes();

        store.dispatch(TestEvent::Start);
        store.dispatch(TestEvent::Increment);

        let first = rx.recv().await.map_err(|e| e.to_string());
        let second = rx.recv().await.map_err(|e| e.to_string());
        assert_eq!(first.map(|c| c.next), Ok(TestState::Running { count: 0 }));
        assert_eq!(second.map(|c| c.next), Ok(TestState::Running { count: 1 }));
    }
}
