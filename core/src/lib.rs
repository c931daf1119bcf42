//! # Intent Pay Core
//!
//! Core traits and types for the intent-pay state container.
//!
//! This crate provides the fundamental abstractions for modeling a payment
//! lifecycle as an event-driven state machine: a pure [`reducer::Reducer`]
//! computes the next state from the previous state and an event, and a
//! [`change::StateChange`] describes each completed transition to store
//! subscribers.
//!
//! ## Core Concepts
//!
//! - **State**: a tagged union describing where the system is in its lifecycle
//! - **Event**: commands (requests to act) and results (facts reported back
//!   by effect handlers)
//! - **Reducer**: pure total function `(State, Event) → State`
//! - **`StateChange`**: `{ prev, next, event }`, delivered to subscribers
//! - **Environment**: injected dependencies (clock, id generation) via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Side effects live in store subscribers, never in reducers
//! - Dependency Injection via Environment traits
//!
//! ## Example
//!
//! ```
//! use intent_pay_core::Reducer;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Light {
//!     Red,
//!     Green,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum Signal {
//!     Advance,
//! }
//!
//! struct LightReducer;
//!
//! impl Reducer for LightReducer {
//!     type State = Light;
//!     type Event = Signal;
//!
//!     fn reduce(&self, prev: &Light, event: &Signal) -> Light {
//!         match (prev, event) {
//!             (Light::Red, Signal::Advance) => Light::Green,
//!             (Light::Green, Signal::Advance) => Light::Red,
//!         }
//!     }
//! }
//!
//! let next = LightReducer.reduce(&Light::Red, &Signal::Advance);
//! assert_eq!(next, Light::Green);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub use change::StateChange;
pub use reducer::Reducer;

/// Reducer module - the core trait for state transitions
///
/// Reducers are pure functions: `(State, Event) → State`.
///
/// They contain all transition logic, are deterministic, and never perform
/// I/O. Anything that touches the network, the clock, or randomness belongs
/// in an effect handler subscribed to the store, which feeds the outcome back
/// in as a result event.
pub mod reducer {
    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Contract
    ///
    /// - **Total**: every `(state, event)` pair produces a state. Pairs the
    ///   domain does not recognize return the previous state unchanged rather
    ///   than failing.
    /// - **Pure**: no I/O, no ambient time, no randomness. Given the same
    ///   inputs, `reduce` always returns the same output.
    ///
    /// The previous state is borrowed rather than consumed so the caller can
    /// hand both the old and new state to subscribers after the swap.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State: Clone;

        /// The event type this reducer processes
        type Event;

        /// Compute the next state from the previous state and an event
        #[must_use]
        fn reduce(&self, prev: &Self::State, event: &Self::Event) -> Self::State;
    }
}

/// Change module - the transition record delivered to subscribers
pub mod change {
    /// A single completed store transition
    ///
    /// Subscribers receive the state before the event, the state after, and
    /// the event itself. Both states are owned snapshots; a listener may hold
    /// them past the notification without blocking the store.
    #[derive(Debug, Clone)]
    pub struct StateChange<S, E> {
        /// State before the event was reduced
        pub prev: S,
        /// State after the event was reduced
        pub next: S,
        /// The event that caused the transition
        pub event: E,
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected via an
/// environment struct, so production wiring and deterministic tests differ
/// only in which implementations they pass in.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use intent_pay_core::environment::Clock;
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock {
    ///     time: DateTime<Utc>,
    /// }
    ///
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock reading the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Id generation - abstracts randomness for testability
    ///
    /// Fresh order ids and nonces are 128-bit integers. Production
    /// implementations draw them from a CSPRNG; tests use a deterministic
    /// sequence so generated orders have stable ids.
    pub trait IdGenerator: Send + Sync {
        /// Produce a fresh id
        fn next_id(&self) -> u128;
    }
}

#[cfg(test)]
mod tests {
    use super::change::StateChange;
    use super::environment::{Clock, SystemClock};
    use super::reducer::Reducer;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Toggle {
        Off,
        On,
    }

    #[derive(Clone, Debug)]
    enum Flip {
        Flip,
        Noop,
    }

    struct ToggleReducer;

    impl Reducer for ToggleReducer {
        type State = Toggle;
        type Event = Flip;

        fn reduce(&self, prev: &Toggle, event: &Flip) -> Toggle {
            match (prev, event) {
                (Toggle::Off, Flip::Flip) => Toggle::On,
                (Toggle::On, Flip::Flip) => Toggle::Off,
                (state, Flip::Noop) => state.clone(),
            }
        }
    }

    #[test]
    fn reducer_is_deterministic() {
        let reducer = ToggleReducer;
        let a = reducer.reduce(&Toggle::Off, &Flip::Flip);
        let b = reducer.reduce(&Toggle::Off, &Flip::Flip);
        assert_eq!(a, b);
    }

    #[test]
    fn unrecognized_pair_returns_previous_state() {
        let reducer = ToggleReducer;
        let next = reducer.reduce(&Toggle::On, &Flip::Noop);
        assert_eq!(next, Toggle::On);
    }

    #[test]
    fn state_change_carries_both_snapshots() {
        let change = StateChange {
            prev: Toggle::Off,
            next: Toggle::On,
            event: Flip::Flip,
        };
        assert_eq!(change.prev, Toggle::Off);
        assert_eq!(change.next, Toggle::On);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
