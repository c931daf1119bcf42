//! Dependencies injected into the effect handler.
//!
//! Everything the effects touch outside the store goes through this struct:
//! the backend client, the token directory, and the sources of time and
//! ids. Tests swap in deterministic implementations; production wiring uses
//! [`PaymentEnvironment::new`] and gets the system clock and a random id
//! source.

use intent_pay_common::api::{PayApiClient, TokenDirectory};
use intent_pay_core::environment::{Clock, IdGenerator, SystemClock};
use std::sync::Arc;

/// Dependencies for payment effects.
#[derive(Clone)]
pub struct PaymentEnvironment {
    /// Backend payment API client.
    pub api: Arc<dyn PayApiClient>,
    /// Token metadata lookup for the chains the app supports.
    pub tokens: Arc<dyn TokenDirectory>,
    /// Source of time for order timestamps.
    pub clock: Arc<dyn Clock>,
    /// Source of fresh order ids and nonces.
    pub ids: Arc<dyn IdGenerator>,
}

impl PaymentEnvironment {
    /// Create an environment with the system clock and random ids.
    #[must_use]
    pub fn new(api: Arc<dyn PayApiClient>, tokens: Arc<dyn TokenDirectory>) -> Self {
        Self {
            api,
            tokens,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the id source.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

/// Draws ids from the thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> u128 {
        rand::random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct() {
        let ids = RandomIdGenerator;
        // Colliding 128-bit draws would mean the RNG is broken.
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
