//! Imperative facade over the store and effect handler.
//!
//! [`PaymentClient`] owns a store with effects attached and exposes the
//! flow as plain async methods: dispatch the command, wait for the state
//! the command leads to, return the value or the failure. Callers that
//! want the event-level view can reach the store directly through
//! [`PaymentClient::store`].

use crate::effects::PaymentEffectHandler;
use crate::environment::PaymentEnvironment;
use crate::error::{PaymentError, Result};
use crate::events::PaymentEvent;
use crate::state::PaymentState;
use crate::store::{PaymentStore, new_payment_store, wait_for_payment_state};
use intent_pay_common::address::{TokenAddress, TxHash, WalletAddress};
use intent_pay_common::ids::OrderId;
use intent_pay_common::order::{DehydratedOrder, DestStatus, HydratedOrder, IntentStatus, Order};
use intent_pay_common::pay_params::PayParams;

/// A payment session: one store, one effect handler, one flow at a time.
///
/// A session that landed in `error` keeps its message until [`reset`] is
/// called; no other operation restarts it.
///
/// [`reset`]: PaymentClient::reset
pub struct PaymentClient {
    store: PaymentStore,
    handler: PaymentEffectHandler,
}

impl PaymentClient {
    /// Create a client with a fresh store and attached effects.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime (see
    /// [`PaymentEffectHandler::attach`]).
    #[must_use]
    pub fn new(env: PaymentEnvironment) -> Self {
        let store = new_payment_store();
        let handler = PaymentEffectHandler::attach(&store, env);
        Self { store, handler }
    }

    /// Generate a preview order from pay params.
    ///
    /// Resolves once the preview is built; the order is not yet registered
    /// with the backend.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidState`]: the session is not idle
    /// - [`PaymentError::Failed`]: the params were rejected
    pub async fn create_preview_order(&self, params: PayParams) -> Result<DehydratedOrder> {
        self.require_state("create_preview_order", |state| {
            matches!(state, PaymentState::Idle)
        })?;
        self.store.dispatch(PaymentEvent::SetPayParams { params });
        wait_for_payment_state(&self.store, |state| match state {
            PaymentState::Preview { order, .. } => Some(order.clone()),
            _ => None,
        })
        .await
    }

    /// Load an existing order by id and settle on the state it is in.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidState`]: the session is not idle
    /// - [`PaymentError::Failed`]: the order could not be loaded
    pub async fn set_pay_id(&self, id: OrderId) -> Result<PaymentState> {
        self.require_state("set_pay_id", |state| matches!(state, PaymentState::Idle))?;
        self.store.dispatch(PaymentEvent::SetPayId { id });
        wait_for_payment_state(&self.store, |state| match state {
            PaymentState::Unhydrated { .. }
            | PaymentState::PaymentUnpaid { .. }
            | PaymentState::PaymentStarted { .. }
            | PaymentState::PaymentCompleted { .. }
            | PaymentState::PaymentBounced { .. } => Some(state.clone()),
            _ => None,
        })
        .await
    }

    /// Register the current order with the backend and wait for the
    /// allocated intent address.
    ///
    /// `refund_address` overrides the refund destination captured at
    /// preview time.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidState`]: there is no order awaiting hydration
    /// - [`PaymentError::Failed`]: the backend rejected the registration
    pub async fn hydrate_order(
        &self,
        refund_address: Option<WalletAddress>,
    ) -> Result<HydratedOrder> {
        self.require_state("hydrate_order", |state| {
            matches!(
                state,
                PaymentState::Preview { .. } | PaymentState::Unhydrated { .. }
            )
        })?;
        self.store
            .dispatch(PaymentEvent::HydrateOrder { refund_address });
        // Any hydrated state counts: a payment detected while the call was
        // in flight may move the flow past payment_unpaid immediately.
        wait_for_payment_state(&self.store, |state| state.hydrated_order().cloned()).await
    }

    /// Choose the deposit amount, in USD, while previewing.
    pub fn set_chosen_usd(&self, usd: f64) {
        self.store.dispatch(PaymentEvent::SetChosenUsd { usd });
    }

    /// Ask the backend to scan for source payments once.
    pub fn pay_source(&self) {
        self.store.dispatch(PaymentEvent::PaySource);
    }

    /// Register a source payment sent on an EVM chain.
    pub fn pay_ethereum_source(
        &self,
        source_initiate_tx_hash: TxHash,
        source_chain_id: u64,
        source_fulfiller_addr: WalletAddress,
        source_token: TokenAddress,
        source_amount: u128,
    ) {
        self.store.dispatch(PaymentEvent::PayEthereumSource {
            source_initiate_tx_hash,
            source_chain_id,
            source_fulfiller_addr,
            source_token,
            source_amount,
        });
    }

    /// Register a source payment sent on Solana.
    pub fn pay_solana_source(&self, start_intent_tx_hash: TxHash, token: TokenAddress) {
        self.store.dispatch(PaymentEvent::PaySolanaSource {
            start_intent_tx_hash,
            token,
        });
    }

    /// Register a source payment sent on Stellar.
    pub fn pay_stellar_source(&self, payment_tx_hash: TxHash, token: TokenAddress) {
        self.store.dispatch(PaymentEvent::PayStellarSource {
            payment_tx_hash,
            token,
        });
    }

    /// Mark the payment completed from a trusted caller-side signal.
    ///
    /// Used when the integrating app has its own proof the destination was
    /// paid, e.g. it submitted the fast-finish transaction itself. Applies
    /// synchronously; no backend round-trip.
    ///
    /// # Errors
    ///
    /// [`PaymentError::InvalidState`] unless the flow is in `payment_unpaid`
    /// or `payment_started`.
    pub fn set_payment_completed(&self, tx_hash: TxHash) -> Result<()> {
        let current = self.store.state();
        let mut order = match current {
            PaymentState::PaymentUnpaid { order } | PaymentState::PaymentStarted { order } => {
                order
            }
            other => {
                return Err(PaymentError::InvalidState {
                    operation: "set_payment_completed",
                    state: other.label(),
                });
            }
        };
        order.intent_status = IntentStatus::Completed;
        order.dest_status = DestStatus::FastFinished;
        order.dest_fast_finish_tx_hash = Some(tx_hash);
        self.store.dispatch(PaymentEvent::DestProcessed { order });
        Ok(())
    }

    /// Return the session to idle, abandoning the current order.
    pub fn reset(&self) {
        self.store.dispatch(PaymentEvent::Reset);
    }

    /// The current state.
    #[must_use]
    pub fn payment_state(&self) -> PaymentState {
        self.store.state()
    }

    /// The current order, in whichever shape the state holds.
    #[must_use]
    pub fn order(&self) -> Option<Order> {
        self.store.read(PaymentState::order)
    }

    /// The failure message, when the session is in `error`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.store
            .read(|state| state.error_message().map(str::to_string))
    }

    /// Detach effects and stop all pollers.
    pub fn close(&self) {
        self.handler.close();
    }

    /// The underlying store, for subscribers and custom waits.
    #[must_use]
    pub fn store(&self) -> &PaymentStore {
        &self.store
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: impl Fn(&PaymentState) -> bool,
    ) -> Result<()> {
        let current = self.store.state();
        if allowed(&current) {
            Ok(())
        } else {
            Err(PaymentError::InvalidState {
                operation,
                state: current.label(),
            })
        }
    }
}
