//! Effect handler: the imperative shell around the reducer.
//!
//! [`PaymentEffectHandler`] subscribes to the store and reacts to every
//! change with whatever I/O the transition calls for. Command events start
//! RPCs; entering a waiting state starts the matching poller; entering a
//! terminal state stops everything for that order.
//!
//! Every async result is stamped with the state it was started from and is
//! dispatched back only while that state is still current. A late response
//! from an abandoned order is dropped, never reduced.

use crate::environment::PaymentEnvironment;
use crate::error::parse_error_message;
use crate::events::PaymentEvent;
use crate::state::{PayParamsData, PaymentState};
use crate::store::PaymentStore;
use intent_pay_common::address::{EvmAddress, WalletAddress};
use intent_pay_common::api::{
    ApiError, PayApiClient, PaymentInput, PaymentRequestData, ProcessSolanaSourcePayment,
    ProcessSourcePayment, ProcessStellarSourcePayment,
};
use intent_pay_common::bridge::payment_bridge_config;
use intent_pay_common::ids::OrderId;
use intent_pay_common::metadata::{OrderMetadata, PayerMetadata, validate_user_metadata};
use intent_pay_common::order::{
    DehydratedOrder, HydratedOrder, IntentStatus, OnChainCall, Order, OrderMode,
};
use intent_pay_common::pay_params::PayParams;
use intent_pay_common::token::{TokenAmount, parse_units};
use intent_pay_core::StateChange;
use intent_pay_runtime::SubscriptionId;
use intent_pay_runtime::metrics::{EffectMetrics, PollerMetrics};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The background poller variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PollerKind {
    /// Scan for source payments while the order is unpaid.
    FindSourcePayment,
    /// Refresh the order while the payment is processing.
    RefreshOrder,
}

impl PollerKind {
    const fn label(self) -> &'static str {
        match self {
            Self::FindSourcePayment => "find_source_payment",
            Self::RefreshOrder => "refresh_order",
        }
    }

    const fn period(self) -> Duration {
        match self {
            Self::FindSourcePayment => Duration::from_millis(1000),
            Self::RefreshOrder => Duration::from_millis(300),
        }
    }

    /// The state this poller is allowed to run in.
    const fn state_label(self) -> &'static str {
        match self {
            Self::FindSourcePayment => "payment_unpaid",
            Self::RefreshOrder => "payment_started",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PollerKey {
    kind: PollerKind,
    order_id: OrderId,
}

/// Identity of the state an async effect was started from.
///
/// A result is dispatched only while the live state still carries the same
/// tag and order id. A reset or order switch while the call was in flight
/// changes the stamp and the result is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StateStamp {
    label: &'static str,
    order_id: Option<OrderId>,
}

impl StateStamp {
    fn of(state: &PaymentState) -> Self {
        Self {
            label: state.label(),
            order_id: state.order_id(),
        }
    }

    fn matches(self, state: &PaymentState) -> bool {
        self == Self::of(state)
    }
}

struct EffectInner {
    store: PaymentStore,
    env: PaymentEnvironment,
    pollers: Mutex<HashMap<PollerKey, JoinHandle<()>>>,
    runtime: tokio::runtime::Handle,
    closed: AtomicBool,
}

#[derive(Clone)]
struct Effects {
    inner: Arc<EffectInner>,
}

/// Runs the I/O side of the payment flow against a store.
///
/// Attach once per store. Dropping the handler (or calling
/// [`PaymentEffectHandler::close`]) detaches it, stops all pollers, and
/// drops any in-flight results.
pub struct PaymentEffectHandler {
    effects: Effects,
    subscription: SubscriptionId,
}

impl PaymentEffectHandler {
    /// Attach effects to a store.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; spawned work runs on the
    /// runtime the handler was attached from.
    #[must_use]
    pub fn attach(store: &PaymentStore, env: PaymentEnvironment) -> Self {
        let effects = Effects {
            inner: Arc::new(EffectInner {
                store: store.clone(),
                env,
                pollers: Mutex::new(HashMap::new()),
                runtime: tokio::runtime::Handle::current(),
                closed: AtomicBool::new(false),
            }),
        };

        let subscription = store.subscribe({
            let effects = effects.clone();
            move |change| effects.on_change(change)
        });

        tracing::debug!("Payment effects attached");
        Self {
            effects,
            subscription,
        }
    }

    /// Detach from the store and stop all pollers.
    ///
    /// Idempotent. In-flight results are dropped rather than dispatched.
    pub fn close(&self) {
        if self.effects.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.effects.inner.store.unsubscribe(self.subscription);
        self.effects.stop_all_pollers();
        tracing::debug!("Payment effects closed");
    }

    /// Number of live pollers, for diagnostics.
    #[must_use]
    pub fn active_pollers(&self) -> usize {
        self.effects
            .inner
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for PaymentEffectHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl Effects {
    fn on_change(&self, change: &StateChange<PaymentState, PaymentEvent>) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        tracing::debug!(
            event = change.event.name(),
            prev = %change.prev,
            next = %change.next,
            "Payment state changed"
        );
        self.react_to_state(change);
        self.react_to_event(change);
    }

    /// Start and stop pollers on state entry.
    fn react_to_state(&self, change: &StateChange<PaymentState, PaymentEvent>) {
        let same_place = change.prev.label() == change.next.label()
            && change.prev.order_id() == change.next.order_id();
        if same_place {
            return;
        }

        match &change.next {
            PaymentState::PaymentUnpaid { order } => {
                self.stop_poller(PollerKey {
                    kind: PollerKind::RefreshOrder,
                    order_id: order.id,
                });
                self.start_poller(PollerKind::FindSourcePayment, order.id);
            }
            PaymentState::PaymentStarted { order } => {
                self.stop_poller(PollerKey {
                    kind: PollerKind::FindSourcePayment,
                    order_id: order.id,
                });
                self.start_poller(PollerKind::RefreshOrder, order.id);
            }
            PaymentState::Idle
            | PaymentState::PaymentCompleted { .. }
            | PaymentState::PaymentBounced { .. }
            | PaymentState::Error { .. } => {
                if let Some(order_id) = change.prev.order_id() {
                    self.stop_poller(PollerKey {
                        kind: PollerKind::FindSourcePayment,
                        order_id,
                    });
                    self.stop_poller(PollerKey {
                        kind: PollerKind::RefreshOrder,
                        order_id,
                    });
                }
            }
            PaymentState::Preview { .. } | PaymentState::Unhydrated { .. } => {}
        }
    }

    /// Start the RPC a command event asks for.
    fn react_to_event(&self, change: &StateChange<PaymentState, PaymentEvent>) {
        match &change.event {
            PaymentEvent::SetPayParams { params } => self.generate_preview(change, params.clone()),
            PaymentEvent::SetPayId { id } => self.load_order(change, *id),
            PaymentEvent::HydrateOrder { refund_address } => {
                self.hydrate(change, refund_address.clone());
            }
            PaymentEvent::PaySource => self.find_payments_once(change),
            PaymentEvent::PayEthereumSource {
                source_initiate_tx_hash,
                source_chain_id,
                source_fulfiller_addr,
                source_token,
                source_amount,
            } => {
                if let Some(order) = unpaid_order(change) {
                    let args = ProcessSourcePayment {
                        order_id: order.id,
                        source_initiate_tx_hash: source_initiate_tx_hash.clone(),
                        source_chain_id: *source_chain_id,
                        source_fulfiller_addr: source_fulfiller_addr.clone(),
                        source_token: source_token.clone(),
                        source_amount: *source_amount,
                    };
                    self.register_source_payment(change, order, move |api| async move {
                        api.process_source_payment(args).await
                    });
                }
            }
            PaymentEvent::PaySolanaSource {
                start_intent_tx_hash,
                token,
            } => {
                if let Some(order) = unpaid_order(change) {
                    let args = ProcessSolanaSourcePayment {
                        order_id: order.id,
                        start_intent_tx_hash: start_intent_tx_hash.clone(),
                        token: token.clone(),
                    };
                    self.register_source_payment(change, order, move |api| async move {
                        api.process_solana_source_payment(args).await
                    });
                }
            }
            PaymentEvent::PayStellarSource {
                payment_tx_hash,
                token,
            } => {
                if let Some(order) = unpaid_order(change) {
                    let args = ProcessStellarSourcePayment {
                        order_id: order.id,
                        payment_tx_hash: payment_tx_hash.clone(),
                        token: token.clone(),
                    };
                    self.register_source_payment(change, order, move |api| async move {
                        api.process_stellar_source_payment(args).await
                    });
                }
            }
            // Results and reducer-only commands need no I/O.
            PaymentEvent::SetChosenUsd { .. }
            | PaymentEvent::PreviewGenerated { .. }
            | PaymentEvent::OrderLoaded { .. }
            | PaymentEvent::OrderHydrated { .. }
            | PaymentEvent::PaymentVerified { .. }
            | PaymentEvent::OrderRefreshed { .. }
            | PaymentEvent::DestProcessed { .. }
            | PaymentEvent::Error { .. }
            | PaymentEvent::Reset => {}
        }
    }

    fn generate_preview(&self, change: &StateChange<PaymentState, PaymentEvent>, params: PayParams) {
        if !matches!(change.next, PaymentState::Idle) {
            warn_invalid(&change.event, &change.next);
            return;
        }
        let env = self.inner.env.clone();
        // Construction is synchronous, but it runs on the effect path so the
        // result obeys the same staleness rule as RPC results.
        self.spawn_effect(&change.next, async move {
            match build_preview(&env, &params) {
                Ok((order, pay_params)) => PaymentEvent::PreviewGenerated { order, pay_params },
                Err(message) => PaymentEvent::Error {
                    order: None,
                    message,
                },
            }
        });
    }

    fn load_order(&self, change: &StateChange<PaymentState, PaymentEvent>, id: OrderId) {
        if !matches!(change.next, PaymentState::Idle) {
            warn_invalid(&change.event, &change.next);
            return;
        }
        let api = Arc::clone(&self.inner.env.api);
        self.spawn_effect(&change.next, async move {
            match api.get_order(id).await {
                Ok(order) => PaymentEvent::OrderLoaded { order },
                Err(error) => error_event(None, &error),
            }
        });
    }

    fn hydrate(
        &self,
        change: &StateChange<PaymentState, PaymentEvent>,
        refund_address: Option<WalletAddress>,
    ) {
        match &change.next {
            PaymentState::Preview { order, pay_params } => {
                let request = hydration_request(order, pay_params, refund_address);
                let context = order.clone();
                let api = Arc::clone(&self.inner.env.api);
                self.spawn_effect(&change.next, async move {
                    match api.create_payment(request).await {
                        Ok(response) => PaymentEvent::OrderHydrated {
                            order: response.into_order(),
                        },
                        Err(error) => error_event(Some(Order::Dehydrated(context)), &error),
                    }
                });
            }
            PaymentState::Unhydrated { order } => {
                let id = order.id;
                let context = order.clone();
                let api = Arc::clone(&self.inner.env.api);
                self.spawn_effect(&change.next, async move {
                    match api.get_payment_by_id(id).await {
                        Ok(response) => PaymentEvent::OrderHydrated {
                            order: response.into_order(),
                        },
                        Err(error) => error_event(Some(Order::Dehydrated(context)), &error),
                    }
                });
            }
            other => warn_invalid(&change.event, other),
        }
    }

    fn find_payments_once(&self, change: &StateChange<PaymentState, PaymentEvent>) {
        let Some(order) = unpaid_order(change) else {
            return;
        };
        let id = order.id;
        let context = order.clone();
        let api = Arc::clone(&self.inner.env.api);
        self.spawn_effect(&change.next, async move {
            match api.find_order_payments(id).await {
                Ok(order) => PaymentEvent::OrderRefreshed { order },
                Err(error) => error_event(Some(Order::Hydrated(context)), &error),
            }
        });
    }

    /// Register a source transaction and report the verification outcome.
    fn register_source_payment<F, Fut>(
        &self,
        change: &StateChange<PaymentState, PaymentEvent>,
        order: &HydratedOrder,
        call: F,
    ) where
        F: FnOnce(Arc<dyn PayApiClient>) -> Fut,
        Fut: Future<Output = Result<HydratedOrder, ApiError>> + Send + 'static,
    {
        let context = order.clone();
        let work = call(Arc::clone(&self.inner.env.api));
        self.spawn_effect(&change.next, async move {
            match work.await {
                Ok(order) => PaymentEvent::PaymentVerified { order },
                Err(error) => error_event(Some(Order::Hydrated(context)), &error),
            }
        });
    }

    /// Spawn an RPC task whose result is dispatched only if the state it
    /// started from is still current.
    fn spawn_effect<F>(&self, from: &PaymentState, work: F)
    where
        F: Future<Output = PaymentEvent> + Send + 'static,
    {
        let stamp = StateStamp::of(from);
        let effects = self.clone();
        self.inner.runtime.spawn(async move {
            let started = Instant::now();
            let event = work.await;
            EffectMetrics::record_rpc(started.elapsed());
            if matches!(event, PaymentEvent::Error { .. }) {
                EffectMetrics::record_failure();
            }
            effects.dispatch_if_current(stamp, event);
        });
    }

    /// Dispatch `event` unless the flow moved on while the work ran.
    fn dispatch_if_current(&self, stamp: StateStamp, event: PaymentEvent) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        let current = self.inner.store.state();
        if !stamp.matches(&current) {
            EffectMetrics::record_stale_drop();
            tracing::debug!(
                event = event.name(),
                expected = stamp.label,
                current = %current,
                "Dropping stale effect result"
            );
            return;
        }
        self.inner.store.dispatch(event);
    }

    fn start_poller(&self, kind: PollerKind, order_id: OrderId) {
        let effects = self.clone();
        let handle = self.inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(kind.period());
            // A slow backend delays the next poll instead of bursting to
            // catch up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                PollerMetrics::record_tick();
                if !effects.poll_once(kind, order_id).await {
                    break;
                }
            }
        });

        tracing::debug!(poller = kind.label(), order_id = %order_id, "Poller started");
        PollerMetrics::record_started();
        let replaced = self
            .inner
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(PollerKey { kind, order_id }, handle);
        if let Some(replaced) = replaced {
            replaced.abort();
            PollerMetrics::record_stopped();
        }
    }

    /// One poller pass. Returns false when the poller should stop.
    async fn poll_once(&self, kind: PollerKind, order_id: OrderId) -> bool {
        if self.inner.closed.load(Ordering::SeqCst) {
            return false;
        }
        let current = self.inner.store.state();
        if current.label() != kind.state_label() || current.order_id() != Some(order_id) {
            return false;
        }

        let result = match kind {
            PollerKind::FindSourcePayment => {
                self.inner.env.api.find_order_payments(order_id).await
            }
            PollerKind::RefreshOrder => match self.inner.env.api.get_order(order_id).await {
                Ok(Order::Hydrated(order)) => Ok(order),
                Ok(Order::Dehydrated(_)) => {
                    // A started order cannot be dehydrated; treat the answer
                    // as transient and keep polling.
                    tracing::debug!(order_id = %order_id, "Refresh returned a dehydrated order");
                    return true;
                }
                Err(error) => Err(error),
            },
        };

        match result {
            Ok(order) => {
                let stamp = StateStamp {
                    label: kind.state_label(),
                    order_id: Some(order_id),
                };
                self.dispatch_if_current(stamp, PaymentEvent::OrderRefreshed { order });
            }
            Err(error) => {
                // Poll failures are transient; the next tick retries.
                tracing::debug!(poller = kind.label(), order_id = %order_id, %error, "Poll failed");
            }
        }
        true
    }

    fn stop_poller(&self, key: PollerKey) {
        let handle = self
            .inner
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        if let Some(handle) = handle {
            handle.abort();
            PollerMetrics::record_stopped();
            tracing::debug!(poller = key.kind.label(), order_id = %key.order_id, "Poller stopped");
        }
    }

    fn stop_all_pollers(&self) {
        let mut pollers = self
            .inner
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (key, handle) in pollers.drain() {
            handle.abort();
            PollerMetrics::record_stopped();
            tracing::debug!(poller = key.kind.label(), order_id = %key.order_id, "Poller stopped");
        }
    }
}

/// The unpaid order a registration command applies to.
fn unpaid_order(change: &StateChange<PaymentState, PaymentEvent>) -> Option<&HydratedOrder> {
    match &change.next {
        PaymentState::PaymentUnpaid { order } => Some(order),
        other => {
            warn_invalid(&change.event, other);
            None
        }
    }
}

fn warn_invalid(event: &PaymentEvent, state: &PaymentState) {
    tracing::warn!(
        event = event.name(),
        state = %state,
        "Invalid event for current state"
    );
}

/// Convert an API failure into the error result event.
fn error_event(order: Option<Order>, error: &ApiError) -> PaymentEvent {
    PaymentEvent::Error {
        order,
        message: parse_error_message(&error.to_string()),
    }
}

/// Validate pay params and construct the preview order client-side.
///
/// No RPC happens here. The order id, nonce, and timestamp come from the
/// environment; the token is resolved through the directory, and the quoted
/// price fixes the initial amount.
///
/// # Errors
///
/// Returns the user-facing failure message for a missing app id, an
/// external id in deposit mode, metadata over the limits, an unknown token,
/// or malformed units.
fn build_preview(
    env: &PaymentEnvironment,
    params: &PayParams,
) -> Result<(DehydratedOrder, PayParamsData), String> {
    if params.app_id.is_empty() {
        return Err("PayParams: appId required".to_string());
    }
    let deposit = params.is_deposit_flow();
    if deposit && params.external_id.is_some() {
        return Err("PayParams: externalId unsupported in deposit mode".to_string());
    }
    let user_metadata = params.metadata.clone().unwrap_or_default();
    if let Err(error) = validate_user_metadata(&user_metadata) {
        return Err(error.to_string());
    }
    let Some(token) = env.tokens.resolve(params.to_chain, &params.to_token) else {
        return Err(format!(
            "Unknown token {} on chain {}",
            params.to_token, params.to_chain
        ));
    };

    let amount = match &params.to_units {
        Some(units) => match parse_units(units, token.decimals) {
            Ok(base) => TokenAmount::from_units(token, base),
            Err(error) => return Err(error.to_string()),
        },
        // Deposit flow: the payer chooses the amount later.
        None => TokenAmount::from_units(token, 0),
    };

    let metadata = OrderMetadata {
        intent: params.intent.clone().unwrap_or_else(|| "Pay".to_string()),
        items: Vec::new(),
        payer: Some(PayerMetadata {
            payment_options: params.payment_options.clone(),
            preferred_chains: params.preferred_chains.clone(),
            preferred_tokens: params.preferred_tokens.clone(),
        }),
    };

    let order = DehydratedOrder {
        id: OrderId::new(env.ids.next_id()),
        mode: if deposit {
            OrderMode::ChooseAmount
        } else {
            OrderMode::Sale
        },
        intent_status: IntentStatus::Unpaid,
        dest_address: params.to_address.clone(),
        dest_final_call_token_amount: amount,
        dest_final_call: OnChainCall {
            to: params
                .to_address
                .as_evm()
                .cloned()
                .unwrap_or_else(EvmAddress::zero),
            data: params
                .to_call_data
                .clone()
                .unwrap_or_else(|| "0x".to_string()),
            value: 0,
        },
        nonce: env.ids.next_id(),
        created_at: env.clock.now().timestamp(),
        metadata,
        external_id: params.external_id.clone(),
        user_metadata,
        refund_addr: params.refund_address.clone(),
    };

    let pay_params = PayParamsData {
        app_id: params.app_id.clone(),
        to_call_data: params.to_call_data.clone(),
    };

    Ok((order, pay_params))
}

/// Build the registration request that hydrates a previewed order.
fn hydration_request(
    order: &DehydratedOrder,
    pay_params: &PayParamsData,
    refund_address: Option<WalletAddress>,
) -> PaymentRequestData {
    PaymentRequestData {
        app_id: pay_params.app_id.clone(),
        payment_input: PaymentInput {
            id: order.id,
            to_chain: order.dest_final_call_token_amount.token.chain_id,
            to_token: order.dest_final_call_token_amount.token.address.clone(),
            to_units: order.dest_final_call_token_amount.units(),
            to_address: order.dest_address.clone(),
            to_call_data: pay_params.to_call_data.clone(),
            is_amount_editable: order.mode == OrderMode::ChooseAmount,
            metadata: order.metadata.clone(),
            external_id: order.external_id.clone(),
            user_metadata: order.user_metadata.clone(),
        },
        bridge: payment_bridge_config(order),
        refund_address: refund_address.or_else(|| order.refund_addr.clone()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use intent_pay_common::address::TokenAddress;
    use intent_pay_common::metadata::MAX_USER_METADATA_ENTRIES;
    use intent_pay_testing::mocks::{
        MockPayApi, SequentialIdGenerator, StaticTokenDirectory, test_clock,
    };

    // ===== Test Fixtures =====

    fn test_env() -> PaymentEnvironment {
        PaymentEnvironment::new(
            Arc::new(MockPayApi::new()),
            Arc::new(StaticTokenDirectory::base_usdc()),
        )
        .with_clock(Arc::new(test_clock()))
        .with_ids(Arc::new(SequentialIdGenerator::new()))
    }

    fn deposit_params() -> PayParams {
        PayParams {
            app_id: "test-app".to_string(),
            to_chain: 8453,
            to_token: TokenAddress::new("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            to_units: None,
            to_address: "0x1111111111111111111111111111111111111111"
                .parse()
                .unwrap(),
            to_call_data: None,
            intent: Some("Deposit".to_string()),
            payment_options: None,
            preferred_chains: Some(vec![8453]),
            preferred_tokens: None,
            evm_chains: None,
            external_id: None,
            metadata: None,
            refund_address: None,
        }
    }

    fn sale_params() -> PayParams {
        PayParams {
            to_units: Some("25.5".to_string()),
            intent: None,
            ..deposit_params()
        }
    }

    // ===== Preview construction =====

    #[test]
    fn preview_requires_an_app_id() {
        let mut params = deposit_params();
        params.app_id = String::new();
        let error = build_preview(&test_env(), &params).unwrap_err();
        assert_eq!(error, "PayParams: appId required");
    }

    #[test]
    fn deposit_mode_rejects_an_external_id() {
        let mut params = deposit_params();
        params.external_id = Some("order-1".to_string());
        let error = build_preview(&test_env(), &params).unwrap_err();
        assert_eq!(error, "PayParams: externalId unsupported in deposit mode");
    }

    #[test]
    fn unknown_tokens_are_reported_with_chain() {
        let mut params = deposit_params();
        params.to_chain = 1;
        let error = build_preview(&test_env(), &params).unwrap_err();
        assert_eq!(
            error,
            "Unknown token 0x833589fcd6edb6e08f4c7c32d4f71b54bda02913 on chain 1"
        );
    }

    #[test]
    fn oversized_metadata_is_rejected() {
        let mut params = deposit_params();
        params.metadata = Some(
            (0..=MAX_USER_METADATA_ENTRIES)
                .map(|i| (format!("k{i}"), "v".to_string()))
                .collect(),
        );
        let error = build_preview(&test_env(), &params).unwrap_err();
        assert!(error.contains("exceeds 50 entries"), "got: {error}");
    }

    #[test]
    fn malformed_units_fail_the_preview() {
        let mut params = sale_params();
        params.to_units = Some("25,5".to_string());
        assert!(build_preview(&test_env(), &params).is_err());
    }

    #[test]
    fn sale_params_fix_the_amount() {
        let (order, pay_params) = build_preview(&test_env(), &sale_params()).unwrap();
        assert_eq!(order.mode, OrderMode::Sale);
        assert_eq!(order.dest_final_call_token_amount.amount, 25_500_000);
        assert_eq!(order.metadata.intent, "Pay");
        assert_eq!(pay_params.app_id, "test-app");
    }

    #[test]
    fn deposit_params_start_at_zero() {
        let (order, _) = build_preview(&test_env(), &deposit_params()).unwrap();
        assert_eq!(order.mode, OrderMode::ChooseAmount);
        assert_eq!(order.dest_final_call_token_amount.amount, 0);
        assert_eq!(order.metadata.intent, "Deposit");
        assert_eq!(order.intent_status, IntentStatus::Unpaid);
    }

    #[test]
    fn preview_draws_id_nonce_and_time_from_the_environment() {
        let (order, _) = build_preview(&test_env(), &deposit_params()).unwrap();
        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.nonce, 2);
        assert_eq!(order.created_at, 1_735_689_600);
    }

    #[test]
    fn preview_records_payer_preferences() {
        let (order, _) = build_preview(&test_env(), &deposit_params()).unwrap();
        let payer = order.metadata.payer.unwrap();
        assert_eq!(payer.preferred_chains, Some(vec![8453]));
    }

    // ===== Hydration request =====

    #[test]
    fn hydration_request_carries_the_preview() {
        let env = test_env();
        let (order, pay_params) = build_preview(&env, &deposit_params()).unwrap();
        let request = hydration_request(&order, &pay_params, None);

        assert_eq!(request.app_id, "test-app");
        assert_eq!(request.payment_input.id, order.id);
        assert_eq!(request.payment_input.to_chain, 8453);
        assert_eq!(request.payment_input.to_units, "0");
        assert!(request.payment_input.is_amount_editable);
        assert!(request.refund_address.is_none());
    }

    #[test]
    fn explicit_refund_address_wins() {
        let env = test_env();
        let mut params = deposit_params();
        params.refund_address = Some(
            "0x4444444444444444444444444444444444444444"
                .parse()
                .unwrap(),
        );
        let (order, pay_params) = build_preview(&env, &params).unwrap();

        let fallback = hydration_request(&order, &pay_params, None);
        assert_eq!(
            fallback.refund_address.unwrap().as_str(),
            "0x4444444444444444444444444444444444444444"
        );

        let explicit = hydration_request(
            &order,
            &pay_params,
            Some(
                "0x5555555555555555555555555555555555555555"
                    .parse()
                    .unwrap(),
            ),
        );
        assert_eq!(
            explicit.refund_address.unwrap().as_str(),
            "0x5555555555555555555555555555555555555555"
        );
    }

    #[test]
    fn sale_orders_are_not_amount_editable() {
        let env = test_env();
        let (order, pay_params) = build_preview(&env, &sale_params()).unwrap();
        let request = hydration_request(&order, &pay_params, None);
        assert!(!request.payment_input.is_amount_editable);
        assert_eq!(request.payment_input.to_units, "25.5");
    }

    // ===== Staleness stamps =====

    #[test]
    fn stamps_match_on_label_and_order() {
        let idle = StateStamp::of(&PaymentState::Idle);
        assert!(idle.matches(&PaymentState::Idle));
        assert!(!idle.matches(&PaymentState::Error {
            order: None,
            message: "boom".to_string(),
        }));
    }
}
