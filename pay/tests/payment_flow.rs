//! Integration tests for the full payment flow.
//!
//! Each test drives a real store with effects attached against the
//! in-memory mock backend: previews, hydration, source-payment
//! verification, background polling, and the staleness rule for results
//! that arrive after the flow moved on.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use intent_pay::{
    ErrorKind, PaymentClient, PaymentEffectHandler, PaymentEnvironment, PaymentError,
    PaymentEvent, PaymentState, PaymentStore, new_payment_store, wait_for_payment_state,
};
use intent_pay_common::address::{TokenAddress, WalletAddress};
use intent_pay_common::ids::OrderId;
use intent_pay_common::metadata::OrderMetadata;
use intent_pay_common::order::{
    DehydratedOrder, DestStatus, HydratedOrder, IntentStatus, OnChainCall, Order, OrderMode,
    SourceStatus,
};
use intent_pay_common::pay_params::PayParams;
use intent_pay_common::token::TokenAmount;
use intent_pay_testing::mocks::{
    MockPayApi, SequentialIdGenerator, StaticTokenDirectory, test_clock, usdc,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

/// Upper bound for poller-driven transitions; direct RPCs settle in
/// microseconds against the mock.
const SETTLE_WINDOW: Duration = Duration::from_secs(3);

fn env_with(api: &Arc<MockPayApi>) -> PaymentEnvironment {
    PaymentEnvironment::new(
        Arc::clone(api) as Arc<dyn intent_pay_common::api::PayApiClient>,
        Arc::new(StaticTokenDirectory::base_usdc()),
    )
    .with_clock(Arc::new(test_clock()))
    .with_ids(Arc::new(SequentialIdGenerator::new()))
}

fn client_with(api: &Arc<MockPayApi>) -> PaymentClient {
    PaymentClient::new(env_with(api))
}

fn deposit_params() -> PayParams {
    PayParams {
        app_id: "test-app".to_string(),
        to_chain: 8453,
        to_token: TokenAddress::new("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
        to_units: None,
        to_address: dest_address(),
        to_call_data: None,
        intent: Some("Deposit".to_string()),
        payment_options: None,
        preferred_chains: None,
        preferred_tokens: None,
        evm_chains: None,
        external_id: None,
        metadata: None,
        refund_address: None,
    }
}

fn dest_address() -> WalletAddress {
    "0x1111111111111111111111111111111111111111"
        .parse()
        .unwrap()
}

fn dehydrated_order(id: OrderId) -> DehydratedOrder {
    DehydratedOrder {
        id,
        mode: OrderMode::Sale,
        intent_status: IntentStatus::Unpaid,
        dest_address: dest_address(),
        dest_final_call_token_amount: TokenAmount::from_units(usdc(), 25_000_000),
        dest_final_call: OnChainCall::empty(),
        nonce: id.value(),
        created_at: 1_735_689_600,
        metadata: OrderMetadata::with_intent("Pay"),
        external_id: None,
        user_metadata: HashMap::new(),
        refund_addr: None,
    }
}

fn hydrated_order(id: OrderId, status: IntentStatus) -> HydratedOrder {
    HydratedOrder {
        id,
        intent_status: status,
        intent_addr: "0x2222222222222222222222222222222222222222"
            .parse()
            .unwrap(),
        dest_address: dest_address(),
        dest_final_call_token_amount: TokenAmount::from_units(usdc(), 25_000_000),
        dest_final_call: OnChainCall::empty(),
        nonce: id.value(),
        created_at: 1_735_689_600,
        expiration_ts: Some(1_735_693_200),
        usd_value: 25.0,
        metadata: OrderMetadata::with_intent("Pay"),
        external_id: None,
        user_metadata: HashMap::new(),
        refund_addr: dest_address(),
        source_fulfiller_addr: None,
        source_token_amount: None,
        source_initiate_tx_hash: None,
        source_start_tx_hash: None,
        source_status: SourceStatus::WaitingPayment,
        dest_status: DestStatus::Pending,
        dest_fast_finish_tx_hash: None,
        dest_claim_tx_hash: None,
    }
}

/// Wait for a state match with a deadline, so a broken flow fails the test
/// instead of hanging it.
async fn settle<T>(
    store: &PaymentStore,
    extract: impl Fn(&PaymentState) -> Option<T>,
) -> Result<T, PaymentError> {
    tokio::time::timeout(SETTLE_WINDOW, wait_for_payment_state(store, extract))
        .await
        .expect("timed out waiting for a payment state")
}

fn previewed(state: &PaymentState) -> Option<DehydratedOrder> {
    match state {
        PaymentState::Preview { order, .. } => Some(order.clone()),
        _ => None,
    }
}

fn unpaid(state: &PaymentState) -> Option<HydratedOrder> {
    match state {
        PaymentState::PaymentUnpaid { order } => Some(order.clone()),
        _ => None,
    }
}

fn started(state: &PaymentState) -> Option<HydratedOrder> {
    match state {
        PaymentState::PaymentStarted { order } => Some(order.clone()),
        _ => None,
    }
}

fn completed(state: &PaymentState) -> Option<HydratedOrder> {
    match state {
        PaymentState::PaymentCompleted { order } => Some(order.clone()),
        _ => None,
    }
}

/// Preview a deposit, choose 25 USD, and hydrate.
async fn walk_to_unpaid(client: &PaymentClient) -> HydratedOrder {
    client
        .create_preview_order(deposit_params())
        .await
        .unwrap();
    client.set_chosen_usd(25.0);
    client.hydrate_order(None).await.unwrap()
}

// ============================================================================
// Deposit flow, end to end
// ============================================================================

#[tokio::test]
async fn deposit_flow_reaches_completed_end_to_end() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);

    // Step 1: preview from params. Nothing has touched the backend yet.
    let preview = client
        .create_preview_order(deposit_params())
        .await
        .unwrap();
    assert_eq!(preview.id, OrderId::new(1));
    assert_eq!(preview.mode, OrderMode::ChooseAmount);
    assert_eq!(preview.dest_final_call_token_amount.amount, 0);

    // Step 2: the payer picks an amount; recomputed client-side.
    client.set_chosen_usd(25.0);
    let chosen = client.payment_state();
    let PaymentState::Preview { order, .. } = chosen else {
        panic!("expected preview, got {chosen}");
    };
    assert_eq!(order.dest_final_call_token_amount.amount, 25_000_000);

    // Step 3: hydration locks the order to a receiving address.
    let hydrated = client.hydrate_order(None).await.unwrap();
    assert_eq!(
        hydrated.intent_addr.as_str(),
        "0x0000000000000000000000000000000000000001"
    );
    assert_eq!(hydrated.dest_final_call_token_amount.amount, 25_000_000);
    assert_eq!(client.payment_state().label(), "payment_unpaid");

    // Step 4: the payer reports their transaction; verification says the
    // payment started.
    client.pay_ethereum_source(
        "0xabc".parse().unwrap(),
        8453,
        "0x3333333333333333333333333333333333333333".parse().unwrap(),
        usdc().address,
        25_000_000,
    );
    let verified = settle(client.store(), started).await.unwrap();
    assert_eq!(verified.intent_status, IntentStatus::Started);
    assert_eq!(verified.source_status, SourceStatus::PendingProcessing);
    assert_eq!(
        verified.source_initiate_tx_hash.as_ref().unwrap().as_str(),
        "0xabc"
    );

    // Step 5: the backend finishes server-side; the refresh poller reports
    // it without any further input.
    api.set_order_status(OrderId::new(1), IntentStatus::Completed);
    let settled = settle(client.store(), completed).await.unwrap();
    assert_eq!(settled.intent_status, IntentStatus::Completed);

    // Step 6: reset returns to idle.
    client.reset();
    assert_eq!(client.payment_state(), PaymentState::Idle);
    assert!(client.order().is_none());

    let calls = api.calls();
    assert_eq!(calls.first().map(String::as_str), Some("create_payment"));
    assert!(calls.iter().any(|call| call == "process_source_payment"));
    client.close();
}

#[tokio::test]
async fn verification_without_a_detected_payment_fails_the_flow() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);
    walk_to_unpaid(&client).await;

    // The backend looks and finds nothing.
    api.set_verify_status(IntentStatus::Unpaid);
    client.pay_ethereum_source(
        "0xabc".parse().unwrap(),
        8453,
        "0x3333333333333333333333333333333333333333".parse().unwrap(),
        usdc().address,
        25_000_000,
    );

    let error = settle(client.store(), completed).await.unwrap_err();
    assert_eq!(error, PaymentError::Failed("Payment failed".to_string()));

    let state = client.payment_state();
    assert!(matches!(
        state,
        PaymentState::Error {
            order: Some(Order::Hydrated(_)),
            ..
        }
    ));
    assert_eq!(
        ErrorKind::categorize(state.error_message().unwrap()),
        ErrorKind::PaymentFailed
    );
    client.close();
}

// ============================================================================
// Pollers
// ============================================================================

#[tokio::test]
async fn pollers_follow_the_waiting_states() {
    let api = Arc::new(MockPayApi::new());
    let store = new_payment_store();
    let handler = PaymentEffectHandler::attach(&store, env_with(&api));

    store.dispatch(PaymentEvent::SetPayParams {
        params: deposit_params(),
    });
    settle(&store, previewed).await.unwrap();
    assert_eq!(handler.active_pollers(), 0);

    store.dispatch(PaymentEvent::SetChosenUsd { usd: 25.0 });
    store.dispatch(PaymentEvent::HydrateOrder {
        refund_address: None,
    });
    settle(&store, unpaid).await.unwrap();
    assert_eq!(handler.active_pollers(), 1);

    store.dispatch(PaymentEvent::PayEthereumSource {
        source_initiate_tx_hash: "0xabc".parse().unwrap(),
        source_chain_id: 8453,
        source_fulfiller_addr: "0x3333333333333333333333333333333333333333".parse().unwrap(),
        source_token: usdc().address,
        source_amount: 25_000_000,
    });
    settle(&store, started).await.unwrap();
    // The payment-scan poller is swapped for the refresh poller.
    assert_eq!(handler.active_pollers(), 1);

    api.set_order_status(OrderId::new(1), IntentStatus::Completed);
    settle(&store, completed).await.unwrap();
    assert_eq!(handler.active_pollers(), 0);

    handler.close();
    handler.close();
}

#[tokio::test]
async fn polling_detects_an_out_of_band_payment() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);
    let order = walk_to_unpaid(&client).await;

    // The payer paid without telling us; only the backend knows.
    api.set_order_status(order.id, IntentStatus::Started);

    let detected = settle(client.store(), started).await.unwrap();
    assert_eq!(detected.intent_status, IntentStatus::Started);
    client.close();
}

#[tokio::test]
async fn pay_source_refreshes_immediately() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);

    // Outside a live payment the command is ignored.
    client.pay_source();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.payment_state(), PaymentState::Idle);

    let order = walk_to_unpaid(&client).await;
    api.set_order_status(order.id, IntentStatus::Started);
    client.pay_source();

    let detected = settle(client.store(), started).await.unwrap();
    assert_eq!(detected.intent_status, IntentStatus::Started);
    client.close();
}

// ============================================================================
// Staleness
// ============================================================================

#[tokio::test]
async fn late_results_from_an_abandoned_order_are_dropped() {
    let api = Arc::new(MockPayApi::new());
    let store = new_payment_store();
    let handler = PaymentEffectHandler::attach(&store, env_with(&api));

    store.dispatch(PaymentEvent::SetPayParams {
        params: deposit_params(),
    });
    settle(&store, previewed).await.unwrap();

    // Hydration is in flight when the payer abandons the order.
    api.set_latency(Duration::from_millis(150));
    store.dispatch(PaymentEvent::HydrateOrder {
        refund_address: None,
    });
    store.dispatch(PaymentEvent::Reset);
    assert_eq!(store.state(), PaymentState::Idle);

    // The late hydration answer must not resurrect the flow.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.state(), PaymentState::Idle);
    assert_eq!(handler.active_pollers(), 0);

    // The session is immediately reusable.
    store.dispatch(PaymentEvent::SetPayParams {
        params: deposit_params(),
    });
    let preview = settle(&store, previewed).await.unwrap();
    assert_eq!(preview.id, OrderId::new(3));

    handler.close();
}

// ============================================================================
// Resuming existing orders
// ============================================================================

#[tokio::test]
async fn resume_by_id_lands_on_the_reported_status() {
    let api = Arc::new(MockPayApi::new());
    api.insert_order(Order::Hydrated(hydrated_order(
        OrderId::new(7),
        IntentStatus::Completed,
    )));

    let client = client_with(&api);
    let state = client.set_pay_id(OrderId::new(7)).await.unwrap();
    assert_eq!(state.label(), "payment_completed");
    assert_eq!(client.payment_state().label(), "payment_completed");
    client.close();
}

#[tokio::test]
async fn hydrate_resumes_an_unhydrated_order() {
    let api = Arc::new(MockPayApi::new());
    api.insert_order(Order::Dehydrated(dehydrated_order(OrderId::new(8))));

    let client = client_with(&api);
    let state = client.set_pay_id(OrderId::new(8)).await.unwrap();
    assert_eq!(state.label(), "unhydrated");

    let hydrated = client.hydrate_order(None).await.unwrap();
    assert_eq!(
        hydrated.intent_addr.as_str(),
        "0x0000000000000000000000000000000000000008"
    );
    assert_eq!(client.payment_state().label(), "payment_unpaid");
    client.close();
}

#[tokio::test]
async fn unknown_order_ids_surface_the_backend_message() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);

    let error = client.set_pay_id(OrderId::new(99)).await.unwrap_err();
    assert_eq!(error, PaymentError::Failed("order not found".to_string()));
    assert_eq!(client.payment_state().label(), "error");
    client.close();
}

// ============================================================================
// Failure surfaces
// ============================================================================

#[tokio::test]
async fn backend_error_envelopes_are_unwrapped() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);

    client
        .create_preview_order(deposit_params())
        .await
        .unwrap();
    client.set_chosen_usd(25.0);

    api.fail_next("{\"message\":\"Quote expired\"}");
    let error = client.hydrate_order(None).await.unwrap_err();
    assert_eq!(error, PaymentError::Failed("Quote expired".to_string()));

    // The failed preview stays attached for display.
    assert!(matches!(
        client.payment_state(),
        PaymentState::Error {
            order: Some(Order::Dehydrated(_)),
            ..
        }
    ));
    client.close();
}

// ============================================================================
// Manual completion
// ============================================================================

#[tokio::test]
async fn manual_completion_settles_without_the_backend() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);
    walk_to_unpaid(&client).await;

    client
        .set_payment_completed("0xfeed".parse().unwrap())
        .unwrap();

    let state = client.payment_state();
    let PaymentState::PaymentCompleted { order } = state else {
        panic!("expected payment_completed, got {state}");
    };
    assert_eq!(order.intent_status, IntentStatus::Completed);
    assert_eq!(order.dest_status, DestStatus::FastFinished);
    assert_eq!(
        order.dest_fast_finish_tx_hash.as_ref().unwrap().as_str(),
        "0xfeed"
    );

    // A settled session accepts only reset.
    let error = client
        .set_payment_completed("0xbeef".parse().unwrap())
        .unwrap_err();
    assert_eq!(
        error,
        PaymentError::InvalidState {
            operation: "set_payment_completed",
            state: "payment_completed",
        }
    );
    client.close();
}

// ============================================================================
// Non-EVM rails
// ============================================================================

#[tokio::test]
async fn solana_registration_carries_the_start_hash() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);
    walk_to_unpaid(&client).await;

    client.pay_solana_source("5sig".parse().unwrap(), usdc().address);
    let verified = settle(client.store(), started).await.unwrap();
    assert_eq!(
        verified.source_start_tx_hash.as_ref().unwrap().as_str(),
        "5sig"
    );
    client.close();
}

#[tokio::test]
async fn stellar_registration_carries_the_payment_hash() {
    let api = Arc::new(MockPayApi::new());
    let client = client_with(&api);
    walk_to_unpaid(&client).await;

    client.pay_stellar_source("stellar-tx-7".parse().unwrap(), usdc().address);
    let verified = settle(client.store(), started).await.unwrap();
    assert_eq!(
        verified.source_initiate_tx_hash.as_ref().unwrap().as_str(),
        "stellar-tx-7"
    );
    client.close();
}
