//! Deposit flow walkthrough.
//!
//! Drives a complete choose-amount deposit against the in-memory mock
//! backend: preview, amount selection, hydration, source-payment
//! registration, and poller-driven settlement. Run with
//! `RUST_LOG=intent_pay=debug` to watch the effect handler work.

use intent_pay::{PaymentClient, PaymentEnvironment, PaymentState, wait_for_payment_state};
use intent_pay_common::address::TokenAddress;
use intent_pay_common::order::IntentStatus;
use intent_pay_common::pay_params::PayParams;
use intent_pay_testing::mocks::{
    MockPayApi, SequentialIdGenerator, StaticTokenDirectory, test_clock, usdc,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[allow(clippy::expect_used)]
fn deposit_params() -> PayParams {
    PayParams {
        app_id: "deposit-flow-demo".to_string(),
        to_chain: 8453,
        to_token: TokenAddress::new("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
        to_units: None,
        to_address: "0x1111111111111111111111111111111111111111"
            .parse()
            .expect("demo address is well formed"),
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

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deposit_flow=info,intent_pay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting deposit flow demo");
    println!("=== Deposit Flow: Intent Pay ===\n");

    let api = Arc::new(MockPayApi::new());
    let env = PaymentEnvironment::new(
        Arc::clone(&api) as Arc<dyn intent_pay_common::api::PayApiClient>,
        Arc::new(StaticTokenDirectory::base_usdc()),
    )
    .with_clock(Arc::new(test_clock()))
    .with_ids(Arc::new(SequentialIdGenerator::new()));
    let client = PaymentClient::new(env);

    println!(">>> Creating a preview order (choose-amount deposit)");
    let preview = client.create_preview_order(deposit_params()).await?;
    println!("Order {} previewed, mode {}", preview.id, preview.mode);

    println!("\n>>> Payer chooses 25 USD");
    client.set_chosen_usd(25.0);
    let amount = client
        .order()
        .map(|order| order.dest_final_call_token_amount().units())
        .unwrap_or_default();
    println!("Deposit amount: {amount} USDC");

    println!("\n>>> Hydrating: registering the order with the backend");
    let hydrated = client.hydrate_order(None).await?;
    println!("Receiving address: {}", hydrated.intent_addr);
    println!("State: {}", client.payment_state());

    println!("\n>>> Payer sends 25 USDC on Base; registering the transaction");
    client.pay_ethereum_source(
        "0xabc".parse().expect("demo hash is well formed"),
        8453,
        "0x3333333333333333333333333333333333333333"
            .parse()
            .expect("demo address is well formed"),
        usdc().address,
        25_000_000,
    );
    let verified = wait_for_payment_state(client.store(), |state| match state {
        PaymentState::PaymentStarted { order } => Some(order.clone()),
        _ => None,
    })
    .await?;
    println!("Payment started, source status {:?}", verified.source_status);

    println!("\n>>> Backend finishes the destination leg; the poller picks it up");
    api.set_order_status(hydrated.id, IntentStatus::Completed);
    let settled = wait_for_payment_state(client.store(), |state| match state {
        PaymentState::PaymentCompleted { order } => Some(order.clone()),
        _ => None,
    })
    .await?;
    println!(
        "Payment completed: {} {} to {}",
        settled.dest_final_call_token_amount.units(),
        settled.dest_final_call_token_amount.token.symbol,
        settled.dest_address
    );

    println!("\n>>> Resetting the session");
    client.reset();
    println!("State: {}", client.payment_state());

    client.close();
    println!("\n=== Flow complete ===");
    Ok(())
}
