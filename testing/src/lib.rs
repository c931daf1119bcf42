//! # Intent Pay Testing
//!
//! Test doubles for the intent-pay crates: a scriptable in-memory payment
//! backend, a static token directory, and deterministic clock and id
//! sources.
//!
//! Everything here runs at memory speed. The mock backend can be told to
//! fail its next call, to answer after a delay, and which status
//! verification should report, so tests can walk the flow through every
//! branch without a network.
//!
//! ## Example
//!
//! ```ignore
//! use intent_pay::{PaymentClient, PaymentEnvironment};
//! use intent_pay_testing::mocks::{MockPayApi, StaticTokenDirectory};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_preview_flow() {
//!     let api = Arc::new(MockPayApi::new());
//!     let tokens = Arc::new(StaticTokenDirectory::base_usdc());
//!     let client = PaymentClient::new(PaymentEnvironment::new(api, tokens));
//!
//!     let order = client.create_preview_order(params()).await.unwrap();
//!     assert_eq!(order.intent_status, IntentStatus::Unpaid);
//! }
//! ```

use chrono::{DateTime, Utc};
use intent_pay_core::environment::Clock;

/// Mock implementations of the environment and backend traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use intent_pay_common::address::{EvmAddress, TokenAddress};
    use intent_pay_common::api::{
        ApiError, PayApiClient, PaymentInput, PaymentRequestData, PaymentResponseData,
        ProcessSolanaSourcePayment, ProcessSourcePayment, ProcessStellarSourcePayment,
        TokenDirectory,
    };
    use intent_pay_common::ids::OrderId;
    use intent_pay_common::order::{
        DehydratedOrder, DestStatus, HydratedOrder, IntentStatus, OnChainCall, Order, SourceStatus,
    };
    use intent_pay_common::token::{TokenAmount, TokenInfo, parse_units};
    use intent_pay_core::environment::IdGenerator;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use intent_pay_testing::mocks::FixedClock;
    /// use intent_pay_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Id source counting 1, 2, 3, ... for stable generated orders
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator whose first id is 1
        #[must_use]
        pub fn new() -> Self {
            Self {
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> u128 {
            u128::from(self.next.fetch_add(1, Ordering::Relaxed))
        }
    }

    /// USDC on Base, the token most tests pay with.
    #[must_use]
    pub fn usdc() -> TokenInfo {
        TokenInfo {
            chain_id: 8453,
            address: TokenAddress::new("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            symbol: "USDC".to_string(),
            decimals: 6,
            display_decimals: 2,
            usd: 1.0,
            price_from_usd: 1.0,
        }
    }

    /// A token directory over a fixed list.
    #[derive(Debug, Clone)]
    pub struct StaticTokenDirectory {
        tokens: Vec<TokenInfo>,
    }

    impl StaticTokenDirectory {
        /// Create a directory over the given tokens.
        #[must_use]
        pub fn new(tokens: Vec<TokenInfo>) -> Self {
            Self { tokens }
        }

        /// A directory that knows only [`usdc`].
        #[must_use]
        pub fn base_usdc() -> Self {
            Self::new(vec![usdc()])
        }
    }

    impl TokenDirectory for StaticTokenDirectory {
        fn resolve(&self, chain_id: u64, address: &TokenAddress) -> Option<TokenInfo> {
            self.tokens
                .iter()
                .find(|token| {
                    token.chain_id == chain_id
                        && token.address.as_str().eq_ignore_ascii_case(address.as_str())
                })
                .cloned()
        }
    }

    struct MockState {
        orders: HashMap<OrderId, Order>,
        verify_status: IntentStatus,
        fail_next: Option<String>,
        latency: Option<Duration>,
        calls: Vec<String>,
    }

    /// A scriptable in-memory payment backend.
    ///
    /// Orders live in a map keyed by id. `create_payment` hydrates the
    /// registered input with a deterministic intent address, and the
    /// `process_*_source_payment` calls move the order to the status set by
    /// [`MockPayApi::set_verify_status`]. [`MockPayApi::fail_next`] fails
    /// exactly one upcoming call; [`MockPayApi::set_latency`] delays every
    /// answer, which is how in-flight races are reproduced in tests.
    pub struct MockPayApi {
        state: Mutex<MockState>,
    }

    impl MockPayApi {
        /// Create a backend with no orders, verification reporting `Started`.
        #[must_use]
        pub fn new() -> Self {
            Self {
                state: Mutex::new(MockState {
                    orders: HashMap::new(),
                    verify_status: IntentStatus::Started,
                    fail_next: None,
                    latency: None,
                    calls: Vec::new(),
                }),
            }
        }

        /// Seed an order.
        pub fn insert_order(&self, order: Order) {
            let mut state = self.lock();
            state.orders.insert(order.id(), order);
        }

        /// Set the status verification calls report.
        pub fn set_verify_status(&self, status: IntentStatus) {
            self.lock().verify_status = status;
        }

        /// Change a stored hydrated order's status, as the backend would
        /// when the payment progresses server-side.
        pub fn set_order_status(&self, id: OrderId, status: IntentStatus) {
            let mut state = self.lock();
            if let Some(Order::Hydrated(order)) = state.orders.get_mut(&id) {
                order.intent_status = status;
            }
        }

        /// Fail the next call with a backend error carrying `body`.
        pub fn fail_next(&self, body: impl Into<String>) {
            self.lock().fail_next = Some(body.into());
        }

        /// Delay every answer by `latency`.
        pub fn set_latency(&self, latency: Duration) {
            self.lock().latency = Some(latency);
        }

        /// The backend methods called so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.lock().calls.clone()
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        async fn answer(&self, name: &str) -> Result<(), ApiError> {
            let (latency, failure) = {
                let mut state = self.lock();
                state.calls.push(name.to_string());
                (state.latency, state.fail_next.take())
            };
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(body) = failure {
                return Err(ApiError::Backend { status: 500, body });
            }
            Ok(())
        }

        /// The stored order in hydrated shape, allocating an intent address
        /// when it was only dehydrated so far.
        fn hydrated(&self, id: OrderId) -> Result<HydratedOrder, ApiError> {
            let mut state = self.lock();
            match state.orders.get(&id) {
                Some(Order::Hydrated(order)) => Ok(order.clone()),
                Some(Order::Dehydrated(order)) => {
                    let hydrated = hydrate_dehydrated(order);
                    state.orders.insert(id, Order::Hydrated(hydrated.clone()));
                    Ok(hydrated)
                }
                None => Err(not_found()),
            }
        }

        fn verify(
            &self,
            id: OrderId,
            apply: impl FnOnce(&mut HydratedOrder),
        ) -> Result<HydratedOrder, ApiError> {
            let mut order = self.hydrated(id)?;
            order.intent_status = self.lock().verify_status;
            if order.intent_status == IntentStatus::Started {
                order.source_status = SourceStatus::PendingProcessing;
            }
            apply(&mut order);
            self.lock().orders.insert(id, Order::Hydrated(order.clone()));
            Ok(order)
        }
    }

    impl Default for MockPayApi {
        fn default() -> Self {
            Self::new()
        }
    }

    fn not_found() -> ApiError {
        ApiError::Backend {
            status: 404,
            body: "{\"error\":\"order not found\"}".to_string(),
        }
    }

    #[allow(clippy::expect_used)]
    fn intent_addr_for(id: OrderId) -> EvmAddress {
        format!("0x{:040x}", id.value())
            .parse()
            .expect("hex literal should always parse")
    }

    /// Fill in the hydration-only fields of a stored dehydrated order.
    fn hydrate_dehydrated(order: &DehydratedOrder) -> HydratedOrder {
        HydratedOrder {
            id: order.id,
            intent_status: IntentStatus::Unpaid,
            intent_addr: intent_addr_for(order.id),
            dest_address: order.dest_address.clone(),
            dest_final_call_token_amount: order.dest_final_call_token_amount.clone(),
            dest_final_call: order.dest_final_call.clone(),
            nonce: order.nonce,
            created_at: order.created_at,
            expiration_ts: Some(order.created_at + 3600),
            usd_value: order.dest_final_call_token_amount.usd,
            metadata: order.metadata.clone(),
            external_id: order.external_id.clone(),
            user_metadata: order.user_metadata.clone(),
            refund_addr: order
                .refund_addr
                .clone()
                .unwrap_or_else(|| order.dest_address.clone()),
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

    /// Build the hydrated order a registration call answers with.
    fn hydrate_input(input: &PaymentInput, request: &PaymentRequestData) -> HydratedOrder {
        let token = usdc();
        let base_units = parse_units(&input.to_units, token.decimals).unwrap_or(0);
        let amount = TokenAmount::from_units(token, base_units);
        HydratedOrder {
            id: input.id,
            intent_status: IntentStatus::Unpaid,
            intent_addr: intent_addr_for(input.id),
            dest_address: input.to_address.clone(),
            usd_value: amount.usd,
            dest_final_call_token_amount: amount,
            dest_final_call: OnChainCall {
                to: input
                    .to_address
                    .as_evm()
                    .cloned()
                    .unwrap_or_else(EvmAddress::zero),
                data: input
                    .to_call_data
                    .clone()
                    .unwrap_or_else(|| "0x".to_string()),
                value: 0,
            },
            nonce: input.id.value(),
            created_at: 1_735_689_600,
            expiration_ts: Some(1_735_693_200),
            metadata: input.metadata.clone(),
            external_id: input.external_id.clone(),
            user_metadata: input.user_metadata.clone(),
            refund_addr: request
                .refund_address
                .clone()
                .unwrap_or_else(|| input.to_address.clone()),
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

    impl PayApiClient for MockPayApi {
        fn get_order(
            &self,
            id: OrderId,
        ) -> Pin<Box<dyn Future<Output = Result<Order, ApiError>> + Send + '_>> {
            Box::pin(async move {
                self.answer("get_order").await?;
                self.lock().orders.get(&id).cloned().ok_or_else(not_found)
            })
        }

        fn create_payment(
            &self,
            request: PaymentRequestData,
        ) -> Pin<Box<dyn Future<Output = Result<PaymentResponseData, ApiError>> + Send + '_>>
        {
            Box::pin(async move {
                self.answer("create_payment").await?;
                let order = hydrate_input(&request.payment_input, &request);
                self.lock()
                    .orders
                    .insert(order.id, Order::Hydrated(order.clone()));
                Ok(PaymentResponseData { order })
            })
        }

        fn get_payment_by_id(
            &self,
            id: OrderId,
        ) -> Pin<Box<dyn Future<Output = Result<PaymentResponseData, ApiError>> + Send + '_>>
        {
            Box::pin(async move {
                self.answer("get_payment_by_id").await?;
                let order = self.hydrated(id)?;
                Ok(PaymentResponseData { order })
            })
        }

        fn process_source_payment(
            &self,
            args: ProcessSourcePayment,
        ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>> {
            Box::pin(async move {
                self.answer("process_source_payment").await?;
                self.verify(args.order_id, |order| {
                    order.source_fulfiller_addr = Some(args.source_fulfiller_addr.clone());
                    order.source_initiate_tx_hash = Some(args.source_initiate_tx_hash.clone());
                })
            })
        }

        fn process_solana_source_payment(
            &self,
            args: ProcessSolanaSourcePayment,
        ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>> {
            Box::pin(async move {
                self.answer("process_solana_source_payment").await?;
                self.verify(args.order_id, |order| {
                    order.source_start_tx_hash = Some(args.start_intent_tx_hash.clone());
                })
            })
        }

        fn process_stellar_source_payment(
            &self,
            args: ProcessStellarSourcePayment,
        ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>> {
            Box::pin(async move {
                self.answer("process_stellar_source_payment").await?;
                self.verify(args.order_id, |order| {
                    order.source_initiate_tx_hash = Some(args.payment_tx_hash.clone());
                })
            })
        }

        fn find_order_payments(
            &self,
            id: OrderId,
        ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>> {
            Box::pin(async move {
                self.answer("find_order_payments").await?;
                self.hydrated(id)
            })
        }
    }
}

// Re-export commonly used items
pub use mocks::{
    FixedClock, MockPayApi, SequentialIdGenerator, StaticTokenDirectory, test_clock, usdc,
};
