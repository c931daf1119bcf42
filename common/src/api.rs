//! Backend API contracts.
//!
//! This module defines the RPC surface the payment flow needs from the order
//! backend, as a dyn-compatible trait plus the request/response wire types.
//! The flow never constructs HTTP requests itself; everything that talks to
//! the network implements [`PayApiClient`].
//!
//! # Dyn Compatibility
//!
//! The trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to enable trait object usage (`Arc<dyn PayApiClient>`). Effect
//! handlers hold the client behind exactly that type.

use crate::address::{TokenAddress, WalletAddress};
use crate::bridge::BridgeConfig;
use crate::ids::OrderId;
use crate::metadata::OrderMetadata;
use crate::order::{HydratedOrder, Order};
use crate::token::TokenInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors returned by the order backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    ///
    /// The display form is the raw body so callers can run message
    /// extraction over it; backends answer with JSON error envelopes.
    #[error("{body}")]
    Backend {
        /// HTTP-level status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Transport(String),
}

/// The new-payment registration sent when hydrating a preview order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestData {
    /// The integrating app's id.
    pub app_id: String,
    /// The order being registered.
    pub payment_input: PaymentInput,
    /// Bridge routing for the pay-in and pay-out legs.
    pub bridge: BridgeConfig,
    /// Refund destination for bounced payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_address: Option<WalletAddress>,
}

/// The order fields the backend needs to allocate a payment intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// Order id chosen client-side at preview time.
    pub id: OrderId,
    /// Destination chain id.
    pub to_chain: u64,
    /// Destination token address.
    pub to_token: TokenAddress,
    /// Destination amount in whole units.
    pub to_units: String,
    /// Where the pay-out lands.
    pub to_address: WalletAddress,
    /// Calldata to execute on settlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_call_data: Option<String>,
    /// Whether the payer may still change the amount (deposit flow).
    pub is_amount_editable: bool,
    /// Structured metadata.
    pub metadata: OrderMetadata,
    /// Caller-supplied correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Caller-supplied key/value metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_metadata: HashMap<String, String>,
}

/// The backend's answer to payment registration and lookup calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponseData {
    /// The hydrated order the backend allocated.
    pub order: HydratedOrder,
}

impl PaymentResponseData {
    /// Consume into the hydrated order.
    #[must_use]
    pub fn into_order(self) -> HydratedOrder {
        self.order
    }
}

/// Verification request for a payment sent on an EVM chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSourcePayment {
    /// The order the payment is for.
    pub order_id: OrderId,
    /// The payer's broadcast transaction.
    pub source_initiate_tx_hash: crate::address::TxHash,
    /// Chain the transaction was sent on.
    pub source_chain_id: u64,
    /// The paying address.
    pub source_fulfiller_addr: WalletAddress,
    /// Token the payer sent.
    pub source_token: TokenAddress,
    /// Amount sent, in base units.
    #[serde(with = "crate::bigint_str")]
    pub source_amount: u128,
}

/// Verification request for a payment sent on Solana.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSolanaSourcePayment {
    /// The order the payment is for.
    pub order_id: OrderId,
    /// The transaction that started the intent.
    pub start_intent_tx_hash: crate::address::TxHash,
    /// Mint the payer sent.
    pub token: TokenAddress,
}

/// Verification request for a payment sent on Stellar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStellarSourcePayment {
    /// The order the payment is for.
    pub order_id: OrderId,
    /// The payer's submitted transaction.
    pub payment_tx_hash: crate::address::TxHash,
    /// Asset the payer sent.
    pub token: TokenAddress,
}

/// The order backend's RPC surface.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; effect handlers share them across
/// spawned tasks behind an `Arc`.
pub trait PayApiClient: Send + Sync {
    /// Fetch an order by id, in whichever shape it currently has.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Backend`]: unknown id or rejected request
    /// - [`ApiError::Transport`]: backend unreachable
    fn get_order(
        &self,
        id: OrderId,
    ) -> Pin<Box<dyn Future<Output = Result<Order, ApiError>> + Send + '_>>;

    /// Register a previewed order, allocating its payment intent.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Backend`]: rejected registration (bad token/chain pair,
    ///   expired quote)
    /// - [`ApiError::Transport`]: backend unreachable
    fn create_payment(
        &self,
        request: PaymentRequestData,
    ) -> Pin<Box<dyn Future<Output = Result<PaymentResponseData, ApiError>> + Send + '_>>;

    /// Fetch an already-registered payment by order id.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Backend`]: unknown id
    /// - [`ApiError::Transport`]: backend unreachable
    fn get_payment_by_id(
        &self,
        id: OrderId,
    ) -> Pin<Box<dyn Future<Output = Result<PaymentResponseData, ApiError>> + Send + '_>>;

    /// Register an EVM source transaction for verification and return the
    /// backend's authoritative view of the order.
    ///
    /// A verified-but-unpaid order is a successful response; "payment not
    /// detected" is business state, not an error.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Backend`]: malformed registration
    /// - [`ApiError::Transport`]: backend unreachable
    fn process_source_payment(
        &self,
        args: ProcessSourcePayment,
    ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>>;

    /// Register a Solana source transaction for verification.
    ///
    /// # Errors
    ///
    /// Same as [`PayApiClient::process_source_payment`].
    fn process_solana_source_payment(
        &self,
        args: ProcessSolanaSourcePayment,
    ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>>;

    /// Register a Stellar source transaction for verification.
    ///
    /// # Errors
    ///
    /// Same as [`PayApiClient::process_source_payment`].
    fn process_stellar_source_payment(
        &self,
        args: ProcessStellarSourcePayment,
    ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>>;

    /// Look for source payments to this order and return the refreshed
    /// order. Polled while waiting for the payer to pay.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Backend`]: unknown id
    /// - [`ApiError::Transport`]: backend unreachable
    fn find_order_payments(
        &self,
        id: OrderId,
    ) -> Pin<Box<dyn Future<Output = Result<HydratedOrder, ApiError>> + Send + '_>>;
}

/// Token metadata lookup.
///
/// Previews are constructed client-side; the destination `(chain, token)`
/// pair is resolved through this directory, and an unknown pair fails the
/// preview before anything reaches the backend.
pub trait TokenDirectory: Send + Sync {
    /// Resolve token metadata for a `(chain, address)` pair.
    fn resolve(&self, chain_id: u64, address: &TokenAddress) -> Option<TokenInfo>;
}
