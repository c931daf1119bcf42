//! Order shapes and their status enums.
//!
//! An order exists in two shapes. A [`DehydratedOrder`] knows what is being
//! paid for and where the pay-out should land, but has no receiving address.
//! Hydration allocates the concrete intent address, nonce, and expiration on
//! the backend and yields a [`HydratedOrder`]; after that only the status
//! fields (`intent_status`, `source_status`, `dest_status`, tx hashes) move.
//!
//! [`Order`] is the union of the two shapes. Fields that exist only after
//! hydration live only on [`HydratedOrder`], so "a started order must be
//! hydrated" holds by construction wherever the hydrated type is required.

use crate::address::{EvmAddress, TokenAddress, TxHash, WalletAddress};
use crate::ids::OrderId;
use crate::metadata::OrderMetadata;
use crate::token::TokenAmount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How an order's amount was fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// Fixed-amount checkout: the amount was set at creation.
    Sale,
    /// Deposit flow: the payer chooses the amount before hydration.
    ChooseAmount,
    /// Hydrated: amount and destination are locked server-side.
    Hydrated,
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sale => "sale",
            Self::ChooseAmount => "choose_amount",
            Self::Hydrated => "hydrated",
        };
        write!(f, "{label}")
    }
}

/// Where the payment intent is in its lifecycle, as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    /// No source payment detected yet.
    #[serde(rename = "payment_unpaid")]
    Unpaid,
    /// A source payment was detected or registered and is being processed.
    #[serde(rename = "payment_started")]
    Started,
    /// The destination leg landed; the payment is done.
    #[serde(rename = "payment_completed")]
    Completed,
    /// The destination leg failed and funds were refunded.
    #[serde(rename = "payment_bounced")]
    Bounced,
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unpaid => "payment_unpaid",
            Self::Started => "payment_started",
            Self::Completed => "payment_completed",
            Self::Bounced => "payment_bounced",
        };
        write!(f, "{label}")
    }
}

/// Progress of the pay-in leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Waiting for the payer's transaction.
    WaitingPayment,
    /// Payment seen, not yet submitted for processing.
    PendingProcessing,
    /// Processing transaction submitted.
    StartSubmitted,
    /// Pay-in fully processed.
    Processed,
}

/// Progress of the pay-out leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestStatus {
    /// Pay-out not started.
    Pending,
    /// Fast-finish transaction submitted.
    FastFinishSubmitted,
    /// Fast-finish landed; recipient has funds.
    FastFinished,
    /// Escrow claim landed; the intent is settled.
    Claimed,
}

/// A call to execute on the destination chain when the payment settles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainCall {
    /// Contract or recipient address.
    pub to: EvmAddress,
    /// Hex calldata, `"0x"` for a plain transfer.
    pub data: String,
    /// Native value to attach, in wei.
    #[serde(with = "crate::bigint_str")]
    pub value: u128,
}

impl OnChainCall {
    /// A no-op call: zero address, empty calldata, zero value.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            to: EvmAddress::zero(),
            data: "0x".to_string(),
            value: 0,
        }
    }
}

/// An order before hydration: destination and metadata known, no receiving
/// address allocated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedOrder {
    /// Order id.
    pub id: OrderId,
    /// `Sale` or `ChooseAmount`; the hydrated shape is its own type.
    pub mode: OrderMode,
    /// Always `Unpaid` before hydration.
    pub intent_status: IntentStatus,
    /// Where the pay-out lands; may be on any rail.
    pub dest_address: WalletAddress,
    /// Amount the destination receives.
    pub dest_final_call_token_amount: TokenAmount,
    /// Call to execute on the destination chain, no-op for plain transfers.
    pub dest_final_call: OnChainCall,
    /// Uniqueness nonce, fixed at creation.
    #[serde(with = "crate::bigint_str")]
    pub nonce: u128,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Structured metadata.
    pub metadata: OrderMetadata,
    /// Caller-supplied correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Caller-supplied key/value metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_metadata: HashMap<String, String>,
    /// Refund destination, when already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_addr: Option<WalletAddress>,
}

/// An order after hydration: locked to a receiving address, nonce, and
/// expiration. `intent_addr` and `nonce` never change once set; the status
/// fields are updated by refreshes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedOrder {
    /// Order id.
    pub id: OrderId,
    /// Where the payment intent is in its lifecycle.
    pub intent_status: IntentStatus,
    /// The allocated receiving address the payer sends funds to.
    pub intent_addr: EvmAddress,
    /// Where the pay-out lands; may be on any rail.
    pub dest_address: WalletAddress,
    /// Amount the destination receives.
    pub dest_final_call_token_amount: TokenAmount,
    /// Call to execute on the destination chain, no-op for plain transfers.
    pub dest_final_call: OnChainCall,
    /// Uniqueness nonce, fixed at creation.
    #[serde(with = "crate::bigint_str")]
    pub nonce: u128,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// When the allocated address expires, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_ts: Option<i64>,
    /// USD value of the order.
    pub usd_value: f64,
    /// Structured metadata.
    pub metadata: OrderMetadata,
    /// Caller-supplied correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Caller-supplied key/value metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_metadata: HashMap<String, String>,
    /// Refund destination for bounced payments.
    pub refund_addr: WalletAddress,
    /// Who paid the source leg, once detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_fulfiller_addr: Option<WalletAddress>,
    /// What the source leg paid, once detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_token_amount: Option<TokenAmount>,
    /// The payer's pay-in transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_initiate_tx_hash: Option<TxHash>,
    /// The intent-start transaction, on rails that submit one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_start_tx_hash: Option<TxHash>,
    /// Progress of the pay-in leg.
    pub source_status: SourceStatus,
    /// Progress of the pay-out leg.
    pub dest_status: DestStatus,
    /// Fast-finish pay-out transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_fast_finish_tx_hash: Option<TxHash>,
    /// Escrow claim transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_claim_tx_hash: Option<TxHash>,
}

/// An order in either shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Order {
    /// Hydrated is listed first: untagged deserialization tries the richer
    /// shape before falling back to the dehydrated one.
    Hydrated(HydratedOrder),
    /// An order that has not been hydrated yet.
    Dehydrated(DehydratedOrder),
}

impl Order {
    /// Order id.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        match self {
            Self::Hydrated(order) => order.id,
            Self::Dehydrated(order) => order.id,
        }
    }

    /// The order's mode; `Hydrated` for the hydrated shape.
    #[must_use]
    pub const fn mode(&self) -> OrderMode {
        match self {
            Self::Hydrated(_) => OrderMode::Hydrated,
            Self::Dehydrated(order) => order.mode,
        }
    }

    /// Where the payment intent is in its lifecycle.
    #[must_use]
    pub const fn intent_status(&self) -> IntentStatus {
        match self {
            Self::Hydrated(order) => order.intent_status,
            Self::Dehydrated(order) => order.intent_status,
        }
    }

    /// Creation time, unix seconds.
    #[must_use]
    pub const fn created_at(&self) -> i64 {
        match self {
            Self::Hydrated(order) => order.created_at,
            Self::Dehydrated(order) => order.created_at,
        }
    }

    /// Caller-supplied correlation id.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Self::Hydrated(order) => order.external_id.as_deref(),
            Self::Dehydrated(order) => order.external_id.as_deref(),
        }
    }

    /// Structured metadata.
    #[must_use]
    pub const fn metadata(&self) -> &OrderMetadata {
        match self {
            Self::Hydrated(order) => &order.metadata,
            Self::Dehydrated(order) => &order.metadata,
        }
    }

    /// Amount the destination receives.
    #[must_use]
    pub const fn dest_final_call_token_amount(&self) -> &TokenAmount {
        match self {
            Self::Hydrated(order) => &order.dest_final_call_token_amount,
            Self::Dehydrated(order) => &order.dest_final_call_token_amount,
        }
    }

    /// Whether this order has been hydrated.
    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        matches!(self, Self::Hydrated(_))
    }

    /// The hydrated shape, if hydrated.
    #[must_use]
    pub const fn as_hydrated(&self) -> Option<&HydratedOrder> {
        match self {
            Self::Hydrated(order) => Some(order),
            Self::Dehydrated(_) => None,
        }
    }

    /// Consume into the hydrated shape, if hydrated.
    #[must_use]
    pub fn into_hydrated(self) -> Option<HydratedOrder> {
        match self {
            Self::Hydrated(order) => Some(order),
            Self::Dehydrated(_) => None,
        }
    }
}

impl From<HydratedOrder> for Order {
    fn from(order: HydratedOrder) -> Self {
        Self::Hydrated(order)
    }
}

impl From<DehydratedOrder> for Order {
    fn from(order: DehydratedOrder) -> Self {
        Self::Dehydrated(order)
    }
}
