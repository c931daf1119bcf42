//! Flattened order views for rendering and webhooks.
//!
//! [`Order::view`] projects either order shape into one read model with
//! stable display fields, so consumers don't branch on hydration.

use crate::address::{TokenAddress, TxHash, WalletAddress};
use crate::order::{HydratedOrder, IntentStatus, Order};
use serde::{Deserialize, Serialize};

/// Payments are shown as expired this many seconds before the allocated
/// address actually expires.
pub const EXPIRY_DISPLAY_MARGIN_SECS: i64 = 3600;

/// Sentinel expiry for orders with no expiration on record: far in the
/// past, so they always display as expired.
pub const PAST_EXPIRATION_SENTINEL: i64 = 1_000_000_000;

/// When to show an order as expired, unix seconds.
///
/// One hour earlier than the real expiration, so payers never race the
/// allocated address. An order without an expiration displays as already
/// expired.
#[must_use]
pub const fn display_expires_at(order: &HydratedOrder) -> i64 {
    match order.expiration_ts {
        Some(ts) => ts - EXPIRY_DISPLAY_MARGIN_SECS,
        None => PAST_EXPIRATION_SENTINEL,
    }
}

/// Human-facing display block of an order view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    /// Short human-readable purpose.
    pub intent: String,
    /// USD value to two decimals, e.g. `"25.00"`.
    pub payment_value: String,
    /// Display currency; always `"USD"`.
    pub currency: String,
}

/// Pay-in leg of an order view; present once a source payment is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceView {
    /// The paying address.
    pub payer_address: WalletAddress,
    /// The payer's transaction, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Chain the payment came from.
    pub chain_id: u64,
    /// Amount paid, in whole units.
    pub amount_units: String,
    /// Token symbol.
    pub token_symbol: String,
    /// Token address.
    pub token_address: TokenAddress,
}

/// Pay-out leg of an order view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationView {
    /// Receiving address.
    pub destination_address: WalletAddress,
    /// The settling transaction: fast-finish when present, else the claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Destination chain id.
    pub chain_id: u64,
    /// Amount received, in whole units.
    pub amount_units: String,
    /// Token symbol.
    pub token_symbol: String,
    /// Token address.
    pub token_address: TokenAddress,
    /// Calldata executed on settlement.
    pub call_data: String,
}

/// Flattened read model of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    /// Order id in its base58 spelling.
    pub id: String,
    /// Where the payment intent is in its lifecycle.
    pub status: IntentStatus,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Human-facing display block.
    pub display: DisplayView,
    /// Pay-in leg; present once a source payment is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceView>,
    /// Pay-out leg.
    pub destination: DestinationView,
    /// Caller-supplied correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Order {
    /// Project this order into its flattened read model.
    #[must_use]
    pub fn view(&self) -> OrderView {
        let amount = self.dest_final_call_token_amount();
        let display = DisplayView {
            intent: self.metadata().intent.clone(),
            payment_value: format!("{:.2}", amount.usd),
            currency: "USD".to_string(),
        };

        let (dest_address, dest_tx, call_data, source) = match self {
            Self::Hydrated(order) => {
                let source = match (&order.source_fulfiller_addr, &order.source_token_amount) {
                    (Some(payer), Some(paid)) => Some(SourceView {
                        payer_address: payer.clone(),
                        tx_hash: order.source_initiate_tx_hash.clone(),
                        chain_id: paid.token.chain_id,
                        amount_units: paid.units(),
                        token_symbol: paid.token.symbol.clone(),
                        token_address: paid.token.address.clone(),
                    }),
                    _ => None,
                };
                let dest_tx = order
                    .dest_fast_finish_tx_hash
                    .clone()
                    .or_else(|| order.dest_claim_tx_hash.clone());
                (
                    order.dest_address.clone(),
                    dest_tx,
                    order.dest_final_call.data.clone(),
                    source,
                )
            },
            Self::Dehydrated(order) => (
                order.dest_address.clone(),
                None,
                order.dest_final_call.data.clone(),
                None,
            ),
        };

        OrderView {
            id: self.id().to_string(),
            status: self.intent_status(),
            created_at: self.created_at(),
            display,
            source,
            destination: DestinationView {
                destination_address: dest_address,
                tx_hash: dest_tx,
                chain_id: amount.token.chain_id,
                amount_units: amount.units(),
                token_symbol: amount.token.symbol.clone(),
                token_address: amount.token.address.clone(),
                call_data,
            },
            external_id: self.external_id().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::ids::OrderId;
    use crate::metadata::OrderMetadata;
    use crate::order::{DestStatus, OnChainCall, SourceStatus};
    use crate::token::{TokenAmount, TokenInfo};
    use std::collections::HashMap;

    fn usdc() -> TokenInfo {
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

    fn hydrated() -> HydratedOrder {
        HydratedOrder {
            id: OrderId::new(42),
            intent_status: IntentStatus::Started,
            intent_addr: "0x2222222222222222222222222222222222222222"
                .parse()
                .unwrap(),
            dest_address: "0x1111111111111111111111111111111111111111"
                .parse()
                .unwrap(),
            dest_final_call_token_amount: TokenAmount::from_usd(usdc(), 25.0),
            dest_final_call: OnChainCall::empty(),
            nonce: 7,
            created_at: 1_735_689_600,
            expiration_ts: Some(1_735_693_200),
            usd_value: 25.0,
            metadata: OrderMetadata::with_intent("Deposit"),
            external_id: Some("inv-77".to_string()),
            user_metadata: HashMap::new(),
            refund_addr: "0x1111111111111111111111111111111111111111"
                .parse()
                .unwrap(),
            source_fulfiller_addr: Some(
                "0x3333333333333333333333333333333333333333".parse().unwrap(),
            ),
            source_token_amount: Some(TokenAmount::from_usd(usdc(), 25.0)),
            source_initiate_tx_hash: Some("0xfeed".parse().unwrap()),
            source_start_tx_hash: None,
            source_status: SourceStatus::Processed,
            dest_status: DestStatus::FastFinished,
            dest_fast_finish_tx_hash: Some("0xfast".parse().unwrap()),
            dest_claim_tx_hash: Some("0xclaim".parse().unwrap()),
        }
    }

    #[test]
    fn payment_value_has_two_decimals() {
        let view = Order::Hydrated(hydrated()).view();
        assert_eq!(view.display.payment_value, "25.00");
        assert_eq!(view.display.currency, "USD");
    }

    #[test]
    fn destination_prefers_the_fast_finish_tx() {
        let view = Order::Hydrated(hydrated()).view();
        assert_eq!(view.destination.tx_hash.unwrap().as_str(), "0xfast");
    }

    #[test]
    fn destination_falls_back_to_the_claim_tx() {
        let mut order = hydrated();
        order.dest_fast_finish_tx_hash = None;
        let view = Order::Hydrated(order).view();
        assert_eq!(view.destination.tx_hash.unwrap().as_str(), "0xclaim");
    }

    #[test]
    fn source_block_requires_a_detected_payment() {
        let mut order = hydrated();
        order.source_fulfiller_addr = None;
        order.source_token_amount = None;
        let view = Order::Hydrated(order).view();
        assert!(view.source.is_none());
    }

    #[test]
    fn expiry_displays_one_hour_early() {
        let order = hydrated();
        assert_eq!(
            display_expires_at(&order),
            1_735_693_200 - EXPIRY_DISPLAY_MARGIN_SECS
        );
    }

    #[test]
    fn missing_expiry_displays_as_long_expired() {
        let mut order = hydrated();
        order.expiration_ts = None;
        assert_eq!(display_expires_at(&order), PAST_EXPIRATION_SENTINEL);
    }
}
