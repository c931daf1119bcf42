//! Payment lifecycle events.
//!
//! [`PaymentEvent`] is the single input type of the flow. **Commands** are
//! requests to act, dispatched by callers; **results** are facts reported
//! back by the effect handler once the requested work finishes. The reducer
//! treats both uniformly; the split exists so logs and tests can tell intent
//! from outcome.
//!
//! Serialized events are internally tagged (`{"type": "set_pay_params", ...}`)
//! with snake_case tags matching [`PaymentEvent::name`].

use crate::state::PayParamsData;
use intent_pay_common::address::{TokenAddress, TxHash, WalletAddress};
use intent_pay_common::ids::OrderId;
use intent_pay_common::order::{DehydratedOrder, HydratedOrder, Order};
use intent_pay_common::pay_params::PayParams;
use intent_pay_macros::Event;
use serde::{Deserialize, Serialize};

/// An input to the payment reducer.
#[derive(Event, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════
    /// Start a new payment from caller-supplied params.
    ///
    /// The effect handler validates the params, builds a preview order
    /// client-side, and reports [`PaymentEvent::PreviewGenerated`].
    #[command]
    SetPayParams {
        /// The caller's payment request.
        params: PayParams,
    },

    /// Resume an existing payment by its id.
    ///
    /// The effect handler fetches the order and reports
    /// [`PaymentEvent::OrderLoaded`].
    #[command]
    SetPayId {
        /// The order to load.
        id: OrderId,
    },

    /// Change the deposit-flow amount while previewing.
    ///
    /// Handled entirely in the reducer: the token amount is recomputed from
    /// the preview's quoted price, with no backend round-trip.
    #[command]
    SetChosenUsd {
        /// The USD amount the payer chose.
        usd: f64,
    },

    /// Lock the current order to a concrete receiving address.
    ///
    /// From `preview` this registers the order with the backend; from
    /// `unhydrated` it fetches the already-registered payment. Either path
    /// reports [`PaymentEvent::OrderHydrated`].
    #[command]
    HydrateOrder {
        /// Overrides the order's refund destination when registering.
        refund_address: Option<WalletAddress>,
    },

    /// Ask the backend to look for source payments now.
    ///
    /// One-shot version of the unpaid-state poller, for "I paid out-of-band,
    /// go look" flows. Reports [`PaymentEvent::OrderRefreshed`].
    #[command]
    PaySource,

    /// Register a broadcast EVM transaction for verification.
    ///
    /// Reports [`PaymentEvent::PaymentVerified`] with the backend's
    /// authoritative view of the order.
    #[command]
    PayEthereumSource {
        /// The payer's broadcast transaction.
        source_initiate_tx_hash: TxHash,
        /// Chain the transaction was sent on.
        source_chain_id: u64,
        /// The paying address.
        source_fulfiller_addr: WalletAddress,
        /// Token the payer sent.
        source_token: TokenAddress,
        /// Amount sent, in base units.
        #[serde(with = "intent_pay_common::bigint_str")]
        source_amount: u128,
    },

    /// Register a submitted Solana transaction for verification.
    #[command]
    PaySolanaSource {
        /// The transaction that started the intent.
        start_intent_tx_hash: TxHash,
        /// Mint the payer sent.
        token: TokenAddress,
    },

    /// Register a submitted Stellar transaction for verification.
    #[command]
    PayStellarSource {
        /// The payer's submitted transaction.
        payment_tx_hash: TxHash,
        /// Asset the payer sent.
        token: TokenAddress,
    },

    /// Abandon the current payment and return to `idle`.
    #[command]
    Reset,

    // ═══════════════════════════════════════════════════════════════════════
    // Results
    // ═══════════════════════════════════════════════════════════════════════
    /// A preview order was built from pay params.
    #[result]
    PreviewGenerated {
        /// The previewed order.
        order: DehydratedOrder,
        /// Params slice needed when the preview is hydrated.
        pay_params: PayParamsData,
    },

    /// An order was fetched by id.
    #[result]
    OrderLoaded {
        /// The fetched order, in whichever shape the backend has.
        order: Order,
    },

    /// The backend allocated a receiving address for the order.
    #[result]
    OrderHydrated {
        /// The hydrated order.
        order: HydratedOrder,
    },

    /// The backend verified a registered source transaction.
    #[result]
    PaymentVerified {
        /// The backend's authoritative view after verification.
        order: HydratedOrder,
    },

    /// A poll or explicit refresh returned the order's current state.
    #[result]
    OrderRefreshed {
        /// The refreshed order.
        order: HydratedOrder,
    },

    /// The destination leg finished processing.
    #[result]
    DestProcessed {
        /// The order with its final destination status.
        order: HydratedOrder,
    },

    /// An effect failed.
    #[result]
    Error {
        /// Best-known order at failure time.
        order: Option<Order>,
        /// Human-readable failure message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn names_are_snake_case_tags() {
        let event = PaymentEvent::SetPayParams {
            params: deposit_params(),
        };
        assert_eq!(event.name(), "set_pay_params");
        assert_eq!(PaymentEvent::Reset.name(), "reset");
        assert_eq!(
            PaymentEvent::SetChosenUsd { usd: 25.0 }.name(),
            "set_chosen_usd"
        );
    }

    #[test]
    fn commands_and_results_are_disjoint() {
        let command = PaymentEvent::PaySource;
        assert!(command.is_command());
        assert!(!command.is_result());

        let result = PaymentEvent::Error {
            order: None,
            message: "boom".to_string(),
        };
        assert!(result.is_result());
        assert!(!result.is_command());
    }

    #[test]
    fn serialized_tag_matches_name() {
        let event = PaymentEvent::SetChosenUsd { usd: 12.5 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["usd"], 12.5);
    }

    fn deposit_params() -> PayParams {
        PayParams {
            app_id: "test".to_string(),
            to_chain: 8453,
            to_token: TokenAddress::new("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            to_units: None,
            to_address: "0x1111111111111111111111111111111111111111"
                .parse()
                .unwrap(),
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
}
