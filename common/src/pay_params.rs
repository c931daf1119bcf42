//! Payment parameters supplied by the integrating app.

use crate::address::{TokenAddress, WalletAddress};
use crate::token::TokenRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything an app provides to start a payment.
///
/// Two flows exist. A **sale** sets `to_units` up front; a **deposit** leaves
/// `to_units` unset and the payer chooses a USD amount before hydration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayParams {
    /// The integrating app's id.
    pub app_id: String,
    /// Destination chain id.
    pub to_chain: u64,
    /// Destination token address.
    pub to_token: TokenAddress,
    /// Destination amount in whole units, e.g. `"25.5"`. `None` selects the
    /// deposit flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_units: Option<String>,
    /// Where the pay-out lands.
    pub to_address: WalletAddress,
    /// Calldata to execute on settlement, for contract destinations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_call_data: Option<String>,
    /// Human-readable purpose shown to the payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Allowed payment option labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_options: Option<Vec<String>>,
    /// Chains the payer prefers to pay from, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_chains: Option<Vec<u64>>,
    /// Tokens the payer prefers to pay with, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_tokens: Option<Vec<TokenRef>>,
    /// EVM chains to offer in wallet flows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm_chains: Option<Vec<u64>>,
    /// Caller-supplied correlation id; not allowed in the deposit flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Caller-supplied key/value metadata attached to the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    /// Refund destination for bounced payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_address: Option<WalletAddress>,
}

impl PayParams {
    /// Whether these params select the deposit flow (payer-chosen amount).
    #[must_use]
    pub const fn is_deposit_flow(&self) -> bool {
        self.to_units.is_none()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn params() -> PayParams {
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

    #[test]
    fn missing_units_selects_deposit_flow() {
        assert!(params().is_deposit_flow());
        let mut sale = params();
        sale.to_units = Some("25.5".to_string());
        assert!(!sale.is_deposit_flow());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(params()).unwrap();
        assert_eq!(json["appId"], "test");
        assert_eq!(json["toChain"], 8453);
        assert!(json.get("toUnits").is_none());
    }
}
