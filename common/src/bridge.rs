//! Bridge routing for the hydration request.
//!
//! When a preview order is hydrated, the backend needs to know which rail the
//! pay-out lands on and, optionally, which rail the payer prefers to pay
//! from. [`payment_bridge_config`] derives both from the order alone, so the
//! mapping is pure and testable without a backend.

use crate::address::{ChainFamily, TokenAddress, WalletAddress};
use crate::order::DehydratedOrder;
use serde::{Deserialize, Serialize};

/// Internal chain id for the Solana rail.
pub const SOLANA_CHAIN_ID: u64 = 501;
/// Internal chain id for the Stellar rail.
pub const STELLAR_CHAIN_ID: u64 = 1500;
/// Issuer of mainnet USDC on Stellar. Stellar asset ids are spelled
/// `CODE:ISSUER`.
pub const STELLAR_USDC_ISSUER: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";

/// The payer's preferred pay-in token, when the order records one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredPayment {
    /// Chain the payer prefers to pay from.
    pub preferred_chain: u64,
    /// Token the payer prefers to pay with.
    pub preferred_token: TokenAddress,
}

/// The pay-out leg of the bridge: where settled funds land.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDestination {
    /// Receiving address on the destination rail.
    pub destination_address: WalletAddress,
    /// Destination chain id (internal ids for non-EVM rails).
    pub chain_id: u64,
    /// Amount in whole units, e.g. `"25.5"`.
    pub amount_units: String,
    /// Destination token symbol.
    pub token_symbol: String,
    /// Destination token address in the rail's spelling.
    pub token_address: TokenAddress,
}

/// Bridge routing sent with the hydration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Preferred pay-in token, when the order records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<PreferredPayment>,
    /// Pay-out destination.
    pub destination: BridgeDestination,
}

/// Derive the bridge routing for an order about to be hydrated.
///
/// The destination follows the order's `dest_address` family:
///
/// - **Stellar**: settles as Stellar USDC, spelled `USDC:<issuer>`, on the
///   Stellar internal chain id.
/// - **Solana**: settles in the order's destination token on the Solana
///   internal chain id.
/// - **EVM**: settles in the order's destination token on its own chain.
///
/// The preferred pay-in comes from the first entry of the payer's
/// `preferred_tokens`, when recorded.
#[must_use]
pub fn payment_bridge_config(order: &DehydratedOrder) -> BridgeConfig {
    let amount = &order.dest_final_call_token_amount;
    let destination = match order.dest_address.family() {
        ChainFamily::Stellar => BridgeDestination {
            destination_address: order.dest_address.clone(),
            chain_id: STELLAR_CHAIN_ID,
            amount_units: amount.units(),
            token_symbol: "USDC".to_string(),
            token_address: TokenAddress::new(format!("USDC:{STELLAR_USDC_ISSUER}")),
        },
        ChainFamily::Solana => BridgeDestination {
            destination_address: order.dest_address.clone(),
            chain_id: SOLANA_CHAIN_ID,
            amount_units: amount.units(),
            token_symbol: amount.token.symbol.clone(),
            token_address: amount.token.address.clone(),
        },
        ChainFamily::Evm => BridgeDestination {
            destination_address: order.dest_address.clone(),
            chain_id: amount.token.chain_id,
            amount_units: amount.units(),
            token_symbol: amount.token.symbol.clone(),
            token_address: amount.token.address.clone(),
        },
    };

    let preferred = order
        .metadata
        .payer
        .as_ref()
        .and_then(|payer| payer.preferred_tokens.as_ref())
        .and_then(|tokens| tokens.first())
        .map(|token| PreferredPayment {
            preferred_chain: token.chain,
            preferred_token: token.address.clone(),
        });

    BridgeConfig {
        preferred,
        destination,
    }
}
