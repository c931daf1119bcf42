//! # Intent Pay Common
//!
//! Payment domain model shared across the intent-pay crates: order ids and
//! their base58 spelling, chain-family addresses, token metadata and unit
//! math, order shapes (dehydrated and hydrated), pay params, bridge routing,
//! the backend API contracts, and read-model views.
//!
//! ## Shape of an order
//!
//! An order starts **dehydrated**: destination, amount, and metadata are
//! known, but no receiving address has been allocated. Hydration locks it to
//! a concrete intent address, nonce, and expiration; from then on only its
//! status fields move. [`order::Order`] is the union of the two shapes, and
//! hydration-only fields exist solely on [`order::HydratedOrder`], so "a
//! started order must be hydrated" is enforced by the type system wherever a
//! hydrated shape is required.
//!
//! ## Wire format
//!
//! All wire-visible types serialize with camelCase field names and the
//! backend's status spellings (`"payment_unpaid"`, `"choose_amount"`, ...).
//! Big integer fields (unit amounts, nonces) travel as decimal strings.

pub mod address;
pub mod api;
pub mod bigint_str;
pub mod bridge;
pub mod ids;
pub mod metadata;
pub mod order;
pub mod pay_params;
pub mod token;
pub mod view;

pub use address::{
    ChainFamily, EvmAddress, ParseAddressError, SolanaPublicKey, StellarPublicKey, TokenAddress,
    TxHash, WalletAddress,
};
pub use api::{
    ApiError, PayApiClient, PaymentInput, PaymentRequestData, PaymentResponseData,
    ProcessSolanaSourcePayment, ProcessSourcePayment, ProcessStellarSourcePayment, TokenDirectory,
};
pub use bridge::{BridgeConfig, BridgeDestination, PreferredPayment, payment_bridge_config};
pub use ids::{OrderId, ParseOrderIdError};
pub use metadata::{OrderItem, OrderMetadata, PayerMetadata, UserMetadataError};
pub use order::{
    DehydratedOrder, DestStatus, HydratedOrder, IntentStatus, OnChainCall, Order, OrderMode,
    SourceStatus,
};
pub use pay_params::PayParams;
pub use token::{ParseUnitsError, TokenAmount, TokenInfo, TokenRef, format_units, parse_units};
pub use view::{DestinationView, DisplayView, OrderView, SourceView, display_expires_at};
