//! # Intent Pay
//!
//! The payment lifecycle state machine: track an order from params or id
//! through preview, hydration, payment detection, and settlement, as a store
//! with a pure reducer and an attached effect handler.
//!
//! ## Flow
//!
//! ```text
//! idle ──set_pay_params──▶ preview ──hydrate──▶ payment_unpaid
//! idle ──set_pay_id─────▶ unhydrated ─hydrate─▶ payment_unpaid
//!
//! payment_unpaid ──▶ payment_started ──▶ payment_completed
//!        │                  │        └─▶ payment_bounced
//!        └── error ◀────────┘
//! ```
//!
//! Commands are dispatched into the store; the reducer moves the state;
//! [`PaymentEffectHandler`] watches every change and performs the I/O the
//! transition calls for, feeding results back in as events. While the flow
//! waits on the payer or the backend, pollers keep the order fresh.
//!
//! ## Example
//!
//! ```rust,ignore
//! use intent_pay::{PaymentClient, PaymentEnvironment};
//!
//! let env = PaymentEnvironment::new(api, tokens);
//! let client = PaymentClient::new(env);
//!
//! let order = client.create_preview_order(params).await?;
//! client.set_chosen_usd(25.0);
//! let hydrated = client.hydrate_order(None).await?;
//! // Show hydrated.intent_addr to the payer, then register their payment.
//! ```

// Public modules
pub mod client;
pub mod effects;
pub mod environment;
pub mod error;
pub mod events;
pub mod reducer;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use client::PaymentClient;
pub use effects::PaymentEffectHandler;
pub use environment::{PaymentEnvironment, RandomIdGenerator};
pub use error::{ErrorKind, FALLBACK_ERROR_MESSAGE, PaymentError, Result, parse_error_message};
pub use events::PaymentEvent;
pub use reducer::{PaymentReducer, state_from_hydrated_order, state_from_order};
pub use state::{PayParamsData, PaymentState};
pub use store::{PaymentStore, new_payment_store, wait_for_payment_state};
