//! Payment lifecycle states.
//!
//! [`PaymentState`] is the tagged union at the center of the flow: every
//! dispatch produces exactly one of these variants, and everything a consumer
//! renders or branches on is read from it. Each in-progress variant carries
//! the order in the richest shape the flow has seen so far, so "a started
//! payment has a receiving address" holds by construction.
//!
//! The serialized form is internally tagged (`{"type": "payment_unpaid", ...}`)
//! with the same tag spellings the backend uses for intent statuses.

use intent_pay_common::ids::OrderId;
use intent_pay_common::order::{DehydratedOrder, HydratedOrder, Order};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The slice of the caller's pay params that hydration needs later but the
/// preview order itself does not carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayParamsData {
    /// The integrating app's id.
    pub app_id: String,
    /// Calldata to execute on settlement, exactly as the caller passed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_call_data: Option<String>,
}

/// Where a payment session is in its lifecycle.
///
/// ```text
/// idle ──set_pay_params──▶ preview ──hydrate──▶ payment_unpaid
///   │                                               │
///   └──set_pay_id──▶ unhydrated ──hydrate──────────┘
///                                                   │
///                        payment_started ◀──────────┤ (source payment seen)
///                              │                    │
///                    payment_completed / payment_bounced
/// ```
///
/// `error` can be entered from any non-terminal state; `reset` returns to
/// `idle` from anywhere. `payment_completed`, `payment_bounced`, and `error`
/// are terminal: they ignore every event except `reset`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentState {
    /// No payment in progress.
    Idle,

    /// A client-side preview order awaiting hydration. The amount is still
    /// editable in the deposit flow.
    Preview {
        /// The previewed order.
        order: DehydratedOrder,
        /// Params slice needed when the preview is hydrated.
        pay_params: PayParamsData,
    },

    /// An order loaded by id, not yet locked to a receiving address.
    Unhydrated {
        /// The loaded order.
        order: DehydratedOrder,
    },

    /// Hydrated and waiting for the payer's source payment.
    PaymentUnpaid {
        /// The hydrated order.
        order: HydratedOrder,
    },

    /// A source payment was detected or registered; the backend is
    /// processing it.
    PaymentStarted {
        /// The hydrated order.
        order: HydratedOrder,
    },

    /// The destination leg landed; the payment is done.
    PaymentCompleted {
        /// The settled order.
        order: HydratedOrder,
    },

    /// The destination leg failed and funds were refunded.
    PaymentBounced {
        /// The bounced order.
        order: HydratedOrder,
    },

    /// The flow failed.
    Error {
        /// Best-known order at failure time, for display context.
        order: Option<Order>,
        /// Human-readable failure message.
        message: String,
    },
}

impl PaymentState {
    /// The state's tag, matching its serialized `type` field.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preview { .. } => "preview",
            Self::Unhydrated { .. } => "unhydrated",
            Self::PaymentUnpaid { .. } => "payment_unpaid",
            Self::PaymentStarted { .. } => "payment_started",
            Self::PaymentCompleted { .. } => "payment_completed",
            Self::PaymentBounced { .. } => "payment_bounced",
            Self::Error { .. } => "error",
        }
    }

    /// The id of the order this state is about, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::Idle | Self::Error { order: None, .. } => None,
            Self::Preview { order, .. } | Self::Unhydrated { order } => Some(order.id),
            Self::PaymentUnpaid { order }
            | Self::PaymentStarted { order }
            | Self::PaymentCompleted { order }
            | Self::PaymentBounced { order } => Some(order.id),
            Self::Error {
                order: Some(order), ..
            } => Some(order.id()),
        }
    }

    /// The order this state carries, in whichever shape it has.
    #[must_use]
    pub fn order(&self) -> Option<Order> {
        match self {
            Self::Idle => None,
            Self::Preview { order, .. } | Self::Unhydrated { order } => {
                Some(Order::Dehydrated(order.clone()))
            }
            Self::PaymentUnpaid { order }
            | Self::PaymentStarted { order }
            | Self::PaymentCompleted { order }
            | Self::PaymentBounced { order } => Some(Order::Hydrated(order.clone())),
            Self::Error { order, .. } => order.clone(),
        }
    }

    /// The hydrated order, for states past hydration.
    #[must_use]
    pub const fn hydrated_order(&self) -> Option<&HydratedOrder> {
        match self {
            Self::PaymentUnpaid { order }
            | Self::PaymentStarted { order }
            | Self::PaymentCompleted { order }
            | Self::PaymentBounced { order } => Some(order),
            _ => None,
        }
    }

    /// The failure message, when in `error`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether this state accepts only `reset`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentCompleted { .. } | Self::PaymentBounced { .. } | Self::Error { .. }
        )
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
