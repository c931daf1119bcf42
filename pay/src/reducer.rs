//! The payment state machine.
//!
//! [`PaymentReducer`] is the pure transition function of the flow: given the
//! previous [`PaymentState`] and a [`PaymentEvent`], it returns the next
//! state. One handler per current-state tag; events a state does not
//! recognize fall through to the previous state unchanged, so the reducer is
//! total and never fails on an unexpected event.
//!
//! Terminal states (`payment_completed`, `payment_bounced`, `error`) accept
//! only `reset`. Once a payment is finished, only a fresh reset can restart
//! the flow.

use crate::events::PaymentEvent;
use crate::state::{PayParamsData, PaymentState};
use intent_pay_common::order::{DehydratedOrder, HydratedOrder, IntentStatus, Order};
use intent_pay_common::token::TokenAmount;
use intent_pay_core::Reducer;

/// The payment lifecycle reducer.
///
/// Stateless; all inputs arrive through [`Reducer::reduce`].
#[derive(Debug, Clone, Copy)]
pub struct PaymentReducer;

impl PaymentReducer {
    /// Create a new payment reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PaymentReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for PaymentReducer {
    type State = PaymentState;
    type Event = PaymentEvent;

    fn reduce(&self, prev: &PaymentState, event: &PaymentEvent) -> PaymentState {
        let next = match prev {
            PaymentState::Idle => reduce_idle(event),
            PaymentState::Preview { order, pay_params } => {
                reduce_preview(order, pay_params, event)
            }
            PaymentState::Unhydrated { .. } => reduce_unhydrated(event),
            PaymentState::PaymentUnpaid { .. } => reduce_unpaid(event),
            PaymentState::PaymentStarted { .. } => reduce_started(event),
            PaymentState::PaymentCompleted { .. }
            | PaymentState::PaymentBounced { .. }
            | PaymentState::Error { .. } => reduce_terminal(event),
        };
        next.unwrap_or_else(|| prev.clone())
    }
}

/// Derive the state a freshly loaded order corresponds to.
///
/// Hydrated orders map by their intent status. A dehydrated order must still
/// be unpaid; an order reporting progress without a receiving address breaks
/// the order contract.
///
/// # Panics
///
/// Panics if a dehydrated order reports any status other than unpaid.
#[must_use]
pub fn state_from_order(order: &Order) -> PaymentState {
    match order {
        Order::Hydrated(order) => state_from_hydrated_order(order),
        Order::Dehydrated(order) => {
            assert!(
                order.intent_status == IntentStatus::Unpaid,
                "order {} is {} but not hydrated",
                order.id,
                order.intent_status
            );
            PaymentState::Unhydrated {
                order: order.clone(),
            }
        }
    }
}

/// Map a refreshed hydrated order to its state by intent status.
#[must_use]
pub fn state_from_hydrated_order(order: &HydratedOrder) -> PaymentState {
    let order = order.clone();
    match order.intent_status {
        IntentStatus::Unpaid => PaymentState::PaymentUnpaid { order },
        IntentStatus::Started => PaymentState::PaymentStarted { order },
        IntentStatus::Completed => PaymentState::PaymentCompleted { order },
        IntentStatus::Bounced => PaymentState::PaymentBounced { order },
    }
}

fn reduce_idle(event: &PaymentEvent) -> Option<PaymentState> {
    match event {
        PaymentEvent::PreviewGenerated { order, pay_params } => Some(PaymentState::Preview {
            order: order.clone(),
            pay_params: pay_params.clone(),
        }),
        PaymentEvent::OrderLoaded { order } => Some(state_from_order(order)),
        PaymentEvent::Error { order, message } => Some(error_state(order, message)),
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn reduce_preview(
    order: &DehydratedOrder,
    pay_params: &PayParamsData,
    event: &PaymentEvent,
) -> Option<PaymentState> {
    match event {
        PaymentEvent::OrderHydrated { order } => Some(PaymentState::PaymentUnpaid {
            order: order.clone(),
        }),
        PaymentEvent::SetChosenUsd { usd } => {
            // Recomputed client-side from the quoted price; no backend
            // round-trip while the payer is still choosing an amount.
            let mut updated = order.clone();
            updated.dest_final_call_token_amount =
                TokenAmount::from_usd(updated.dest_final_call_token_amount.token.clone(), *usd);
            Some(PaymentState::Preview {
                order: updated,
                pay_params: pay_params.clone(),
            })
        }
        PaymentEvent::Error { order, message } => Some(error_state(order, message)),
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn reduce_unhydrated(event: &PaymentEvent) -> Option<PaymentState> {
    match event {
        PaymentEvent::OrderHydrated { order } => Some(PaymentState::PaymentUnpaid {
            order: order.clone(),
        }),
        PaymentEvent::Error { order, message } => Some(error_state(order, message)),
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn reduce_unpaid(event: &PaymentEvent) -> Option<PaymentState> {
    match event {
        PaymentEvent::PaymentVerified { order } => {
            if order.intent_status == IntentStatus::Unpaid {
                // The backend looked and found nothing: the registered
                // transaction was not accepted as payment.
                Some(PaymentState::Error {
                    order: Some(Order::Hydrated(order.clone())),
                    message: "Payment failed".to_string(),
                })
            } else {
                Some(state_from_hydrated_order(order))
            }
        }
        PaymentEvent::OrderRefreshed { order } => Some(state_from_hydrated_order(order)),
        PaymentEvent::DestProcessed { order } => Some(dest_processed_state(order)),
        PaymentEvent::Error { order, message } => Some(error_state(order, message)),
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn reduce_started(event: &PaymentEvent) -> Option<PaymentState> {
    match event {
        PaymentEvent::OrderRefreshed { order } => Some(state_from_hydrated_order(order)),
        PaymentEvent::DestProcessed { order } => Some(dest_processed_state(order)),
        PaymentEvent::Error { order, message } => Some(error_state(order, message)),
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn reduce_terminal(event: &PaymentEvent) -> Option<PaymentState> {
    match event {
        PaymentEvent::Reset => Some(PaymentState::Idle),
        _ => None,
    }
}

fn dest_processed_state(order: &HydratedOrder) -> PaymentState {
    let order = order.clone();
    if order.intent_status == IntentStatus::Completed {
        PaymentState::PaymentCompleted { order }
    } else {
        PaymentState::PaymentBounced { order }
    }
}

fn error_state(order: &Option<Order>, message: &str) -> PaymentState {
    PaymentState::Error {
        order: order.clone(),
        message: message.to_string(),
    }
}
