//! Store wiring for the payment flow.

use crate::error::Result;
use crate::events::PaymentEvent;
use crate::reducer::PaymentReducer;
use crate::state::PaymentState;
use intent_pay_runtime::{Store, wait_for_state};

/// The payment store: [`Store`] specialized to the payment reducer.
pub type PaymentStore = Store<PaymentReducer>;

/// Create a payment store starting in `idle`.
#[must_use]
pub fn new_payment_store() -> PaymentStore {
    Store::new(PaymentState::Idle, PaymentReducer::new())
}

/// Wait until the payment state satisfies `extract`.
///
/// Resolves with the extracted value on the first state, current or future,
/// for which `extract` returns `Some`. Entering `error` rejects the wait
/// with the state's message instead.
///
/// # Errors
///
/// - [`crate::PaymentError::Failed`]: the flow entered `error` first
/// - [`crate::PaymentError::Closed`]: the store's change feed shut down
pub async fn wait_for_payment_state<F, T>(store: &PaymentStore, extract: F) -> Result<T>
where
    F: Fn(&PaymentState) -> Option<T>,
{
    let result = wait_for_state(store, extract, |state| {
        state.error_message().map(str::to_string)
    })
    .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::PaymentError;
    use intent_pay_common::order::Order;

    #[tokio::test]
    async fn resolves_on_a_matching_dispatch() {
        let store = new_payment_store();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                wait_for_payment_state(&store, |state| match state {
                    PaymentState::Error { .. } => Some(state.label()),
                    _ => None,
                })
                .await
            })
        };

        tokio::task::yield_now().await;
        store.dispatch(PaymentEvent::Error {
            order: None,
            message: "boom".to_string(),
        });

        // An error state is still a match when the caller asks for it.
        assert_eq!(waiter.await.unwrap().unwrap(), "error");
    }

    #[tokio::test]
    async fn rejects_when_error_arrives_first() {
        let store = new_payment_store();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                wait_for_payment_state(&store, |state| match state {
                    PaymentState::Unhydrated { order } => Some(order.clone()),
                    _ => None,
                })
                .await
            })
        };

        tokio::task::yield_now().await;
        store.dispatch(PaymentEvent::Error {
            order: None,
            message: "order not found".to_string(),
        });

        let error = waiter.await.unwrap().unwrap_err();
        assert_eq!(error, PaymentError::Failed("order not found".to_string()));
    }

    #[tokio::test]
    async fn resolves_immediately_when_already_matching() {
        let store = new_payment_store();
        let result = wait_for_payment_state(&store, |state| match state {
            PaymentState::Idle => Some(()),
            _ => None,
        })
        .await;
        assert!(result.is_ok());
    }

    #[test]
    fn store_starts_idle() {
        let store = new_payment_store();
        assert_eq!(store.state(), PaymentState::Idle);
        assert!(store.read(PaymentState::order).is_none());
    }

    #[test]
    fn order_accessor_reads_through() {
        let store = new_payment_store();
        store.dispatch(PaymentEvent::Error {
            order: None,
            message: "boom".to_string(),
        });
        let order: Option<Order> = store.read(PaymentState::order);
        assert!(order.is_none());
    }
}
