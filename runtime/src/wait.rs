//! Async bridges from subscriptions to awaitable state conditions.
//!
//! Imperative call sites often need "dispatch, then give me the order once
//! the machine reaches state X". These helpers subscribe to the store's
//! change feed and resolve when a caller-supplied extractor matches, or
//! reject as soon as the machine lands in an error state.
//!
//! The subscription is taken out **before** the current state is inspected,
//! so a transition that lands between the two is still observed through the
//! channel rather than lost.

use crate::error::StoreError;
use crate::store::Store;
use intent_pay_core::Reducer;
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait until the store's state satisfies `extract`.
///
/// `extract` is called against the current state first, then against the
/// `next` side of every subsequent change. The first `Some(value)` resolves
/// the wait. `error_of` is checked the same way; the first `Some(message)`
/// rejects it.
///
/// If the waiter lags behind the change feed, intermediate changes are
/// dropped and the current state is re-checked, so a terminal condition is
/// never missed.
///
/// # Errors
///
/// - [`StoreError::ErrorState`] when `error_of` matches before `extract`
/// - [`StoreError::ChannelClosed`] if the change feed shuts down
///
/// # Example
///
/// ```ignore
/// let order = wait_for_state(
///     &store,
///     |s| s.hydrated_order().cloned(),
///     |s| s.error_message().map(str::to_string),
/// )
/// .await?;
/// ```
pub async fn wait_for_state<R, F, G, T>(
    store: &Store<R>,
    extract: F,
    error_of: G,
) -> Result<T, StoreError>
where
    R: Reducer,
    R::Event: Clone,
    F: Fn(&R::State) -> Option<T>,
    G: Fn(&R::State) -> Option<String>,
{
    // Subscribe before the fast-path check so no change can slip between.
    let mut rx = store.subscribe_changes();

    let current = store.state();
    if let Some(value) = extract(&current) {
        return Ok(value);
    }
    if let Some(message) = error_of(&current) {
        return Err(StoreError::ErrorState { message });
    }
    drop(current);

    loop {
        match rx.recv().await {
            Ok(change) => {
                if let Some(value) = extract(&change.next) {
                    return Ok(value);
                }
                if let Some(message) = error_of(&change.next) {
                    return Err(StoreError::ErrorState { message });
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Slow waiter, changes were dropped. The latest state is
                // authoritative, so re-check it directly.
                tracing::warn!(skipped, "State waiter lagged, re-checking current state");
                let current = store.state();
                if let Some(value) = extract(&current) {
                    return Ok(value);
                }
                if let Some(message) = error_of(&current) {
                    return Err(StoreError::ErrorState { message });
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(StoreError::ChannelClosed);
            }
        }
    }
}

/// [`wait_for_state`] with an upper bound on how long to wait.
///
/// # Errors
///
/// - [`StoreError::Timeout`] when the deadline passes first
/// - Everything [`wait_for_state`] can return
pub async fn wait_for_state_timeout<R, F, G, T>(
    store: &Store<R>,
    extract: F,
    error_of: G,
    timeout: Duration,
) -> Result<T, StoreError>
where
    R: Reducer,
    R::Event: Clone,
    F: Fn(&R::State) -> Option<T>,
    G: Fn(&R::State) -> Option<String>,
{
    tokio::time::timeout(timeout, wait_for_state(store, extract, error_of))
        .await
        .map_err(|_| StoreError::Timeout)?
}
