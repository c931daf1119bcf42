//! Error types and backend failure-message extraction.
//!
//! Backends answer failures with JSON envelopes of varying shapes
//! (`{"message": ...}`, `{"error": "..."}`, `{"error": {"message": ...}}`).
//! [`parse_error_message`] unwraps whichever shape arrives into the
//! human-readable core, and [`ErrorKind::categorize`] buckets that message by
//! keyword so consumers can vary their response to trustline, liquidity, or
//! connectivity failures without string-matching themselves.

use intent_pay_runtime::StoreError;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Shown when a failure carries no usable message at all.
pub const FALLBACK_ERROR_MESSAGE: &str = "Something bad happened";

/// Errors surfaced by the imperative payment API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The flow landed in the `error` state.
    ///
    /// The display form is the failure message itself, already run through
    /// [`parse_error_message`].
    #[error("{0}")]
    Failed(String),

    /// The requested operation is not valid in the current state.
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the flow was in.
        state: &'static str,
    },

    /// The store shut down while waiting for a state.
    #[error("payment store closed")]
    Closed,

    /// A bounded wait ran out of time.
    #[error("timed out waiting for payment state")]
    Timeout,
}

impl From<StoreError> for PaymentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ErrorState { message } => Self::Failed(message),
            StoreError::ChannelClosed => Self::Closed,
            StoreError::Timeout => Self::Timeout,
        }
    }
}

/// Extract the human-readable core of a backend failure message.
///
/// Messages that parse as JSON yield their `message` field, else their
/// `error` field (a plain string or a nested `{"error": {"message": ...}}`).
/// Anything else passes through unchanged; an empty message becomes
/// [`FALLBACK_ERROR_MESSAGE`].
#[must_use]
pub fn parse_error_message(raw: &str) -> String {
    if raw.is_empty() {
        return FALLBACK_ERROR_MESSAGE.to_string();
    }
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match value.get("error") {
        Some(Value::String(error)) => error.clone(),
        Some(error) => match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => raw.to_string(),
        },
        None => raw.to_string(),
    }
}

/// Keyword bucket of a failure message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The recipient is missing a trustline for the asset (Stellar).
    Trustline,
    /// The route ran out of liquidity or exceeded a limit.
    Liquidity,
    /// The payment or its transaction failed outright.
    PaymentFailed,
    /// Connectivity trouble between client and backend.
    Network,
    /// The payer's balance cannot cover the payment.
    InsufficientFunds,
    /// The payer or their wallet rejected the request.
    Rejected,
    /// Nothing recognizable.
    Unknown,
}

impl ErrorKind {
    /// Bucket a failure message by keyword, case-insensitively.
    #[must_use]
    pub fn categorize(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("trustline") {
            Self::Trustline
        } else if message.contains("liquidity") || message.contains("exceeds limit") {
            Self::Liquidity
        } else if message.contains("payment failed") || message.contains("transaction failed") {
            Self::PaymentFailed
        } else if message.contains("network") || message.contains("connection") {
            Self::Network
        } else if message.contains("insufficient funds") || message.contains("insufficient balance")
        {
            Self::InsufficientFunds
        } else if message.contains("rejected") || message.contains("denied") {
            Self::Rejected
        } else {
            Self::Unknown
        }
    }
}
