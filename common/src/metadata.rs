//! Order metadata and user-metadata validation.

use crate::token::TokenRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of user-metadata entries per order.
pub const MAX_USER_METADATA_ENTRIES: usize = 50;
/// Maximum length of a user-metadata key, in characters.
pub const MAX_USER_METADATA_KEY_LEN: usize = 40;
/// Maximum length of a user-metadata value, in characters.
pub const MAX_USER_METADATA_VALUE_LEN: usize = 500;

/// Error type for user-metadata validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserMetadataError {
    /// More than [`MAX_USER_METADATA_ENTRIES`] entries.
    #[error("user metadata exceeds 50 entries: {0}")]
    TooManyEntries(usize),
    /// A key longer than [`MAX_USER_METADATA_KEY_LEN`] characters.
    #[error("user metadata key exceeds 40 characters: {0}")]
    KeyTooLong(String),
    /// A value longer than [`MAX_USER_METADATA_VALUE_LEN`] characters.
    #[error("user metadata value for key \"{0}\" exceeds 500 characters")]
    ValueTooLong(String),
}

/// Validate a user-metadata map against the backend's limits.
///
/// # Errors
///
/// Returns [`UserMetadataError`] naming the first violated limit.
pub fn validate_user_metadata(
    metadata: &HashMap<String, String>,
) -> Result<(), UserMetadataError> {
    if metadata.len() > MAX_USER_METADATA_ENTRIES {
        return Err(UserMetadataError::TooManyEntries(metadata.len()));
    }
    for (key, value) in metadata {
        if key.chars().count() > MAX_USER_METADATA_KEY_LEN {
            return Err(UserMetadataError::KeyTooLong(key.clone()));
        }
        if value.chars().count() > MAX_USER_METADATA_VALUE_LEN {
            return Err(UserMetadataError::ValueTooLong(key.clone()));
        }
    }
    Ok(())
}

/// Structured metadata attached to an order at creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    /// Short human-readable purpose, e.g. `"Deposit"` or `"Purchase"`.
    pub intent: String,
    /// Line items, when the order represents a checkout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
    /// Payer preferences recorded when the order was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<PayerMetadata>,
}

impl OrderMetadata {
    /// Metadata with only an intent line.
    #[must_use]
    pub fn with_intent(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            items: Vec::new(),
            payer: None,
        }
    }
}

/// A single line item in an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Item name.
    pub name: String,
    /// Item description.
    pub description: String,
}

/// Payer-side preferences captured into order metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerMetadata {
    /// Allowed payment option labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_options: Option<Vec<String>>,
    /// Chains the payer prefers to pay from, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_chains: Option<Vec<u64>>,
    /// Tokens the payer prefers to pay with, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_tokens: Option<Vec<TokenRef>>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn entries(n: usize) -> HashMap<String, String> {
        (0..n).map(|i| (format!("k{i}"), "v".to_string())).collect()
    }

    #[test]
    fn accepts_maps_at_the_limits() {
        let mut metadata = entries(MAX_USER_METADATA_ENTRIES - 1);
        metadata.insert("k".repeat(40), "v".repeat(500));
        assert!(validate_user_metadata(&metadata).is_ok());
    }

    #[test]
    fn rejects_too_many_entries() {
        let metadata = entries(MAX_USER_METADATA_ENTRIES + 1);
        assert_eq!(
            validate_user_metadata(&metadata),
            Err(UserMetadataError::TooManyEntries(51))
        );
    }

    #[test]
    fn rejects_long_keys() {
        let mut metadata = HashMap::new();
        metadata.insert("k".repeat(41), "v".to_string());
        assert!(matches!(
            validate_user_metadata(&metadata),
            Err(UserMetadataError::KeyTooLong(_))
        ));
    }

    #[test]
    fn rejects_long_values() {
        let mut metadata = HashMap::new();
        metadata.insert("key".to_string(), "v".repeat(501));
        assert_eq!(
            validate_user_metadata(&metadata),
            Err(UserMetadataError::ValueTooLong("key".to_string()))
        );
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let metadata = OrderMetadata {
            intent: "Deposit".to_string(),
            items: Vec::new(),
            payer: Some(PayerMetadata {
                payment_options: None,
                preferred_chains: Some(vec![8453]),
                preferred_tokens: None,
            }),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["intent"], "Deposit");
        assert_eq!(json["payer"]["preferredChains"][0], 8453);
    }
}
