//! Order identification.
//!
//! Orders are identified by random 128-bit integers. The external spelling is
//! base58 over the big-endian bytes with leading zero bytes trimmed; these
//! strings are the "pay ids" that appear in payment links and API calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for [`OrderId`] parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid order id: {0}")]
pub struct ParseOrderIdError(String);

/// Unique identifier for a payment order.
///
/// # Design
///
/// `OrderId` is a newtype wrapper around `u128` that provides:
/// - Type safety (can't accidentally use a raw integer or string)
/// - The canonical base58 spelling via `Display` and `FromStr`
/// - Serialization as the base58 string, matching the wire format
///
/// # Validation
///
/// - `FromStr::from_str()`: validates input (base58 charset, at most 16 bytes)
/// - `new()`: no validation (for application-controlled values)
///
/// # Examples
///
/// ```
/// use intent_pay_common::ids::OrderId;
///
/// let id = OrderId::new(1);
/// let spelled = id.to_string();
/// let parsed: OrderId = spelled.parse().unwrap();
/// assert_eq!(parsed, id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(u128);

impl OrderId {
    /// Create a new `OrderId` from its numeric value.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The numeric value of this id.
    #[must_use]
    pub const fn value(self) -> u128 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        // Minimal big-endian representation; zero keeps a single zero byte.
        let start = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len() - 1);
        write!(f, "{}", bs58::encode(&bytes[start..]).into_string())
    }
}

impl FromStr for OrderId {
    type Err = ParseOrderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseOrderIdError("order id cannot be empty".to_string()));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParseOrderIdError(format!("not base58: {s}")))?;
        if bytes.len() > 16 {
            return Err(ParseOrderIdError(format!(
                "decodes to {} bytes, expected at most 16: {s}",
                bytes.len()
            )));
        }
        let mut value = 0u128;
        for byte in bytes {
            value = (value << 8) | u128::from(byte);
        }
        Ok(Self(value))
    }
}

impl From<u128> for OrderId {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for OrderId {
    type Error = ParseOrderIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_spells_as_2() {
        // Base58 alphabet starts "123456789A...", so byte 0x01 is "2".
        assert_eq!(OrderId::new(1).to_string(), "2");
    }

    #[test]
    fn zero_round_trips() {
        let id = OrderId::new(0);
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn max_round_trips() {
        let id = OrderId::new(u128::MAX);
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_empty() {
        assert!("".parse::<OrderId>().is_err());
    }

    #[test]
    fn rejects_non_base58() {
        // '0', 'O', 'I', and 'l' are not in the base58 alphabet.
        assert!("0OIl".parse::<OrderId>().is_err());
    }

    #[test]
    fn rejects_overlong() {
        // 17 bytes of 0xff is beyond the 128-bit range.
        let overlong = bs58::encode(&[0xffu8; 17]).into_string();
        let err = overlong.parse::<OrderId>().unwrap_err();
        assert!(err.to_string().contains("17 bytes"));
    }

    #[test]
    fn serde_uses_base58_string() {
        let id = OrderId::new(123_456_789);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn display_parse_round_trips(value in any::<u128>()) {
            let id = OrderId::new(value);
            let parsed: OrderId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}
