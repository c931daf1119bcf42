//! Serde helpers for big integers that travel as decimal strings.
//!
//! Unit amounts and nonces exceed JSON's safe integer range, so the wire
//! carries them as strings. Use with `#[serde(with = "crate::bigint_str")]`.

use serde::{Deserialize, Deserializer, Serializer, de::Error};

/// Serialize a `u128` as its decimal string.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Deserialize a `u128` from its decimal string.
///
/// # Errors
///
/// Fails when the string is not a decimal `u128`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse()
        .map_err(|_| D::Error::custom(format!("not a u128 decimal string: {raw}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "crate::bigint_str")]
        value: u128,
    }

    #[test]
    fn round_trips_past_json_safe_integers() {
        let wrapper = Wrapper {
            value: u128::MAX - 1,
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert!(json.contains(&format!("\"{}\"", u128::MAX - 1)));
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wrapper);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(serde_json::from_str::<Wrapper>("{\"value\":\"12x\"}").is_err());
    }

    #[test]
    fn rejects_bare_numbers() {
        assert!(serde_json::from_str::<Wrapper>("{\"value\":12}").is_err());
    }
}
