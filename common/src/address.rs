//! Chain-family addresses, token addresses, and transaction hashes.
//!
//! Pay-outs can land on EVM chains, Solana, or Stellar, and pay-ins can
//! originate from any of the three. Address strings are validated per family
//! and carried in the [`WalletAddress`] union so order shapes stay
//! rail-agnostic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for address parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} address: {input}")]
pub struct ParseAddressError {
    kind: &'static str,
    input: String,
}

impl ParseAddressError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

/// An EVM account address: `0x` followed by 40 hex digits.
///
/// Parsing normalizes to lowercase, so two spellings of the same address
/// compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvmAddress(String);

impl EvmAddress {
    /// The zero address, used as the `to` of an empty on-chain call.
    #[must_use]
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EvmAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("0x")
            .ok_or_else(|| ParseAddressError::new("EVM", s))?;
        if rest.len() != 40 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseAddressError::new("EVM", s));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for EvmAddress {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EvmAddress> for String {
    fn from(addr: EvmAddress) -> Self {
        addr.0
    }
}

/// A Solana account public key: base58 spelling of 32 bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SolanaPublicKey(String);

impl SolanaPublicKey {
    /// Get the public key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolanaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SolanaPublicKey {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParseAddressError::new("Solana", s))?;
        if bytes.len() != 32 {
            return Err(ParseAddressError::new("Solana", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for SolanaPublicKey {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SolanaPublicKey> for String {
    fn from(key: SolanaPublicKey) -> Self {
        key.0
    }
}

/// A Stellar account public key: strkey spelling, `G` followed by 55 base32
/// characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StellarPublicKey(String);

impl StellarPublicKey {
    /// Get the public key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StellarPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StellarPublicKey {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_base32 = |c: char| c.is_ascii_uppercase() || ('2'..='7').contains(&c);
        if s.len() != 56 || !s.starts_with('G') || !s.chars().all(is_base32) {
            return Err(ParseAddressError::new("Stellar", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for StellarPublicKey {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StellarPublicKey> for String {
    fn from(key: StellarPublicKey) -> Self {
        key.0
    }
}

/// Which rail an address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// EVM chains (Ethereum, Base, Polygon, ...)
    Evm,
    /// Solana
    Solana,
    /// Stellar
    Stellar,
}

/// A wallet address on any supported rail.
///
/// `FromStr` recognizes the family from the spelling: `0x...` is EVM, a
/// 56-character `G...` strkey is Stellar, and a base58 32-byte key is Solana.
/// Stellar is tried before Solana because strkeys that avoid the base32
/// letters absent from base58 would otherwise decode as base58 too.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WalletAddress {
    /// An EVM account address
    Evm(EvmAddress),
    /// A Solana account public key
    Solana(SolanaPublicKey),
    /// A Stellar account public key
    Stellar(StellarPublicKey),
}

impl WalletAddress {
    /// The rail this address belongs to.
    #[must_use]
    pub const fn family(&self) -> ChainFamily {
        match self {
            Self::Evm(_) => ChainFamily::Evm,
            Self::Solana(_) => ChainFamily::Solana,
            Self::Stellar(_) => ChainFamily::Stellar,
        }
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Evm(addr) => addr.as_str(),
            Self::Solana(key) => key.as_str(),
            Self::Stellar(key) => key.as_str(),
        }
    }

    /// The EVM address, if this is an EVM-family address.
    #[must_use]
    pub const fn as_evm(&self) -> Option<&EvmAddress> {
        match self {
            Self::Evm(addr) => Some(addr),
            _ => None,
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WalletAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            return s.parse().map(Self::Evm);
        }
        if let Ok(key) = s.parse::<StellarPublicKey>() {
            return Ok(Self::Stellar(key));
        }
        if let Ok(key) = s.parse::<SolanaPublicKey>() {
            return Ok(Self::Solana(key));
        }
        Err(ParseAddressError::new("wallet", s))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(addr: WalletAddress) -> Self {
        addr.as_str().to_string()
    }
}

impl From<EvmAddress> for WalletAddress {
    fn from(addr: EvmAddress) -> Self {
        Self::Evm(addr)
    }
}

impl From<SolanaPublicKey> for WalletAddress {
    fn from(key: SolanaPublicKey) -> Self {
        Self::Solana(key)
    }
}

impl From<StellarPublicKey> for WalletAddress {
    fn from(key: StellarPublicKey) -> Self {
        Self::Stellar(key)
    }
}

/// A token address, kept opaque because the spelling differs per rail: hex
/// contract addresses on EVM, base58 mints on Solana, and `CODE:ISSUER` asset
/// ids on Stellar.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAddress(String);

impl TokenAddress {
    /// Create a new `TokenAddress` from a string.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the token address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddressError::new("token", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TokenAddress {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TokenAddress> for String {
    fn from(addr: TokenAddress) -> Self {
        addr.0
    }
}

/// A transaction hash, kept opaque because the spelling differs per rail.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    /// Get the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TxHash {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddressError::new("transaction hash", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TxHash {
    type Error = ParseAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.0
    }
}
