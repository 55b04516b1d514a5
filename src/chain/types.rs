//! Chain-level types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque account identifier as rendered by the node (SS58 for substrate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<String> for AccountAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// Signature returned by a signer provider.
///
/// The first byte carries the scheme (0 = ed25519, 1 = sr25519, 2 = ecdsa),
/// the same layout a browser extension returns with `withType`.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes(pub Vec<u8>);

impl SignatureBytes {
    /// Parse a `0x`-prefixed hex signature.
    pub fn from_hex(value: &str) -> Result<Self, hex::FromHexError> {
        let raw = value.strip_prefix("0x").unwrap_or(value);
        hex::decode(raw).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({} bytes)", self.0.len())
    }
}

/// Lifecycle of the single node connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Ready,
    Failed(String),
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }
}

/// Module error decoded against runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFault {
    pub section: String,
    pub name: String,
    pub docs: Vec<String>,
}

/// Chain-level rejection of a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    /// Present when the error maps to a known pallet error.
    pub module: Option<ModuleFault>,
    /// Raw rendering of the dispatch error.
    pub raw: String,
}

impl DispatchFailure {
    pub fn module(section: &str, name: &str, docs: Vec<String>) -> Self {
        Self {
            module: Some(ModuleFault {
                section: section.to_string(),
                name: name.to_string(),
                docs,
            }),
            raw: format!("{}.{}", section, name),
        }
    }

    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            module: None,
            raw: raw.into(),
        }
    }

    /// True when the error names the given pallet error, case-insensitively on the section.
    pub fn is(&self, section: &str, name: &str) -> bool {
        self.module
            .as_ref()
            .map(|m| m.section.eq_ignore_ascii_case(section) && m.name == name)
            .unwrap_or(false)
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(m) if m.docs.is_empty() => write!(f, "{}.{}", m.section, m.name),
            Some(m) => write!(f, "{}.{}: {}", m.section, m.name, m.docs.join(" ")),
            None => f.write_str(&self.raw),
        }
    }
}

/// Compute and proof-size allowance for a simulated or executed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Budget {
    pub ref_time: u64,
    pub proof_size: u64,
}

impl Budget {
    pub const fn new(ref_time: u64, proof_size: u64) -> Self {
        Self {
            ref_time,
            proof_size,
        }
    }

    /// True when `required` does not fit inside this budget on either axis.
    pub fn is_exceeded_by(&self, required: &Budget) -> bool {
        required.ref_time > self.ref_time || required.proof_size > self.proof_size
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(3_000_000_000, 1_000_000)
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref_time={} proof_size={}", self.ref_time, self.proof_size)
    }
}

/// Status notification for a submitted extrinsic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatusEvent {
    /// Accepted into the pool.
    Ready,
    /// Gossiped to peers.
    Broadcast,
    /// Included in a block, with the dispatch error if the call failed.
    InBlock {
        block_hash: String,
        dispatch_error: Option<DispatchFailure>,
    },
    /// Block containing the extrinsic left the best chain.
    Retracted,
    Dropped(String),
    Invalid(String),
}

/// Errors raised by the node transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Connection or request to the node failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connecting to the node timed out.
    #[error("connection timed out after {0} seconds")]
    Timeout(u64),

    /// No ready connection exists.
    #[error("chain connection not ready: {0}")]
    NotReady(String),

    /// Response could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    /// Signature bytes did not match any supported scheme.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
