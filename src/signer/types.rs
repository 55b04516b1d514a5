//! Signer provider seam and error definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::chain::types::{AccountAddress, SignatureBytes};

/// An account exposed by the signer provider. Read-only and revocable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub address: AccountAddress,
    #[serde(default, rename = "name")]
    pub display_name: Option<String>,
}

impl AccountIdentity {
    pub fn new(address: impl Into<AccountAddress>, display_name: Option<&str>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.map(str::to_string),
        }
    }

    /// Display name, or a shortened address when the provider has none.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let address = self.address.as_str();
                let short: String = address.chars().take(8).collect();
                format!("{}...", short)
            }
        }
    }
}

/// Errors raised by the external signer provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// No provider is installed or reachable.
    #[error("no signer provider available")]
    NoProviderAvailable,

    /// The provider refused to authorize this application.
    #[error("signer provider declined authorization: {0}")]
    AuthorizationDeclined(String),

    #[error("account {0} is not authorized by the signer provider")]
    AccountNotAuthorized(AccountAddress),

    #[error("no account selected")]
    NoAccountSelected,

    /// The user declined to sign.
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    #[error("signer provider transport error: {0}")]
    Transport(String),
}

/// External authority holding key material.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    /// Ask the provider to authorize this application.
    async fn enable(&self, app_name: &str) -> Result<(), ProviderError>;

    /// Accounts currently authorized, in provider order.
    async fn accounts(&self) -> Result<Vec<AccountIdentity>, ProviderError>;

    /// A signing capability for one account.
    async fn signer_for(&self, address: &AccountAddress) -> Result<Arc<dyn TxSigner>, ProviderError>;
}

/// Capability to sign payloads for one account.
///
/// `sign_payload` may wait indefinitely on user approval.
#[async_trait]
pub trait TxSigner: Send + Sync {
    fn address(&self) -> &AccountAddress;

    async fn sign_payload(&self, payload: &[u8]) -> Result<SignatureBytes, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_short_address() {
        let named = AccountIdentity::new("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY", Some("Alice"));
        assert_eq!(named.label(), "Alice");

        let unnamed = AccountIdentity::new("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY", None);
        assert_eq!(unnamed.label(), "5GrwvaEF...");
    }

    #[test]
    fn test_identity_deserializes_provider_json() {
        let json = r#"{"address": "5Fabc", "name": "Bob"}"#;
        let identity: AccountIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.address.as_str(), "5Fabc");
        assert_eq!(identity.display_name.as_deref(), Some("Bob"));
    }
}
