//! Remote signer provider over HTTP.
//!
//! The provider is a separate process (wallet daemon, browser bridge) that
//! owns the keys and asks its user for approval. Endpoints:
//! - `POST /enable`   `{ "origin": app_name }`
//! - `GET  /accounts` `[{ "address", "name" }]`
//! - `POST /sign`     `{ "address", "payload": "0x.." }` → `{ "signature": "0x.." }`
//!
//! # Security
//! - Only payloads and signatures cross the wire; keys never do
//! - Payloads are logged by length, never by content

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::types::{AccountAddress, SignatureBytes};
use crate::signer::types::{AccountIdentity, ProviderError, SignerProvider, TxSigner};

#[derive(Debug, Serialize)]
struct EnableRequest<'a> {
    origin: &'a str,
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    address: &'a str,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Debug, Clone)]
pub struct HttpSignerProvider {
    /// Client for enable/accounts; bounded by the request timeout.
    client: Client,
    /// Client for signing; unbounded because approval is user-paced.
    signing_client: Client,
    base_url: String,
}

impl HttpSignerProvider {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let signing_client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            signing_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// A provider that cannot be reached is treated as not installed.
fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_connect() {
        ProviderError::NoProviderAvailable
    } else {
        ProviderError::Transport(e.to_string())
    }
}

#[async_trait]
impl SignerProvider for HttpSignerProvider {
    async fn enable(&self, app_name: &str) -> Result<(), ProviderError> {
        let res = self
            .client
            .post(self.url("/enable"))
            .json(&EnableRequest { origin: app_name })
            .send()
            .await
            .map_err(request_error)?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ProviderError::NoProviderAvailable),
            s => {
                let body = res.text().await.unwrap_or_default();
                Err(ProviderError::AuthorizationDeclined(format!("{}: {}", s, body)))
            }
        }
    }

    async fn accounts(&self) -> Result<Vec<AccountIdentity>, ProviderError> {
        let res = self
            .client
            .get(self.url("/accounts"))
            .send()
            .await
            .map_err(request_error)?;

        if !res.status().is_success() {
            return Err(ProviderError::AuthorizationDeclined(res.status().to_string()));
        }
        res.json::<Vec<AccountIdentity>>()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn signer_for(&self, address: &AccountAddress) -> Result<Arc<dyn TxSigner>, ProviderError> {
        let accounts = self.accounts().await?;
        if !accounts.iter().any(|a| &a.address == address) {
            return Err(ProviderError::AccountNotAuthorized(address.clone()));
        }
        Ok(Arc::new(RemoteSigner {
            client: self.signing_client.clone(),
            url: self.url("/sign"),
            address: address.clone(),
        }))
    }
}

/// Signing capability bound to one account of a remote provider.
#[derive(Debug)]
pub struct RemoteSigner {
    client: Client,
    url: String,
    address: AccountAddress,
}

#[async_trait]
impl TxSigner for RemoteSigner {
    fn address(&self) -> &AccountAddress {
        &self.address
    }

    async fn sign_payload(&self, payload: &[u8]) -> Result<SignatureBytes, ProviderError> {
        tracing::debug!(
            address = %self.address,
            payload_len = payload.len(),
            "Requesting signature from provider"
        );

        let res = self
            .client
            .post(&self.url)
            .json(&SignRequest {
                address: self.address.as_str(),
                payload: format!("0x{}", hex::encode(payload)),
            })
            .send()
            .await
            .map_err(request_error)?;

        match res.status() {
            s if s.is_success() => {
                let body: SignResponse = res
                    .json()
                    .await
                    .map_err(|e| ProviderError::Transport(e.to_string()))?;
                SignatureBytes::from_hex(&body.signature)
                    .map_err(|e| ProviderError::Transport(format!("malformed signature: {}", e)))
            }
            StatusCode::FORBIDDEN => Err(ProviderError::AccountNotAuthorized(self.address.clone())),
            s => {
                let body = res.text().await.unwrap_or_default();
                Err(ProviderError::SigningRejected(format!("{}: {}", s, body)))
            }
        }
    }
}
