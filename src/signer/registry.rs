//! Signing identities exposed by the external signer provider.
//!
//! # Responsibilities
//! - Authorize the application with the provider (`discover`)
//! - List the currently authorized accounts, fresh on every call
//! - Track the selected identity and drop it when the provider revokes it
//! - Hand out per-account signing capabilities

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chain::types::AccountAddress;
use crate::observability::metrics;
use crate::signer::types::{AccountIdentity, ProviderError, SignerProvider, TxSigner};

pub struct SignerRegistry {
    provider: Option<Arc<dyn SignerProvider>>,
    enabled: AtomicBool,
    selected: ArcSwapOption<AccountIdentity>,
}

impl SignerRegistry {
    /// `provider` is `None` when no signer provider is installed.
    pub fn new(provider: Option<Arc<dyn SignerProvider>>) -> Self {
        Self {
            provider,
            enabled: AtomicBool::new(false),
            selected: ArcSwapOption::empty(),
        }
    }

    /// Authorize `app_name` with the provider and return the accounts it exposes.
    ///
    /// Zero accounts is a valid result. The first account becomes the
    /// selection when nothing is selected yet.
    pub async fn discover(&self, app_name: &str) -> Result<Vec<AccountIdentity>, ProviderError> {
        let provider = self.provider()?;

        if let Err(e) = provider.enable(app_name).await {
            tracing::warn!(app_name = %app_name, error = %e, "Signer provider authorization failed");
            return Err(e);
        }
        self.enabled.store(true, Ordering::SeqCst);

        let accounts = self.list_accounts().await?;
        if self.selected.load().is_none() {
            if let Some(first) = accounts.first() {
                self.selected.store(Some(Arc::new(first.clone())));
            }
        }

        tracing::info!(
            app_name = %app_name,
            accounts = accounts.len(),
            selected = ?self.selected().map(|a| a.address),
            "Signer provider enabled"
        );
        Ok(accounts)
    }

    /// Accounts currently authorized by the provider.
    pub async fn list_accounts(&self) -> Result<Vec<AccountIdentity>, ProviderError> {
        let provider = self.enabled_provider()?;
        let accounts = provider.accounts().await?;

        if let Some(selected) = self.selected.load_full() {
            if !accounts.iter().any(|a| a.address == selected.address) {
                tracing::info!(address = %selected.address, "Selected account revoked by provider");
                self.selected.store(None);
            }
        }

        Ok(accounts)
    }

    /// Select one of the currently authorized accounts.
    pub async fn select(&self, address: &AccountAddress) -> Result<AccountIdentity, ProviderError> {
        let accounts = self.list_accounts().await?;
        let identity = accounts
            .into_iter()
            .find(|a| &a.address == address)
            .ok_or_else(|| ProviderError::AccountNotAuthorized(address.clone()))?;

        self.selected.store(Some(Arc::new(identity.clone())));
        tracing::debug!(address = %identity.address, "Account selected");
        Ok(identity)
    }

    pub fn selected(&self) -> Option<AccountIdentity> {
        self.selected.load_full().map(|a| (*a).clone())
    }

    /// Selected account or `NoAccountSelected`.
    pub fn require_selected(&self) -> Result<AccountIdentity, ProviderError> {
        self.selected().ok_or(ProviderError::NoAccountSelected)
    }

    /// Signing capability for `address`.
    pub async fn get_signer_for(&self, address: &AccountAddress) -> Result<Arc<dyn TxSigner>, ProviderError> {
        let provider = self.enabled_provider()?;
        let result = provider.signer_for(address).await;
        metrics::record_signer_request(if result.is_ok() { "granted" } else { "denied" });
        result
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn SignerProvider>, ProviderError> {
        self.provider.as_ref().ok_or(ProviderError::NoProviderAvailable)
    }

    fn enabled_provider(&self) -> Result<&Arc<dyn SignerProvider>, ProviderError> {
        let provider = self.provider()?;
        if !self.is_enabled() {
            return Err(ProviderError::AuthorizationDeclined(
                "application not enabled".to_string(),
            ));
        }
        Ok(provider)
    }
}

impl std::fmt::Debug for SignerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerRegistry")
            .field("has_provider", &self.has_provider())
            .field("enabled", &self.is_enabled())
            .field("selected", &self.selected().map(|a| a.address))
            .finish()
    }
}
