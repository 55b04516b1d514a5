//! Startup orchestration and the process-scoped application context.
//!
//! # Responsibilities
//! - Build the chain connection and signer registry, then start both
//! - Bind the contract and construct the feed, vote and transaction services
//! - Hold the presentation-facing state: selected account, feed mode
//!
//! # Design Decisions
//! - A failed connection or missing signer provider leaves the context usable;
//!   operations that need them fail with a typed error instead
//! - Changing the feed mode or the selected account drops cached vote status

use arc_swap::ArcSwap;
use std::sync::Arc;
use thiserror::Error;

use crate::chain::connection::ChainConnection;
use crate::chain::transport::NodeConnector;
use crate::chain::types::{AccountAddress, ConnectionState};
use crate::config::schema::ClientConfig;
use crate::contract::binding::{CallBudgets, ContractBinding};
use crate::contract::schema::{ContractSchema, SchemaError};
use crate::contract::types::Entry;
use crate::error::{ClientError, ClientResult};
use crate::feed::service::{EntryFeedService, FeedMode};
use crate::lifecycle::shutdown::Shutdown;
use crate::signer::registry::SignerRegistry;
use crate::signer::remote::HttpSignerProvider;
use crate::signer::types::{AccountIdentity, ProviderError, SignerProvider};
use crate::transactions::orchestrator::{OrchestratorSettings, TransactionOrchestrator, VoteAvailability};
use crate::transactions::pending::PendingTransaction;
use crate::transactions::types::TxReceipt;
use crate::votes::tracker::VoteStateTracker;

/// Errors that prevent building a context at all.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct AppContext {
    config: ClientConfig,
    connection: Arc<ChainConnection>,
    signers: Arc<SignerRegistry>,
    binding: Arc<ContractBinding>,
    votes: Arc<VoteStateTracker>,
    feed: Arc<EntryFeedService>,
    transactions: TransactionOrchestrator,
    mode: ArcSwap<FeedMode>,
    discovery_error: Option<ProviderError>,
    shutdown: Shutdown,
}

impl AppContext {
    /// Load the contract schema and signer provider named by `config`, then start.
    pub async fn from_config(
        config: ClientConfig,
        connector: &dyn NodeConnector,
    ) -> Result<Self, StartupError> {
        let schema = ContractSchema::load(&config.contract.metadata_path)?;

        let provider: Option<Arc<dyn SignerProvider>> = match &config.signer.provider_url {
            Some(url) => Some(Arc::new(HttpSignerProvider::new(
                url,
                std::time::Duration::from_secs(config.signer.request_timeout_secs),
            )?)),
            None => None,
        };

        Ok(Self::start(config, Arc::new(schema), connector, provider).await)
    }

    /// Connect to the node and discover signing accounts concurrently.
    pub async fn start(
        config: ClientConfig,
        schema: Arc<ContractSchema>,
        connector: &dyn NodeConnector,
        provider: Option<Arc<dyn SignerProvider>>,
    ) -> Self {
        let connection = Arc::new(ChainConnection::new(
            config.chain.endpoint.clone(),
            config.chain.connect_timeout(),
        ));
        let signers = Arc::new(SignerRegistry::new(provider));

        let (state, discovery) = tokio::join!(
            connection.connect(connector),
            signers.discover(&config.signer.app_name)
        );

        let discovery_error = discovery.err();
        if let Some(e) = &discovery_error {
            tracing::warn!(error = %e, "Signer discovery failed; create and vote are disabled");
        }

        let binding = Arc::new(
            ContractBinding::new(
                Arc::clone(&connection),
                AccountAddress::new(config.contract.address.clone()),
                schema,
                CallBudgets {
                    query: config.contract.query_budget.into(),
                    call: config.contract.call_budget.into(),
                },
            )
            .with_inclusion_timeout(config.transactions.inclusion_timeout()),
        );
        let votes = Arc::new(VoteStateTracker::new(Arc::clone(&binding)));
        let feed = Arc::new(EntryFeedService::new(
            Arc::clone(&binding),
            config.feed.page_limit,
            config.feed.top_count,
        ));
        let transactions = TransactionOrchestrator::new(
            Arc::clone(&binding),
            Arc::clone(&signers),
            Arc::clone(&votes),
            Arc::clone(&feed),
            OrchestratorSettings {
                settle: config.transactions.settle(),
                preflight: config.transactions.preflight,
            },
        );

        tracing::info!(
            endpoint = %config.chain.endpoint,
            contract = %config.contract.address,
            connection = ?state,
            selected = ?signers.selected().map(|a| a.address),
            "Application context started"
        );

        Self {
            config,
            connection,
            signers,
            binding,
            votes,
            feed,
            transactions,
            mode: ArcSwap::from_pointee(FeedMode::default()),
            discovery_error,
            shutdown: Shutdown::new(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Why signer discovery failed at startup, if it did.
    pub fn discovery_error(&self) -> Option<&ProviderError> {
        self.discovery_error.as_ref()
    }

    /// Accounts currently authorized by the provider.
    pub async fn accounts(&self) -> ClientResult<Vec<AccountIdentity>> {
        let before = self.signers.selected().map(|a| a.address);
        let accounts = self.signers.list_accounts().await?;
        if self.signers.selected().map(|a| a.address) != before {
            self.votes.invalidate_all();
        }
        Ok(accounts)
    }

    pub fn selected_account(&self) -> Option<AccountIdentity> {
        self.signers.selected()
    }

    pub async fn select_account(&self, address: &AccountAddress) -> ClientResult<AccountIdentity> {
        let changed = self.signers.selected().map(|a| a.address).as_ref() != Some(address);
        let identity = self.signers.select(address).await?;
        if changed {
            self.votes.invalidate_all();
        }
        Ok(identity)
    }

    pub fn feed_mode(&self) -> FeedMode {
        **self.mode.load()
    }

    pub fn set_feed_mode(&self, mode: FeedMode) {
        let previous = self.mode.swap(Arc::new(mode));
        if *previous != mode {
            tracing::debug!(from = %previous, to = %mode, "Feed mode changed");
            self.votes.invalidate_all();
        }
    }

    /// Entries of the active feed mode.
    pub async fn load_feed(&self) -> ClientResult<Vec<Entry>> {
        self.ensure_ready()?;
        let caller = self.caller();
        Ok(self.feed.load(self.feed_mode(), caller.as_ref()).await?)
    }

    pub async fn list_all(&self, offset: u32, limit: u32) -> ClientResult<Vec<Entry>> {
        self.ensure_ready()?;
        let caller = self.caller();
        Ok(self.feed.list_all(caller.as_ref(), offset, limit).await?)
    }

    pub async fn list_top(&self, count: u32) -> ClientResult<Vec<Entry>> {
        self.ensure_ready()?;
        let caller = self.caller();
        Ok(self.feed.list_top(caller.as_ref(), count).await?)
    }

    pub async fn get_entry(&self, id: u32) -> ClientResult<Option<Entry>> {
        self.ensure_ready()?;
        let caller = self.caller();
        Ok(self.feed.get_entry(caller.as_ref(), id).await?)
    }

    pub async fn total_entries(&self) -> ClientResult<u32> {
        self.ensure_ready()?;
        let caller = self.caller();
        Ok(self.feed.total_entries(caller.as_ref()).await?)
    }

    /// Fresh vote status of the selected account.
    pub async fn has_voted(&self, entry_id: u32) -> ClientResult<bool> {
        self.ensure_ready()?;
        let account = self.signers.require_selected()?;
        Ok(self.votes.has_voted(&account.address, entry_id).await?)
    }

    pub async fn vote_availability(&self, entry_id: u32) -> VoteAvailability {
        self.transactions.vote_availability(entry_id).await
    }

    pub async fn create_entry(&self, title: &str, url: &str) -> ClientResult<PendingTransaction> {
        self.transactions.create_entry(title, url).await
    }

    pub async fn create_entry_and_wait(&self, title: &str, url: &str) -> ClientResult<TxReceipt> {
        self.transactions.create_entry_and_wait(title, url).await
    }

    pub async fn cast_vote(&self, entry_id: u32) -> ClientResult<PendingTransaction> {
        self.transactions.cast_vote(entry_id).await
    }

    pub async fn cast_vote_and_wait(&self, entry_id: u32) -> ClientResult<TxReceipt> {
        self.transactions.cast_vote_and_wait(entry_id).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<ChainConnection> {
        &self.connection
    }

    pub fn signers(&self) -> &Arc<SignerRegistry> {
        &self.signers
    }

    pub fn binding(&self) -> &Arc<ContractBinding> {
        &self.binding
    }

    pub fn votes(&self) -> &Arc<VoteStateTracker> {
        &self.votes
    }

    pub fn feed(&self) -> &Arc<EntryFeedService> {
        &self.feed
    }

    pub fn transactions(&self) -> &TransactionOrchestrator {
        &self.transactions
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn caller(&self) -> Option<AccountAddress> {
        self.signers.selected().map(|a| a.address)
    }

    fn ensure_ready(&self) -> ClientResult<()> {
        match self.connection.state() {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Failed(reason) => Err(ClientError::NotReady(reason)),
            ConnectionState::Connecting => Err(ClientError::NotReady("still connecting".to_string())),
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("connection", &self.connection)
            .field("signers", &self.signers)
            .field("mode", &self.feed_mode())
            .finish()
    }
}
