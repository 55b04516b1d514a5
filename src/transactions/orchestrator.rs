//! Create-entry and cast-vote orchestration.
//!
//! # Responsibilities
//! - Validate input and gate votes on a fresh vote-status query
//! - Reject a second identical action while the first is unresolved
//! - Pre-flight the call, obtain a signer, submit, and track the outcome
//! - After success, settle and then ask the feed to refresh
//!
//! # Flow
//! ```text
//! validate → reserve key → [vote gate] → [pre-flight dry run]
//!     → signer capability → submit (PendingTransaction)
//!     → finalizer: release key, invalidate vote status, metrics
//!     → on success: settle strategy → feed refresh
//! ```

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::chain::types::AccountAddress;
use crate::contract::binding::ContractBinding;
use crate::contract::types::{ContractFault, QueryError};
use crate::error::{ClientError, ClientResult};
use crate::feed::service::EntryFeedService;
use crate::observability::metrics;
use crate::signer::registry::SignerRegistry;
use crate::transactions::pending::PendingTransaction;
use crate::transactions::settle::{SettleOutcome, SettleStrategy};
use crate::transactions::types::{TxFailure, TxOutcome, TxReceipt};
use crate::transactions::validation::validate_entry;
use crate::votes::tracker::{VoteGate, VoteStateTracker};

/// Identity of a logical action; at most one per key is unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    CreateEntry {
        creator: AccountAddress,
        title: String,
        url: String,
    },
    CastVote {
        voter: AccountAddress,
        entry_id: u32,
    },
}

/// Whether the vote action can be offered for an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "availability", content = "reason", rename_all = "snake_case")]
pub enum VoteAvailability {
    Available,
    AlreadyVoted,
    /// A vote for this entry is still unresolved.
    Pending,
    /// Status could not be read.
    Unknown(String),
    NoAccount,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub settle: SettleStrategy,
    pub preflight: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            settle: SettleStrategy::default(),
            preflight: true,
        }
    }
}

/// Query that shows a successful transaction's state is visible.
#[derive(Debug, Clone)]
enum Visibility {
    Voted { voter: AccountAddress, entry_id: u32 },
    EntryCount { at_least: u32 },
}

impl Visibility {
    async fn holds(&self, binding: &ContractBinding) -> bool {
        match self {
            Visibility::Voted { voter, entry_id } => {
                matches!(binding.has_voted(voter, *entry_id).await, Ok(true))
            }
            Visibility::EntryCount { at_least } => {
                matches!(binding.total_memes(None).await, Ok(total) if total >= *at_least)
            }
        }
    }
}

type InFlight = Arc<DashMap<ActionKey, Option<PendingTransaction>>>;

/// Slot in the in-flight map, released on drop unless committed.
struct Reservation {
    in_flight: InFlight,
    key: ActionKey,
    committed: bool,
}

impl Reservation {
    fn acquire(in_flight: &InFlight, key: ActionKey) -> ClientResult<Self> {
        match in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ClientError::ActionInFlight),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(Self {
                    in_flight: Arc::clone(in_flight),
                    key,
                    committed: false,
                })
            }
        }
    }

    fn commit(mut self, pending: &PendingTransaction) -> ActionKey {
        self.in_flight.insert(self.key.clone(), Some(pending.clone()));
        self.committed = true;
        self.key.clone()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            self.in_flight.remove(&self.key);
        }
    }
}

pub struct TransactionOrchestrator {
    binding: Arc<ContractBinding>,
    signers: Arc<SignerRegistry>,
    votes: Arc<VoteStateTracker>,
    feed: Arc<EntryFeedService>,
    settings: OrchestratorSettings,
    in_flight: InFlight,
}

impl TransactionOrchestrator {
    pub fn new(
        binding: Arc<ContractBinding>,
        signers: Arc<SignerRegistry>,
        votes: Arc<VoteStateTracker>,
        feed: Arc<EntryFeedService>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            binding,
            signers,
            votes,
            feed,
            settings,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Submit a new entry from the selected account.
    pub async fn create_entry(&self, title: &str, url: &str) -> ClientResult<PendingTransaction> {
        self.start_create(title, url).await.map(|(pending, _)| pending)
    }

    /// Submit a new entry and wait for its terminal outcome.
    pub async fn create_entry_and_wait(&self, title: &str, url: &str) -> ClientResult<TxReceipt> {
        let (_, finalized) = self.start_create(title, url).await?;
        Ok(join_outcome(finalized).await?)
    }

    /// Vote for `entry_id` from the selected account.
    pub async fn cast_vote(&self, entry_id: u32) -> ClientResult<PendingTransaction> {
        self.start_vote(entry_id).await.map(|(pending, _)| pending)
    }

    pub async fn cast_vote_and_wait(&self, entry_id: u32) -> ClientResult<TxReceipt> {
        let (_, finalized) = self.start_vote(entry_id).await?;
        Ok(join_outcome(finalized).await?)
    }

    /// Fresh availability of the vote action for the selected account.
    pub async fn vote_availability(&self, entry_id: u32) -> VoteAvailability {
        let Some(account) = self.signers.selected() else {
            return VoteAvailability::NoAccount;
        };

        let key = ActionKey::CastVote {
            voter: account.address.clone(),
            entry_id,
        };
        if self.in_flight.contains_key(&key) {
            return VoteAvailability::Pending;
        }

        match self.votes.check_before_vote(&account.address, entry_id).await {
            VoteGate::Allowed => VoteAvailability::Available,
            VoteGate::AlreadyVoted => VoteAvailability::AlreadyVoted,
            VoteGate::Unknown(reason) => VoteAvailability::Unknown(reason),
        }
    }

    pub fn is_in_flight(&self, key: &ActionKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Handle of the unresolved transaction for `key`, once it is submitted.
    pub fn pending_for(&self, key: &ActionKey) -> Option<PendingTransaction> {
        self.in_flight.get(key).and_then(|slot| slot.value().clone())
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    async fn start_create(
        &self,
        title: &str,
        url: &str,
    ) -> ClientResult<(PendingTransaction, JoinHandle<TxOutcome>)> {
        validate_entry(title, url)?;
        self.ensure_ready()?;
        let account = self.signers.require_selected()?;
        let creator = account.address;

        let reservation = Reservation::acquire(
            &self.in_flight,
            ActionKey::CreateEntry {
                creator: creator.clone(),
                title: title.to_string(),
                url: url.to_string(),
            },
        )?;

        let predicted_id = if self.settings.preflight {
            Some(self.binding.preflight_add_meme(&creator, title, url).await?)
        } else {
            None
        };
        let visibility = match (predicted_id, &self.settings.settle) {
            (Some(id), _) => Visibility::EntryCount { at_least: id },
            (None, SettleStrategy::Confirm { .. }) => Visibility::EntryCount {
                at_least: self.binding.total_memes(Some(&creator)).await?.saturating_add(1),
            },
            (None, SettleStrategy::Fixed(_)) => Visibility::EntryCount { at_least: 0 },
        };

        let signer = self.signers.get_signer_for(&creator).await?;
        let pending = self.binding.submit_add_meme(signer, title, url)?;

        tracing::info!(tx_id = %pending.id(), creator = %creator, "Entry creation submitted");
        let finalized = self.track(reservation, pending.clone(), visibility);
        Ok((pending, finalized))
    }

    async fn start_vote(&self, entry_id: u32) -> ClientResult<(PendingTransaction, JoinHandle<TxOutcome>)> {
        self.ensure_ready()?;
        let account = self.signers.require_selected()?;
        let voter = account.address;

        let reservation = Reservation::acquire(
            &self.in_flight,
            ActionKey::CastVote {
                voter: voter.clone(),
                entry_id,
            },
        )?;

        match self.votes.check_before_vote(&voter, entry_id).await {
            VoteGate::Allowed => {}
            VoteGate::AlreadyVoted => return Err(ClientError::AlreadyVoted { voter, entry_id }),
            VoteGate::Unknown(reason) => return Err(ClientError::VoteStatusUnknown(reason)),
        }

        if self.settings.preflight {
            match self.binding.preflight_vote_up(&voter, entry_id).await {
                Ok(()) => {}
                Err(QueryError::Contract(ContractFault::AlreadyVoted)) => {
                    self.votes.invalidate(&voter, entry_id);
                    return Err(ClientError::AlreadyVoted { voter, entry_id });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let signer = self.signers.get_signer_for(&voter).await?;
        let pending = self.binding.submit_vote_up(signer, entry_id)?;

        tracing::info!(tx_id = %pending.id(), voter = %voter, entry_id = entry_id, "Vote submitted");
        let finalized = self.track(
            reservation,
            pending.clone(),
            Visibility::Voted { voter, entry_id },
        );
        Ok((pending, finalized))
    }

    fn ensure_ready(&self) -> ClientResult<()> {
        self.binding
            .connection()
            .node()
            .map(|_| ())
            .map_err(|e| ClientError::NotReady(e.to_string()))
    }

    /// Finalize on resolution: release the key, invalidate, record, settle.
    fn track(
        &self,
        reservation: Reservation,
        pending: PendingTransaction,
        visibility: Visibility,
    ) -> JoinHandle<TxOutcome> {
        let key = reservation.commit(&pending);
        let in_flight = Arc::clone(&self.in_flight);
        let votes = Arc::clone(&self.votes);
        let feed = Arc::clone(&self.feed);
        let binding = Arc::clone(&self.binding);
        let settle = self.settings.settle.clone();

        tokio::spawn(async move {
            let outcome = pending.resolve().await;
            in_flight.remove(&key);

            let label = match &outcome {
                Ok(_) => "succeeded",
                Err(failure) => failure.label(),
            };
            metrics::record_tx_outcome(pending.kind().label(), label);

            if let ActionKey::CastVote { voter, entry_id } = &key {
                votes.invalidate(voter, *entry_id);
            }

            if outcome.is_ok() {
                let tx_id = pending.id();
                tokio::spawn(async move {
                    let settled = settle
                        .settle(|| {
                            let binding = Arc::clone(&binding);
                            let visibility = visibility.clone();
                            async move { visibility.holds(&binding).await }
                        })
                        .await;
                    if let SettleOutcome::Unconfirmed { attempts } = settled {
                        tracing::warn!(tx_id = %tx_id, attempts = attempts, "New state not visible after settling");
                    }
                    feed.request_refresh();
                });
            }

            outcome
        })
    }
}

async fn join_outcome(finalized: JoinHandle<TxOutcome>) -> TxOutcome {
    match finalized.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Transaction finalizer task failed");
            Err(TxFailure::SubscriptionClosed)
        }
    }
}

impl std::fmt::Debug for TransactionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionOrchestrator")
            .field("settings", &self.settings)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
