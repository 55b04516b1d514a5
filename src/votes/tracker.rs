//! Per (account, entry) vote status backed by the contract.
//!
//! # Responsibilities
//! - Answer "has this account voted for this entry" with a fresh query
//! - Gate the vote action: a failed query means unknown, never "not voted"
//! - Keep the last answers for display until explicitly invalidated
//!
//! # Design Decisions
//! - The cache only stores query results; nothing is inferred locally
//! - Gating never consults the cache

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::chain::types::AccountAddress;
use crate::contract::binding::ContractBinding;
use crate::contract::types::QueryResult;

/// Whether a vote may be sent to the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", content = "reason", rename_all = "snake_case")]
pub enum VoteGate {
    Allowed,
    AlreadyVoted,
    /// Status could not be determined; the vote stays suppressed.
    Unknown(String),
}

pub struct VoteStateTracker {
    binding: Arc<ContractBinding>,
    cache: DashMap<(AccountAddress, u32), bool>,
}

impl VoteStateTracker {
    pub fn new(binding: Arc<ContractBinding>) -> Self {
        Self {
            binding,
            cache: DashMap::new(),
        }
    }

    /// Query the contract. A failed query clears the cached answer.
    pub async fn has_voted(&self, voter: &AccountAddress, entry_id: u32) -> QueryResult<bool> {
        let key = (voter.clone(), entry_id);
        match self.binding.has_voted(voter, entry_id).await {
            Ok(voted) => {
                self.cache.insert(key, voted);
                Ok(voted)
            }
            Err(e) => {
                self.cache.remove(&key);
                tracing::warn!(
                    voter = %voter,
                    entry_id = entry_id,
                    error = %e,
                    "Vote status query failed"
                );
                Err(e)
            }
        }
    }

    /// Re-check right before a vote is allowed to reach the signer.
    pub async fn check_before_vote(&self, voter: &AccountAddress, entry_id: u32) -> VoteGate {
        match self.has_voted(voter, entry_id).await {
            Ok(false) => VoteGate::Allowed,
            Ok(true) => VoteGate::AlreadyVoted,
            Err(e) => VoteGate::Unknown(e.to_string()),
        }
    }

    /// Last answer for display, if any. Not for gating.
    pub fn cached_status(&self, voter: &AccountAddress, entry_id: u32) -> Option<bool> {
        self.cache.get(&(voter.clone(), entry_id)).map(|v| *v)
    }

    pub fn invalidate(&self, voter: &AccountAddress, entry_id: u32) {
        self.cache.remove(&(voter.clone(), entry_id));
    }

    /// Drop everything, e.g. on feed mode or account change.
    pub fn invalidate_all(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        tracing::debug!(dropped = dropped, "Vote status cache cleared");
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for VoteStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteStateTracker")
            .field("cached", &self.cache.len())
            .finish()
    }
}
