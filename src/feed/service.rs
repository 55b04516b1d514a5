//! Read paths for the entry feed.
//!
//! # Responsibilities
//! - Unranked listing in contract insertion order, offset-paginated
//! - Ranked listing as sorted by the contract
//! - Single-entry and count lookups
//! - Refresh signal for observers after a successful transaction
//!
//! # Design Decisions
//! - Entry ids are dense and start at 1, so offset `n` maps to `from = n + 1`
//! - The ranking is never re-sorted here; an unsorted answer is logged, not fixed
//! - Reads never touch vote state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::chain::types::AccountAddress;
use crate::contract::binding::ContractBinding;
use crate::contract::types::{Entry, QueryResult};

/// Which listing the presentation layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    #[default]
    All,
    Top,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedMode::All => f.write_str("all"),
            FeedMode::Top => f.write_str("top"),
        }
    }
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FeedMode::All),
            "top" => Ok(FeedMode::Top),
            other => Err(format!("unknown feed mode: {}", other)),
        }
    }
}

pub struct EntryFeedService {
    binding: Arc<ContractBinding>,
    page_limit: u32,
    top_count: u32,
    refresh: watch::Sender<u64>,
}

impl EntryFeedService {
    pub fn new(binding: Arc<ContractBinding>, page_limit: u32, top_count: u32) -> Self {
        let (refresh, _) = watch::channel(0);
        Self {
            binding,
            page_limit,
            top_count,
            refresh,
        }
    }

    /// Entries in insertion order, skipping the first `offset`.
    pub async fn list_all(
        &self,
        caller: Option<&AccountAddress>,
        offset: u32,
        limit: u32,
    ) -> QueryResult<Vec<Entry>> {
        let from = offset.saturating_add(1);
        let entries = self.binding.get_memes(caller, from, limit).await?;
        tracing::debug!(from = from, limit = limit, returned = entries.len(), "Listed entries");
        Ok(entries)
    }

    /// The `count` entries with the most likes, in contract order.
    pub async fn list_top(&self, caller: Option<&AccountAddress>, count: u32) -> QueryResult<Vec<Entry>> {
        let mut entries = self.binding.get_top_memes(caller, count).await?;

        if !is_ranked(&entries) {
            tracing::warn!(count = count, "Contract returned an unsorted ranking");
        }
        if entries.len() > count as usize {
            tracing::warn!(
                count = count,
                returned = entries.len(),
                "Contract returned more entries than requested"
            );
            entries.truncate(count as usize);
        }
        Ok(entries)
    }

    pub async fn get_entry(&self, caller: Option<&AccountAddress>, id: u32) -> QueryResult<Option<Entry>> {
        self.binding.get_meme(caller, id).await
    }

    pub async fn total_entries(&self, caller: Option<&AccountAddress>) -> QueryResult<u32> {
        self.binding.total_memes(caller).await
    }

    /// The default view of `mode`.
    pub async fn load(&self, mode: FeedMode, caller: Option<&AccountAddress>) -> QueryResult<Vec<Entry>> {
        match mode {
            FeedMode::All => self.list_all(caller, 0, self.page_limit).await,
            FeedMode::Top => self.list_top(caller, self.top_count).await,
        }
    }

    /// Tell observers the feed is stale.
    pub fn request_refresh(&self) {
        self.refresh.send_modify(|generation| *generation += 1);
        tracing::debug!(generation = *self.refresh.borrow(), "Feed refresh requested");
    }

    /// Receiver that changes on every refresh request.
    pub fn subscribe_refresh(&self) -> watch::Receiver<u64> {
        self.refresh.subscribe()
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    pub fn top_count(&self) -> u32 {
        self.top_count
    }
}

/// Non-increasing like counts.
pub fn is_ranked(entries: &[Entry]) -> bool {
    entries.windows(2).all(|w| w[0].like_count >= w[1].like_count)
}

impl fmt::Debug for EntryFeedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFeedService")
            .field("page_limit", &self.page_limit)
            .field("top_count", &self.top_count)
            .finish()
    }
}
