//! Top-level error surfaced to the presentation layer.

use thiserror::Error;

use crate::chain::types::{AccountAddress, ChainError};
use crate::contract::types::{ContractFault, QueryError};
use crate::signer::types::ProviderError;
use crate::transactions::types::TxFailure;
use crate::transactions::validation::ValidationError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transaction(#[from] TxFailure),

    /// The same action for the same target is still unresolved.
    #[error("an identical action is already in flight")]
    ActionInFlight,

    #[error("account {voter} already voted for entry {entry_id}")]
    AlreadyVoted { voter: AccountAddress, entry_id: u32 },

    /// Vote status could not be read; voting stays disabled.
    #[error("vote status unknown: {0}")]
    VoteStatusUnknown(String),

    #[error("chain connection not ready: {0}")]
    NotReady(String),
}

impl ClientError {
    /// Contract fault behind this error, wherever it surfaced.
    pub fn contract_fault(&self) -> Option<&ContractFault> {
        match self {
            ClientError::Query(QueryError::Contract(fault)) => Some(fault),
            ClientError::Transaction(failure) => failure.contract_fault(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
