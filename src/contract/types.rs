//! Contract-level types and error definitions.

use serde::Serialize;
use thiserror::Error;

use crate::chain::types::{AccountAddress, Budget, ChainError, DispatchFailure};
use crate::contract::schema::SchemaError;

/// A meme entry as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: u32,
    pub title: String,
    pub image_url: String,
    pub creator: AccountAddress,
    pub like_count: u32,
}

/// Typed failure returned by the contract itself.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
pub enum ContractFault {
    #[error("title is longer than 100 characters")]
    TitleTooLong,

    #[error("url cannot be empty")]
    EmptyUrl,

    #[error("meme does not exist")]
    MemeNotFound,

    #[error("account already voted for this meme")]
    AlreadyVoted,

    /// ink! could not decode the message input.
    #[error("contract could not read its input")]
    CouldNotReadInput,

    /// Reverted with data that matches no known error.
    #[error("contract reverted: {0}")]
    Unknown(String),
}

impl ContractFault {
    /// Match a pallet or contract error name against the known faults.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TitleTooLong" => Some(ContractFault::TitleTooLong),
            "EmptyUrl" => Some(ContractFault::EmptyUrl),
            "MemeNotFound" => Some(ContractFault::MemeNotFound),
            "AlreadyVoted" => Some(ContractFault::AlreadyVoted),
            _ => None,
        }
    }
}

/// Errors from contract queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] ChainError),

    #[error("contract error: {0}")]
    Contract(ContractFault),

    /// The simulated execution needs more than the supplied budget.
    #[error("budget exceeded: required {required}, limit {limit}")]
    BudgetExceeded { required: Budget, limit: Budget },

    #[error("dispatch error: {0}")]
    Dispatch(DispatchFailure),

    #[error("could not decode contract output: {0}")]
    Decode(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl QueryError {
    /// True for failures of the path to the node, not of the contract.
    pub fn is_transport(&self) -> bool {
        matches!(self, QueryError::Transport(_))
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            QueryError::Transport(_) => "transport",
            QueryError::Contract(_) => "contract_error",
            QueryError::BudgetExceeded { .. } => "budget_exceeded",
            QueryError::Dispatch(_) => "dispatch",
            QueryError::Decode(_) => "decode",
            QueryError::Schema(_) => "schema",
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
