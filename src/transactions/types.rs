//! Transaction types and failure definitions.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::chain::types::{ChainError, DispatchFailure};
use crate::contract::types::ContractFault;
use crate::signer::types::ProviderError;

/// The two state-changing operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxKind {
    CreateEntry,
    CastVote { entry_id: u32 },
}

impl TxKind {
    /// Label used in metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TxKind::CreateEntry => "create_entry",
            TxKind::CastVote { .. } => "cast_vote",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::CreateEntry => f.write_str("create_entry"),
            TxKind::CastVote { entry_id } => write!(f, "cast_vote({})", entry_id),
        }
    }
}

/// Stages of a submitted transaction.
///
/// `Building → Signing → Submitted → InBlock → Succeeded | Failed`, with
/// `Failed` reachable from every non-terminal stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TxPhase {
    Building,
    Signing,
    Submitted,
    InBlock { block_hash: String },
    Succeeded { block_hash: String },
    Failed { failure: TxFailure },
}

impl TxPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxPhase::Succeeded { .. } | TxPhase::Failed { .. })
    }
}

/// Terminal failure detail of a transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum TxFailure {
    /// The signer provider refused or failed to sign.
    #[error("signer: {0}")]
    Provider(#[serde(serialize_with = "as_display")] ProviderError),

    #[error("transport: {0}")]
    Transport(#[serde(serialize_with = "as_display")] ChainError),

    /// Included, but the dispatch error names a known contract fault.
    #[error("contract error: {fault} ({dispatch})")]
    Contract {
        fault: ContractFault,
        dispatch: DispatchFailure,
    },

    /// Included, but rejected by the runtime.
    #[error("dispatch error: {0}")]
    Dispatch(DispatchFailure),

    /// The node refused, dropped or invalidated the extrinsic.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("not included within {0} seconds")]
    InclusionTimeout(u64),

    #[error("status subscription closed before inclusion")]
    SubscriptionClosed,
}

impl TxFailure {
    /// Classify a dispatch error attached to a block inclusion.
    pub fn from_dispatch(dispatch: DispatchFailure) -> Self {
        match dispatch
            .module
            .as_ref()
            .and_then(|m| ContractFault::from_name(&m.name))
        {
            Some(fault) => TxFailure::Contract { fault, dispatch },
            None => TxFailure::Dispatch(dispatch),
        }
    }

    pub fn contract_fault(&self) -> Option<&ContractFault> {
        match self {
            TxFailure::Contract { fault, .. } => Some(fault),
            _ => None,
        }
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TxFailure::Provider(_) => "provider",
            TxFailure::Transport(_) => "transport",
            TxFailure::Contract { .. } => "contract",
            TxFailure::Dispatch(_) => "dispatch",
            TxFailure::Rejected(_) => "rejected",
            TxFailure::InclusionTimeout(_) => "timeout",
            TxFailure::SubscriptionClosed => "closed",
        }
    }
}

fn as_display<T: fmt::Display, S: serde::Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Successful terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub id: Uuid,
    pub kind: TxKind,
    pub block_hash: String,
}

pub type TxOutcome = Result<TxReceipt, TxFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_voted_dispatch_maps_to_contract_fault() {
        let dispatch = DispatchFailure::module(
            "memeVote",
            "AlreadyVoted",
            vec!["Account already voted".to_string()],
        );
        let failure = TxFailure::from_dispatch(dispatch);
        assert_eq!(failure.contract_fault(), Some(&ContractFault::AlreadyVoted));
        assert_eq!(failure.label(), "contract");
        assert!(failure.to_string().contains("memeVote.AlreadyVoted"));
    }

    #[test]
    fn test_unknown_dispatch_stays_raw() {
        let failure = TxFailure::from_dispatch(DispatchFailure::raw("BadOrigin"));
        assert_eq!(failure, TxFailure::Dispatch(DispatchFailure::raw("BadOrigin")));
        assert!(failure.contract_fault().is_none());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!TxPhase::Submitted.is_terminal());
        assert!(!TxPhase::InBlock { block_hash: "0x01".into() }.is_terminal());
        assert!(TxPhase::Failed { failure: TxFailure::SubscriptionClosed }.is_terminal());
    }

    #[test]
    fn test_failure_serializes_with_detail() {
        let json = serde_json::to_value(TxFailure::Provider(ProviderError::SigningRejected(
            "user cancelled".into(),
        )))
        .unwrap();
        assert_eq!(json["cause"], "provider");
        assert_eq!(json["detail"], "signing rejected: user cancelled");
    }
}
