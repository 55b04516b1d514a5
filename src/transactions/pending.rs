//! Pending transaction handle and the task that drives it.
//!
//! # Responsibilities
//! - Run one call through prepare → sign → submit → inclusion
//! - Publish every stage on a watch channel
//! - Resolve exactly once to `Succeeded` or `Failed`
//!
//! # Design Decisions
//! - The first `InBlock` notification is decisive; later events are ignored
//! - A `Contracts.ContractReverted` inclusion is replayed as a dry run
//!   against the new state to recover the contract's own error
//! - No retries at any stage; the cause of a failure is preserved
//! - The inclusion wait is unbounded unless an inclusion timeout is configured

use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::timeout;
use uuid::Uuid;

use crate::chain::transport::{ContractRequest, DryRunOutcome, NodeApi, TxSubscription};
use crate::chain::types::{DispatchFailure, TxStatusEvent};
use crate::contract::codec;
use crate::contract::types::QueryError;
use crate::signer::types::TxSigner;
use crate::transactions::types::{TxFailure, TxKind, TxOutcome, TxPhase, TxReceipt};

/// Handle to a submitted state-changing call.
///
/// Cheap to clone; every clone observes the same transaction.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    id: Uuid,
    kind: TxKind,
    submitted_at: Arc<OnceLock<SystemTime>>,
    status: watch::Receiver<TxPhase>,
}

impl PendingTransaction {
    /// Start driving `request` on a background task.
    pub(crate) fn spawn(
        kind: TxKind,
        node: Arc<dyn NodeApi>,
        request: ContractRequest,
        signer: Arc<dyn TxSigner>,
        inclusion_timeout: Option<Duration>,
    ) -> Self {
        let id = Uuid::new_v4();
        let (status_tx, status) = watch::channel(TxPhase::Building);

        tracing::info!(
            tx_id = %id,
            kind = %kind,
            origin = %request.origin,
            "Building transaction"
        );

        let submitted_at = Arc::new(OnceLock::new());
        let task_kind = kind.clone();
        let task_submitted_at = Arc::clone(&submitted_at);
        tokio::spawn(async move {
            let outcome = drive(
                &*node,
                request,
                &task_kind,
                &*signer,
                &status_tx,
                &task_submitted_at,
                inclusion_timeout,
            )
            .await;
            let terminal = match outcome {
                Ok(block_hash) => {
                    tracing::info!(tx_id = %id, kind = %task_kind, block_hash = %block_hash, "Transaction succeeded");
                    TxPhase::Succeeded { block_hash }
                }
                Err(failure) => {
                    tracing::warn!(tx_id = %id, kind = %task_kind, error = %failure, "Transaction failed");
                    TxPhase::Failed { failure }
                }
            };
            status_tx.send_replace(terminal);
        });

        Self {
            id,
            kind,
            submitted_at,
            status,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &TxKind {
        &self.kind
    }

    /// When the signed call was handed to the node; `None` before that.
    pub fn submitted_at(&self) -> Option<SystemTime> {
        self.submitted_at.get().copied()
    }

    /// Current stage.
    pub fn phase(&self) -> TxPhase {
        self.status.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.status.borrow().is_terminal()
    }

    /// Observe stage transitions.
    pub fn subscribe(&self) -> watch::Receiver<TxPhase> {
        self.status.clone()
    }

    /// Wait for the terminal stage.
    pub async fn resolve(&self) -> TxOutcome {
        let mut status = self.status.clone();
        let phase = status
            .wait_for(TxPhase::is_terminal)
            .await
            .map(|phase| phase.clone());

        match phase {
            Ok(TxPhase::Succeeded { block_hash }) => Ok(TxReceipt {
                id: self.id,
                kind: self.kind.clone(),
                block_hash,
            }),
            Ok(TxPhase::Failed { failure }) => Err(failure),
            _ => Err(TxFailure::SubscriptionClosed),
        }
    }
}

async fn drive(
    node: &dyn NodeApi,
    request: ContractRequest,
    kind: &TxKind,
    signer: &dyn TxSigner,
    status: &watch::Sender<TxPhase>,
    submitted_at: &OnceLock<SystemTime>,
    inclusion_timeout: Option<Duration>,
) -> Result<String, TxFailure> {
    let replay = request.clone();
    let prepared = node.prepare_call(request).await.map_err(TxFailure::Transport)?;

    status.send_replace(TxPhase::Signing);
    let signature = signer
        .sign_payload(prepared.signer_payload())
        .await
        .map_err(TxFailure::Provider)?;

    let mut subscription = prepared
        .submit(signature)
        .await
        .map_err(|e| TxFailure::Rejected(e.to_string()))?;
    let _ = submitted_at.set(SystemTime::now());
    status.send_replace(TxPhase::Submitted);

    let included = match inclusion_timeout {
        Some(limit) => timeout(limit, await_inclusion(&mut subscription, status))
            .await
            .map_err(|_| TxFailure::InclusionTimeout(limit.as_secs()))?,
        None => await_inclusion(&mut subscription, status).await,
    };

    match included {
        Err(TxFailure::Dispatch(dispatch)) if dispatch.is("Contracts", "ContractReverted") => {
            Err(recover_fault(node, replay, kind, dispatch).await)
        }
        other => other,
    }
}

/// Re-run a reverted call as a dry run and decode the contract error it returns.
///
/// Falls back to the raw dispatch error when the replay no longer reverts
/// or its output does not decode.
async fn recover_fault(
    node: &dyn NodeApi,
    request: ContractRequest,
    kind: &TxKind,
    dispatch: DispatchFailure,
) -> TxFailure {
    let data = match node.dry_run(request).await {
        Ok(response) => match response.outcome {
            DryRunOutcome::Returned {
                reverted: true,
                data,
            } => data,
            _ => return TxFailure::Dispatch(dispatch),
        },
        Err(e) => {
            tracing::debug!(error = %e, "Could not replay reverted call");
            return TxFailure::Dispatch(dispatch);
        }
    };

    let decoded = match kind {
        TxKind::CreateEntry => codec::decode_fallible::<u32>(&data).map(|_| ()),
        TxKind::CastVote { .. } => codec::decode_fallible::<()>(&data),
    };
    match decoded {
        Err(QueryError::Contract(fault)) => TxFailure::Contract { fault, dispatch },
        _ => TxFailure::Dispatch(dispatch),
    }
}

/// Consume status notifications until the first block inclusion.
async fn await_inclusion(
    subscription: &mut TxSubscription,
    status: &watch::Sender<TxPhase>,
) -> Result<String, TxFailure> {
    while let Some(event) = subscription.next().await {
        match event.map_err(TxFailure::Transport)? {
            TxStatusEvent::Ready | TxStatusEvent::Broadcast => {
                tracing::trace!("Transaction pooled");
            }
            TxStatusEvent::Retracted => {
                tracing::debug!("Transaction block retracted, waiting for re-inclusion");
            }
            TxStatusEvent::InBlock {
                block_hash,
                dispatch_error,
            } => {
                status.send_replace(TxPhase::InBlock {
                    block_hash: block_hash.clone(),
                });
                return match dispatch_error {
                    None => Ok(block_hash),
                    Some(dispatch) => Err(TxFailure::from_dispatch(dispatch)),
                };
            }
            TxStatusEvent::Dropped(reason) | TxStatusEvent::Invalid(reason) => {
                return Err(TxFailure::Rejected(reason));
            }
        }
    }
    Err(TxFailure::SubscriptionClosed)
}
