//! Node transport seam.
//!
//! # Responsibilities
//! - Abstract the node's wire protocol behind object-safe traits
//! - Simulate contract calls (dry run) with an explicit budget
//! - Prepare, sign-payload and submit contract calls
//! - Deliver status notifications for submitted calls as a cancellable subscription
//!
//! # Design Decisions
//! - The core never sees protocol types; the substrate implementation lives in `substrate.rs`
//! - Signing happens outside the transport: `prepare_call` hands out the payload,
//!   `PreparedCall::submit` takes the signature back

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chain::types::{
    AccountAddress, Budget, ChainResult, DispatchFailure, SignatureBytes, TxStatusEvent,
};

/// Opens connections to a node endpoint.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> ChainResult<Arc<dyn NodeApi>>;
}

/// Operations the client needs from a connected node.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Short identification of the connected chain (genesis hash for substrate).
    async fn chain_id(&self) -> ChainResult<String>;

    /// Simulate a contract call without side effects.
    async fn dry_run(&self, request: ContractRequest) -> ChainResult<DryRunResponse>;

    /// Build an unsigned contract call and return its signer payload.
    async fn prepare_call(&self, request: ContractRequest) -> ChainResult<Box<dyn PreparedCall>>;

    /// Render a raw 32-byte account id the way the node displays it.
    fn encode_account(&self, raw: [u8; 32]) -> AccountAddress;

    /// Parse a displayed account address back into its raw id.
    fn decode_account(&self, address: &AccountAddress) -> ChainResult<[u8; 32]>;
}

/// A call awaiting its signature.
#[async_trait]
pub trait PreparedCall: Send {
    /// Bytes the signer must sign.
    fn signer_payload(&self) -> &[u8];

    /// Attach the signature, broadcast, and subscribe to status notifications.
    async fn submit(self: Box<Self>, signature: SignatureBytes) -> ChainResult<TxSubscription>;
}

/// Contract invocation, shared by dry runs and real calls.
#[derive(Debug, Clone)]
pub struct ContractRequest {
    pub origin: AccountAddress,
    pub contract: AccountAddress,
    pub budget: Budget,
    /// Selector followed by SCALE-encoded arguments.
    pub input: Vec<u8>,
}

/// Result of a simulated call.
#[derive(Debug, Clone)]
pub struct DryRunResponse {
    /// Budget the call would actually need.
    pub required: Budget,
    pub outcome: DryRunOutcome,
}

#[derive(Debug, Clone)]
pub enum DryRunOutcome {
    /// The contract returned; `reverted` mirrors the REVERT flag.
    Returned { reverted: bool, data: Vec<u8> },
    /// The runtime refused the call before or during execution.
    Dispatch(DispatchFailure),
}

/// Stream of status notifications for one submitted call.
///
/// Dropping or cancelling the subscription stops the forwarding task; it
/// never withdraws the transaction itself.
pub struct TxSubscription {
    rx: mpsc::Receiver<ChainResult<TxStatusEvent>>,
    task: Option<JoinHandle<()>>,
}

impl TxSubscription {
    /// Wrap a channel fed by a background forwarding task.
    pub fn new(rx: mpsc::Receiver<ChainResult<TxStatusEvent>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Wrap a channel with no task to manage.
    pub fn from_channel(rx: mpsc::Receiver<ChainResult<TxStatusEvent>>) -> Self {
        Self { rx, task: None }
    }

    /// Next notification, or `None` once the node closed the subscription.
    pub async fn next(&mut self) -> Option<ChainResult<TxStatusEvent>> {
        self.rx.recv().await
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TxSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}
