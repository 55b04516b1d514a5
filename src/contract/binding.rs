//! Typed access to the deployed meme-vote contract.
//!
//! # Responsibilities
//! - Bind (connection, contract address, schema) once at startup
//! - Run read-only messages as dry runs with an explicit budget
//! - Pre-flight and submit state-changing messages
//!
//! # Design Decisions
//! - A dry run that needs more than its budget fails with `BudgetExceeded`;
//!   results are never cut short to fit
//! - Reads without a selected account use the contract address as caller

use parity_scale_codec::{Decode, Encode};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::connection::ChainConnection;
use crate::chain::transport::{ContractRequest, DryRunOutcome, NodeApi};
use crate::chain::types::{AccountAddress, Budget};
use crate::contract::codec::{self, MemeRecord};
use crate::contract::schema::{messages, ContractSchema, SchemaError};
use crate::contract::types::{ContractFault, Entry, QueryError, QueryResult};
use crate::observability::metrics;
use crate::signer::types::TxSigner;
use crate::transactions::pending::PendingTransaction;
use crate::transactions::types::TxKind;

/// Budgets applied by the typed helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallBudgets {
    pub query: Budget,
    pub call: Budget,
}

pub struct ContractBinding {
    connection: Arc<ChainConnection>,
    address: AccountAddress,
    schema: Arc<ContractSchema>,
    budgets: CallBudgets,
    inclusion_timeout: Option<Duration>,
}

impl ContractBinding {
    pub fn new(
        connection: Arc<ChainConnection>,
        address: AccountAddress,
        schema: Arc<ContractSchema>,
        budgets: CallBudgets,
    ) -> Self {
        Self {
            connection,
            address,
            schema,
            budgets,
            inclusion_timeout: None,
        }
    }

    /// Fail transactions still waiting for inclusion after `limit`.
    pub fn with_inclusion_timeout(mut self, limit: Option<Duration>) -> Self {
        self.inclusion_timeout = limit;
        self
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn budgets(&self) -> CallBudgets {
        self.budgets
    }

    pub fn connection(&self) -> &Arc<ChainConnection> {
        &self.connection
    }

    /// Run a read-only message that returns `T`.
    pub async fn query<T: Decode, A: Encode>(
        &self,
        message: &str,
        caller: Option<&AccountAddress>,
        budget: Budget,
        args: &A,
    ) -> QueryResult<T> {
        let result = match self.simulate(message, caller, budget, args).await {
            Ok((reverted, data)) => decode_or_fault(reverted, &data, codec::decode_message::<T>),
            Err(e) => Err(e),
        };
        record(message, &result);
        result
    }

    /// Run a message that returns `Result<T, Error>`; `Err` surfaces as a contract fault.
    pub async fn query_fallible<T: Decode, A: Encode>(
        &self,
        message: &str,
        caller: Option<&AccountAddress>,
        budget: Budget,
        args: &A,
    ) -> QueryResult<T> {
        let result = match self.simulate(message, caller, budget, args).await {
            Ok((reverted, data)) => decode_or_fault(reverted, &data, codec::decode_fallible::<T>),
            Err(e) => Err(e),
        };
        record(message, &result);
        result
    }

    /// Sign and submit a state-changing message.
    ///
    /// Returns as soon as the driving task is started; the handle resolves later.
    pub fn call<A: Encode>(
        &self,
        message: &str,
        signer: Arc<dyn TxSigner>,
        budget: Budget,
        args: &A,
        kind: TxKind,
    ) -> QueryResult<PendingTransaction> {
        let spec = self.schema.message(message)?;
        if !spec.mutates {
            return Err(SchemaError::ReadOnlyMessage(message.to_string()).into());
        }
        let node = self.connection.node()?;

        let request = ContractRequest {
            origin: signer.address().clone(),
            contract: self.address.clone(),
            budget,
            input: codec::encode_call(spec.selector, args),
        };
        Ok(PendingTransaction::spawn(
            kind,
            node,
            request,
            signer,
            self.inclusion_timeout,
        ))
    }

    async fn simulate<A: Encode>(
        &self,
        message: &str,
        caller: Option<&AccountAddress>,
        budget: Budget,
        args: &A,
    ) -> QueryResult<(bool, Vec<u8>)> {
        let spec = self.schema.message(message)?;
        let node = self.connection.node()?;

        let request = ContractRequest {
            origin: caller.cloned().unwrap_or_else(|| self.address.clone()),
            contract: self.address.clone(),
            budget,
            input: codec::encode_call(spec.selector, args),
        };
        let response = node.dry_run(request).await?;

        if budget.is_exceeded_by(&response.required) {
            return Err(QueryError::BudgetExceeded {
                required: response.required,
                limit: budget,
            });
        }

        match response.outcome {
            DryRunOutcome::Returned { reverted, data } => Ok((reverted, data)),
            DryRunOutcome::Dispatch(failure) if failure.is("Contracts", "OutOfGas") => {
                Err(QueryError::BudgetExceeded {
                    required: response.required,
                    limit: budget,
                })
            }
            DryRunOutcome::Dispatch(failure) => Err(QueryError::Dispatch(failure)),
        }
    }

    fn node(&self) -> QueryResult<Arc<dyn NodeApi>> {
        Ok(self.connection.node()?)
    }

    fn entry(node: &dyn NodeApi, record: MemeRecord) -> Entry {
        let creator = node.encode_account(record.creator);
        record.into_entry(creator)
    }

    // Typed messages of the meme-vote contract.

    pub async fn get_meme(&self, caller: Option<&AccountAddress>, id: u32) -> QueryResult<Option<Entry>> {
        let record: Option<MemeRecord> = self
            .query(messages::GET_MEME, caller, self.budgets.query, &(id,))
            .await?;
        let node = self.node()?;
        Ok(record.map(|r| Self::entry(&*node, r)))
    }

    pub async fn get_memes(
        &self,
        caller: Option<&AccountAddress>,
        from: u32,
        limit: u32,
    ) -> QueryResult<Vec<Entry>> {
        let records: Vec<MemeRecord> = self
            .query(messages::GET_MEMES, caller, self.budgets.query, &(from, limit))
            .await?;
        let node = self.node()?;
        Ok(records.into_iter().map(|r| Self::entry(&*node, r)).collect())
    }

    pub async fn get_top_memes(&self, caller: Option<&AccountAddress>, limit: u32) -> QueryResult<Vec<Entry>> {
        let records: Vec<MemeRecord> = self
            .query(messages::GET_TOP_MEMES, caller, self.budgets.query, &(limit,))
            .await?;
        let node = self.node()?;
        Ok(records.into_iter().map(|r| Self::entry(&*node, r)).collect())
    }

    pub async fn has_voted(&self, voter: &AccountAddress, id: u32) -> QueryResult<bool> {
        let raw = self.node()?.decode_account(voter)?;
        self.query(messages::HAS_VOTED, Some(voter), self.budgets.query, &(raw, id))
            .await
    }

    pub async fn total_memes(&self, caller: Option<&AccountAddress>) -> QueryResult<u32> {
        self.query(messages::TOTAL_MEMES, caller, self.budgets.query, &())
            .await
    }

    /// Simulate `add_meme` from `origin`; returns the id it would get.
    pub async fn preflight_add_meme(&self, origin: &AccountAddress, title: &str, url: &str) -> QueryResult<u32> {
        self.query_fallible(messages::ADD_MEME, Some(origin), self.budgets.call, &(title, url))
            .await
    }

    pub async fn preflight_vote_up(&self, origin: &AccountAddress, id: u32) -> QueryResult<()> {
        self.query_fallible(messages::VOTE_UP, Some(origin), self.budgets.call, &(id,))
            .await
    }

    pub fn submit_add_meme(&self, signer: Arc<dyn TxSigner>, title: &str, url: &str) -> QueryResult<PendingTransaction> {
        self.call(
            messages::ADD_MEME,
            signer,
            self.budgets.call,
            &(title, url),
            TxKind::CreateEntry,
        )
    }

    pub fn submit_vote_up(&self, signer: Arc<dyn TxSigner>, id: u32) -> QueryResult<PendingTransaction> {
        self.call(
            messages::VOTE_UP,
            signer,
            self.budgets.call,
            &(id,),
            TxKind::CastVote { entry_id: id },
        )
    }
}

/// Reverted output that does not decode is still a contract failure.
fn decode_or_fault<T>(
    reverted: bool,
    data: &[u8],
    decode: impl FnOnce(&[u8]) -> QueryResult<T>,
) -> QueryResult<T> {
    match decode(data) {
        Err(QueryError::Decode(_)) if reverted => Err(QueryError::Contract(ContractFault::Unknown(
            format!("0x{}", hex::encode(data)),
        ))),
        other => other,
    }
}

fn record<T>(message: &str, result: &QueryResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.label(),
    };
    metrics::record_query(message, outcome);
    if let Err(e) = result {
        tracing::debug!(message = %message, error = %e, "Contract query failed");
    }
}

impl std::fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractBinding")
            .field("address", &self.address)
            .field("contract", &self.schema.name())
            .field("budgets", &self.budgets)
            .field("inclusion_timeout", &self.inclusion_timeout)
            .finish()
    }
}
