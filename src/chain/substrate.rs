//! Substrate node transport (`pallet-contracts`) over subxt.
//!
//! # Responsibilities
//! - Connect to a node over WebSocket
//! - Dry-run contract calls through the `ContractsApi_call` runtime API
//! - Build `Contracts::call` extrinsics, attach external signatures, watch inclusion
//! - Decode module errors against the runtime metadata

use async_trait::async_trait;
use parity_scale_codec::{Decode, Encode};
use std::str::FromStr;
use std::sync::Arc;
use subxt::config::DefaultExtrinsicParamsBuilder;
use subxt::dynamic::Value;
use subxt::tx::{DynamicPayload, PartialExtrinsic, TxStatus};
use subxt::utils::{AccountId32, MultiAddress, MultiSignature};
use subxt::{OnlineClient, PolkadotConfig};
use tokio::sync::mpsc;

use crate::chain::transport::{
    ContractRequest, DryRunOutcome, DryRunResponse, NodeApi, NodeConnector, PreparedCall,
    TxSubscription,
};
use crate::chain::types::{
    AccountAddress, Budget, ChainError, ChainResult, DispatchFailure, SignatureBytes,
    TxStatusEvent,
};

type Client = OnlineClient<PolkadotConfig>;

/// REVERT bit of `ExecReturnValue::flags`.
const FLAG_REVERT: u32 = 1;

/// Opens subxt clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstrateConnector;

#[async_trait]
impl NodeConnector for SubstrateConnector {
    async fn connect(&self, endpoint: &str) -> ChainResult<Arc<dyn NodeApi>> {
        let client = if endpoint.starts_with("ws://") {
            Client::from_insecure_url(endpoint).await
        } else {
            Client::from_url(endpoint).await
        }
        .map_err(|e| ChainError::Transport(format!("{}: {}", endpoint, e)))?;

        Ok(Arc::new(SubstrateNode { client }))
    }
}

/// Connected node.
#[derive(Clone)]
pub struct SubstrateNode {
    client: Client,
}

impl SubstrateNode {
    fn account(address: &AccountAddress) -> ChainResult<AccountId32> {
        AccountId32::from_str(address.as_str())
            .map_err(|_| ChainError::InvalidAddress(address.to_string()))
    }

    fn decode_module_error(&self, index: u8, error: [u8; 4]) -> DispatchFailure {
        let metadata = self.client.metadata();
        let decoded = metadata.pallet_by_index(index).and_then(|pallet| {
            pallet
                .error_variant_by_index(error[0])
                .map(|variant| (pallet.name().to_string(), variant.name.clone(), variant.docs.clone()))
        });
        match decoded {
            Some((section, name, docs)) => DispatchFailure::module(&section, &name, docs),
            None => DispatchFailure::raw(format!("Module {{ index: {}, error: {:?} }}", index, error)),
        }
    }
}

#[async_trait]
impl NodeApi for SubstrateNode {
    async fn chain_id(&self) -> ChainResult<String> {
        Ok(format!("{:?}", self.client.genesis_hash()))
    }

    async fn dry_run(&self, request: ContractRequest) -> ChainResult<DryRunResponse> {
        let origin = Self::account(&request.origin)?;
        let dest = Self::account(&request.contract)?;

        let params = (
            origin.0,
            dest.0,
            0u128,
            Some(Weight::from(request.budget)),
            None::<u128>,
            request.input,
        )
            .encode();

        let runtime = self
            .client
            .runtime_api()
            .at_latest()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let result: ContractExecPrefix = runtime
            .call_raw("ContractsApi_call", Some(params.as_slice()))
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let outcome = match result.result {
            Ok(ret) => DryRunOutcome::Returned {
                reverted: ret.flags & FLAG_REVERT != 0,
                data: ret.data,
            },
            Err(RuntimeDispatchError::Module(m)) => {
                DryRunOutcome::Dispatch(self.decode_module_error(m.index, m.error))
            }
            Err(other) => DryRunOutcome::Dispatch(DispatchFailure::raw(format!("{:?}", other))),
        };

        Ok(DryRunResponse {
            required: result.gas_required.into(),
            outcome,
        })
    }

    async fn prepare_call(&self, request: ContractRequest) -> ChainResult<Box<dyn PreparedCall>> {
        let origin = Self::account(&request.origin)?;
        let dest = Self::account(&request.contract)?;

        let call = subxt::dynamic::tx(
            "Contracts",
            "call",
            vec![
                Value::unnamed_variant("Id", [Value::from_bytes(dest.0)]),
                Value::u128(0),
                Value::named_composite([
                    ("ref_time", Value::u128(request.budget.ref_time as u128)),
                    ("proof_size", Value::u128(request.budget.proof_size as u128)),
                ]),
                Value::unnamed_variant("None", Vec::<Value>::new()),
                Value::from_bytes(&request.input),
            ],
        );

        let nonce = self
            .client
            .tx()
            .account_nonce(&origin)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let payload = SubstratePreparedCall::partial(&self.client, &call, nonce)?.signer_payload();

        Ok(Box::new(SubstratePreparedCall {
            client: self.client.clone(),
            call,
            nonce,
            payload,
            origin,
        }))
    }

    fn encode_account(&self, raw: [u8; 32]) -> AccountAddress {
        AccountAddress::new(AccountId32(raw).to_string())
    }

    fn decode_account(&self, address: &AccountAddress) -> ChainResult<[u8; 32]> {
        Self::account(address).map(|id| id.0)
    }
}

impl std::fmt::Debug for SubstrateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstrateNode")
            .field("genesis_hash", &self.client.genesis_hash())
            .finish()
    }
}

/// Unsigned call pinned to a nonce.
///
/// The extrinsic is immortal, so rebuilding it offline at submit time yields
/// the same signer payload. `PartialExtrinsic` itself is not `Send`.
struct SubstratePreparedCall {
    client: Client,
    call: DynamicPayload,
    nonce: u64,
    payload: Vec<u8>,
    origin: AccountId32,
}

impl SubstratePreparedCall {
    fn partial(
        client: &Client,
        call: &DynamicPayload,
        nonce: u64,
    ) -> ChainResult<PartialExtrinsic<PolkadotConfig, Client>> {
        let params = DefaultExtrinsicParamsBuilder::<PolkadotConfig>::new()
            .nonce(nonce)
            .build();
        client
            .tx()
            .create_partial_signed_offline(call, params)
            .map_err(|e| ChainError::Transport(e.to_string()))
    }
}

#[async_trait]
impl PreparedCall for SubstratePreparedCall {
    fn signer_payload(&self) -> &[u8] {
        &self.payload
    }

    async fn submit(self: Box<Self>, signature: SignatureBytes) -> ChainResult<TxSubscription> {
        let signature = multi_signature(signature.as_bytes())?;
        let address = MultiAddress::Id(self.origin.clone());
        let extrinsic = Self::partial(&self.client, &self.call, self.nonce)?
            .sign_with_address_and_signature(&address, &signature);

        let mut progress = extrinsic
            .submit_and_watch()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            while let Some(status) = progress.next().await {
                let event = match status {
                    Ok(TxStatus::Validated) => Ok(TxStatusEvent::Ready),
                    Ok(TxStatus::Broadcasted { .. }) => Ok(TxStatusEvent::Broadcast),
                    Ok(TxStatus::NoLongerInBestBlock) => Ok(TxStatusEvent::Retracted),
                    // Instant-seal nodes may report finalization without a best-block event.
                    Ok(TxStatus::InBestBlock(in_block)) | Ok(TxStatus::InFinalizedBlock(in_block)) => {
                        let block_hash = format!("{:?}", in_block.block_hash());
                        match in_block.wait_for_success().await {
                            Ok(_) => Ok(TxStatusEvent::InBlock {
                                block_hash,
                                dispatch_error: None,
                            }),
                            Err(subxt::Error::Runtime(err)) => Ok(TxStatusEvent::InBlock {
                                block_hash,
                                dispatch_error: Some(dispatch_failure(&err)),
                            }),
                            Err(e) => Err(ChainError::Transport(e.to_string())),
                        }
                    }
                    Ok(TxStatus::Error { message }) => Err(ChainError::Transport(message)),
                    Ok(TxStatus::Invalid { message }) => Ok(TxStatusEvent::Invalid(message)),
                    Ok(TxStatus::Dropped { message }) => Ok(TxStatusEvent::Dropped(message)),
                    Err(e) => Err(ChainError::Transport(e.to_string())),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(TxSubscription::new(rx, task))
    }
}

fn dispatch_failure(err: &subxt::error::DispatchError) -> DispatchFailure {
    if let subxt::error::DispatchError::Module(module) = err {
        if let Ok(details) = module.details() {
            return DispatchFailure::module(
                details.pallet.name(),
                &details.variant.name,
                details.variant.docs.clone(),
            );
        }
    }
    DispatchFailure::raw(err.to_string())
}

/// Interpret type-prefixed signature bytes; a bare 64-byte signature is sr25519.
fn multi_signature(bytes: &[u8]) -> ChainResult<MultiSignature> {
    let invalid = || ChainError::InvalidSignature(format!("{} bytes", bytes.len()));
    match (bytes.len(), bytes.first()) {
        (64, _) => Ok(MultiSignature::Sr25519(bytes.try_into().map_err(|_| invalid())?)),
        (65, Some(0)) => Ok(MultiSignature::Ed25519(bytes[1..].try_into().map_err(|_| invalid())?)),
        (65, Some(1)) => Ok(MultiSignature::Sr25519(bytes[1..].try_into().map_err(|_| invalid())?)),
        (66, Some(2)) => Ok(MultiSignature::Ecdsa(bytes[1..].try_into().map_err(|_| invalid())?)),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Clone, Copy, Encode, Decode)]
struct Weight {
    #[codec(compact)]
    ref_time: u64,
    #[codec(compact)]
    proof_size: u64,
}

impl From<Budget> for Weight {
    fn from(budget: Budget) -> Self {
        Self {
            ref_time: budget.ref_time,
            proof_size: budget.proof_size,
        }
    }
}

impl From<Weight> for Budget {
    fn from(weight: Weight) -> Self {
        Budget::new(weight.ref_time, weight.proof_size)
    }
}

#[derive(Debug, Decode)]
enum StorageDeposit {
    #[allow(dead_code)]
    Refund(u128),
    #[allow(dead_code)]
    Charge(u128),
}

#[derive(Debug, Decode)]
struct ExecReturnValue {
    flags: u32,
    data: Vec<u8>,
}

#[derive(Debug, Decode)]
struct RuntimeModuleError {
    index: u8,
    error: [u8; 4],
}

#[derive(Debug, Decode)]
enum RuntimeDispatchError {
    Other,
    CannotLookup,
    BadOrigin,
    Module(RuntimeModuleError),
    ConsumerRemaining,
    NoProviders,
    TooManyConsumers,
    Token(u8),
    Arithmetic(u8),
    Transactional(u8),
    Exhausted,
    Corruption,
    Unavailable,
    RootNotAllowed,
}

/// Leading fields of `ContractResult`; trailing events are left undecoded.
#[derive(Debug, Decode)]
#[allow(dead_code)]
struct ContractExecPrefix {
    gas_consumed: Weight,
    gas_required: Weight,
    storage_deposit: StorageDeposit,
    debug_message: Vec<u8>,
    result: Result<ExecReturnValue, RuntimeDispatchError>,
}
