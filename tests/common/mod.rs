//! Shared fakes for integration tests: an in-memory node running the
//! meme-vote contract over real SCALE-encoded messages, and a scriptable
//! signer provider.

#![allow(dead_code)]

use async_trait::async_trait;
use parity_scale_codec::{Decode, Encode};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use memevote_client::chain::transport::{
    ContractRequest, DryRunOutcome, DryRunResponse, NodeApi, NodeConnector, PreparedCall,
    TxSubscription,
};
use memevote_client::chain::types::{
    AccountAddress, Budget, ChainError, ChainResult, DispatchFailure, SignatureBytes, TxStatusEvent,
};
use memevote_client::config::schema::ClientConfig;
use memevote_client::contract::codec::{ContractErrorCode, LangError, MemeRecord};
use memevote_client::contract::schema::{messages, ContractSchema};
use memevote_client::signer::types::{AccountIdentity, ProviderError, SignerProvider, TxSigner};
use memevote_client::AppContext;

pub const METADATA: &str = include_str!("../../contract/meme_vote.json");
pub const CONTRACT: &str = "meme-vote-contract";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const SETTLE_MS: u64 = 50;

pub fn schema() -> Arc<ContractSchema> {
    Arc::new(ContractSchema::from_json(METADATA).unwrap())
}

/// Test accounts encode as their name padded to 32 bytes.
pub fn raw_account(address: &str) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[..address.len()].copy_from_slice(address.as_bytes());
    raw
}

fn render_account(raw: [u8; 32]) -> AccountAddress {
    let end = raw.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    AccountAddress::new(String::from_utf8_lossy(&raw[..end]).into_owned())
}

#[derive(Debug, Clone)]
struct ContractState {
    memes: BTreeMap<u32, MemeRecord>,
    next_id: u32,
    voted: HashSet<([u8; 32], u32)>,
}

impl Default for ContractState {
    fn default() -> Self {
        Self {
            memes: BTreeMap::new(),
            next_id: 1,
            voted: HashSet::new(),
        }
    }
}

fn ok<T: Encode>(value: T) -> (bool, Vec<u8>) {
    (false, Ok::<T, LangError>(value).encode())
}

fn fallible<T: Encode>(result: Result<T, ContractErrorCode>) -> (bool, Vec<u8>) {
    (result.is_err(), Ok::<_, LangError>(result).encode())
}

fn lang_error() -> (bool, Vec<u8>) {
    (true, Err::<(), _>(LangError::CouldNotReadInput).encode())
}

impl ContractState {
    fn execute(&mut self, caller: [u8; 32], label: &str, mut args: &[u8]) -> (bool, Vec<u8>) {
        match label {
            "add_meme" => {
                let Ok((title, url)) = <(String, String)>::decode(&mut args) else {
                    return lang_error();
                };
                if title.len() > 100 {
                    return fallible::<u32>(Err(ContractErrorCode::TitleTooLong));
                }
                if url.is_empty() {
                    return fallible::<u32>(Err(ContractErrorCode::EmptyUrl));
                }
                let id = self.next_id;
                self.memes.insert(
                    id,
                    MemeRecord {
                        id,
                        creator: caller,
                        title,
                        url,
                        likes: 0,
                    },
                );
                self.next_id += 1;
                fallible(Ok(id))
            }
            "vote_up" => {
                let Ok(id) = u32::decode(&mut args) else {
                    return lang_error();
                };
                let Some(meme) = self.memes.get_mut(&id) else {
                    return fallible::<()>(Err(ContractErrorCode::MemeNotFound));
                };
                if !self.voted.insert((caller, id)) {
                    return fallible::<()>(Err(ContractErrorCode::AlreadyVoted));
                }
                meme.likes += 1;
                fallible(Ok(()))
            }
            "get_meme" => match u32::decode(&mut args) {
                Ok(id) => ok(self.memes.get(&id).cloned()),
                Err(_) => lang_error(),
            },
            "get_memes" => match <(u32, u32)>::decode(&mut args) {
                Ok((from, limit)) => ok(self
                    .memes
                    .range(from..)
                    .take(limit as usize)
                    .map(|(_, m)| m.clone())
                    .collect::<Vec<_>>()),
                Err(_) => lang_error(),
            },
            "get_top_memes" => match u32::decode(&mut args) {
                Ok(limit) => {
                    let mut memes: Vec<MemeRecord> = self.memes.values().cloned().collect();
                    memes.sort_by(|a, b| b.likes.cmp(&a.likes).then_with(|| a.id.cmp(&b.id)));
                    memes.truncate(limit as usize);
                    ok(memes)
                }
                Err(_) => lang_error(),
            },
            "has_voted" => match <([u8; 32], u32)>::decode(&mut args) {
                Ok((account, id)) => ok(self.voted.contains(&(account, id))),
                Err(_) => lang_error(),
            },
            "total_memes" => ok(self.next_id.wrapping_sub(1)),
            _ => lang_error(),
        }
    }
}

pub fn contract_reverted() -> DispatchFailure {
    DispatchFailure::module("Contracts", "ContractReverted", Vec::new())
}

#[derive(Default)]
struct Inner {
    state: Mutex<ContractState>,
    selectors: HashMap<[u8; 4], String>,
    fail_connect: AtomicBool,
    fail_queries: AtomicBool,
    stall_inclusion: AtomicBool,
    inject_dispatch: Mutex<Option<DispatchFailure>>,
    required: Mutex<Option<Budget>>,
    dry_runs: AtomicU32,
    submissions: AtomicU32,
    blocks: AtomicU32,
}

/// In-memory node with the meme-vote contract deployed at `CONTRACT`.
#[derive(Clone)]
pub struct FakeChain {
    inner: Arc<Inner>,
}

impl FakeChain {
    pub fn new() -> Self {
        let schema = schema();
        let selectors = messages::REQUIRED
            .iter()
            .map(|label| (schema.message(label).unwrap().selector, label.to_string()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                selectors,
                ..Default::default()
            }),
        }
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector(self.clone())
    }

    /// Insert an entry directly, as if created by `creator` in an earlier session.
    /// Make `total_memes` report `total` without storing that many entries.
    pub fn set_entry_counter(&self, total: u32) {
        self.inner.state.lock().unwrap().next_id = total.wrapping_add(1);
    }

    pub fn seed(&self, creator: &str, title: &str, likes: u32) -> u32 {
        let mut state = self.inner.state.lock().unwrap();
        let id = state.next_id;
        state.memes.insert(
            id,
            MemeRecord {
                id,
                creator: raw_account(creator),
                title: title.to_string(),
                url: format!("https://example.com/{}.png", id),
                likes,
            },
        );
        state.next_id += 1;
        id
    }

    /// Record a vote from another client.
    pub fn vote_from(&self, voter: &str, id: u32) {
        let mut state = self.inner.state.lock().unwrap();
        state.voted.insert((raw_account(voter), id));
        if let Some(meme) = state.memes.get_mut(&id) {
            meme.likes += 1;
        }
    }

    pub fn likes(&self, id: u32) -> Option<u32> {
        self.inner.state.lock().unwrap().memes.get(&id).map(|m| m.likes)
    }

    pub fn fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.inner.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn stall_inclusion(&self, stall: bool) {
        self.inner.stall_inclusion.store(stall, Ordering::SeqCst);
    }

    /// Attach `failure` to the next block inclusion instead of executing the call.
    pub fn inject_dispatch_error(&self, failure: DispatchFailure) {
        *self.inner.inject_dispatch.lock().unwrap() = Some(failure);
    }

    /// Budget every dry run reports as required.
    pub fn require_budget(&self, budget: Budget) {
        *self.inner.required.lock().unwrap() = Some(budget);
    }

    pub fn dry_runs(&self) -> u32 {
        self.inner.dry_runs.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> u32 {
        self.inner.submissions.load(Ordering::SeqCst)
    }

    fn split(&self, input: &[u8]) -> Option<(String, Vec<u8>)> {
        if input.len() < 4 {
            return None;
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&input[..4]);
        let label = self.inner.selectors.get(&selector)?;
        Some((label.clone(), input[4..].to_vec()))
    }

    fn include(&self, origin: [u8; 32], input: &[u8]) -> Option<DispatchFailure> {
        if let Some(failure) = self.inner.inject_dispatch.lock().unwrap().take() {
            return Some(failure);
        }
        // A reverted message surfaces only as the pallet's generic error; the
        // contract's return data is not part of the block.
        let reverted = match self.split(input) {
            Some((label, args)) => self.inner.state.lock().unwrap().execute(origin, &label, &args).0,
            None => true,
        };
        reverted.then(contract_reverted)
    }
}

pub struct FakeConnector(FakeChain);

#[async_trait]
impl NodeConnector for FakeConnector {
    async fn connect(&self, endpoint: &str) -> ChainResult<Arc<dyn NodeApi>> {
        if self.0.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(ChainError::Transport(format!("{}: connection refused", endpoint)));
        }
        Ok(Arc::new(self.0.clone()))
    }
}

#[async_trait]
impl NodeApi for FakeChain {
    async fn chain_id(&self) -> ChainResult<String> {
        Ok("0xfake".to_string())
    }

    async fn dry_run(&self, request: ContractRequest) -> ChainResult<DryRunResponse> {
        self.inner.dry_runs.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_queries.load(Ordering::SeqCst) {
            return Err(ChainError::Transport("node went away".to_string()));
        }

        let origin = self.decode_account(&request.origin)?;
        let (reverted, data) = match self.split(&request.input) {
            Some((label, args)) => {
                let mut scratch = self.inner.state.lock().unwrap().clone();
                scratch.execute(origin, &label, &args)
            }
            None => lang_error(),
        };

        let required = self
            .inner
            .required
            .lock()
            .unwrap()
            .unwrap_or(Budget::new(1_000_000_000, 50_000));
        Ok(DryRunResponse {
            required,
            outcome: DryRunOutcome::Returned { reverted, data },
        })
    }

    async fn prepare_call(&self, request: ContractRequest) -> ChainResult<Box<dyn PreparedCall>> {
        let origin = self.decode_account(&request.origin)?;
        let mut payload = origin.to_vec();
        payload.extend_from_slice(&request.input);
        Ok(Box::new(FakePreparedCall {
            chain: self.clone(),
            origin,
            input: request.input,
            payload,
        }))
    }

    fn encode_account(&self, raw: [u8; 32]) -> AccountAddress {
        render_account(raw)
    }

    fn decode_account(&self, address: &AccountAddress) -> ChainResult<[u8; 32]> {
        let bytes = address.as_str().as_bytes();
        if bytes.len() > 32 {
            return Err(ChainError::InvalidAddress(address.to_string()));
        }
        Ok(raw_account(address.as_str()))
    }
}

struct FakePreparedCall {
    chain: FakeChain,
    origin: [u8; 32],
    input: Vec<u8>,
    payload: Vec<u8>,
}

#[async_trait]
impl PreparedCall for FakePreparedCall {
    fn signer_payload(&self) -> &[u8] {
        &self.payload
    }

    async fn submit(self: Box<Self>, signature: SignatureBytes) -> ChainResult<TxSubscription> {
        if signature.as_bytes().is_empty() {
            return Err(ChainError::InvalidSignature("empty".to_string()));
        }
        self.chain.inner.submissions.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let _ = tx.send(Ok(TxStatusEvent::Ready)).await;
            let _ = tx.send(Ok(TxStatusEvent::Broadcast)).await;

            while self.chain.inner.stall_inclusion.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;

            let block = self.chain.inner.blocks.fetch_add(1, Ordering::SeqCst) + 1;
            let dispatch_error = self.chain.include(self.origin, &self.input);
            let _ = tx
                .send(Ok(TxStatusEvent::InBlock {
                    block_hash: format!("0x{:064x}", block),
                    dispatch_error,
                }))
                .await;
        });
        Ok(TxSubscription::new(rx, task))
    }
}

#[derive(Default)]
struct SignerStats {
    reject_signing: AtomicBool,
    sign_requests: AtomicU32,
}

/// Scriptable signer provider holding named test accounts.
pub struct FakeProvider {
    accounts: Mutex<Vec<AccountIdentity>>,
    stats: Arc<SignerStats>,
}

impl FakeProvider {
    pub fn with_accounts(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(
                names
                    .iter()
                    .map(|n| AccountIdentity::new(*n, Some(n.to_uppercase().as_str())))
                    .collect(),
            ),
            stats: Arc::new(SignerStats::default()),
        })
    }

    pub fn reject_signing(&self, reject: bool) {
        self.stats.reject_signing.store(reject, Ordering::SeqCst);
    }

    pub fn sign_requests(&self) -> u32 {
        self.stats.sign_requests.load(Ordering::SeqCst)
    }

    pub fn revoke(&self, name: &str) {
        self.accounts
            .lock()
            .unwrap()
            .retain(|a| a.address.as_str() != name);
    }
}

#[async_trait]
impl SignerProvider for FakeProvider {
    async fn enable(&self, _app_name: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<AccountIdentity>, ProviderError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn signer_for(&self, address: &AccountAddress) -> Result<Arc<dyn TxSigner>, ProviderError> {
        if !self.accounts.lock().unwrap().iter().any(|a| &a.address == address) {
            return Err(ProviderError::AccountNotAuthorized(address.clone()));
        }
        Ok(Arc::new(FakeSigner {
            address: address.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeSigner {
    address: AccountAddress,
    stats: Arc<SignerStats>,
}

#[async_trait]
impl TxSigner for FakeSigner {
    fn address(&self) -> &AccountAddress {
        &self.address
    }

    async fn sign_payload(&self, payload: &[u8]) -> Result<SignatureBytes, ProviderError> {
        self.stats.sign_requests.fetch_add(1, Ordering::SeqCst);
        if self.stats.reject_signing.load(Ordering::SeqCst) {
            return Err(ProviderError::SigningRejected("Cancelled".to_string()));
        }
        let mut signature = vec![1u8];
        signature.extend(payload.iter().take(64));
        Ok(SignatureBytes(signature))
    }
}

pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.chain.endpoint = "ws://fake-node:9944".to_string();
    config.chain.connect_timeout_secs = 1;
    config.contract.address = CONTRACT.to_string();
    config.transactions.settle_delay_ms = SETTLE_MS;
    config
}

pub async fn start(chain: &FakeChain, provider: Option<Arc<FakeProvider>>) -> AppContext {
    start_with(test_config(), chain, provider).await
}

pub async fn start_with(
    config: ClientConfig,
    chain: &FakeChain,
    provider: Option<Arc<FakeProvider>>,
) -> AppContext {
    let provider = provider.map(|p| p as Arc<dyn SignerProvider>);
    AppContext::start(config, schema(), &chain.connector(), provider).await
}
