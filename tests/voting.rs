//! Vote gating, duplicate suppression and vote status.

mod common;

use std::time::Duration;

use common::{FakeChain, FakeProvider, ALICE, BOB};
use memevote_client::chain::AccountAddress;
use memevote_client::transactions::{ActionKey, TxFailure, TxPhase, VoteAvailability};
use memevote_client::ClientError;

#[tokio::test]
async fn test_vote_succeeds_and_is_recorded() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "votable", 0);
    let provider = FakeProvider::with_accounts(&[ALICE]);
    let ctx = common::start(&chain, Some(provider.clone())).await;

    assert!(!ctx.has_voted(id).await.unwrap());
    let receipt = ctx.cast_vote_and_wait(id).await.unwrap();
    assert!(receipt.block_hash.starts_with("0x"));

    assert_eq!(chain.likes(id), Some(1));
    assert!(ctx.has_voted(id).await.unwrap());
    assert_eq!(ctx.vote_availability(id).await, VoteAvailability::AlreadyVoted);
    assert_eq!(provider.sign_requests(), 1);
}

#[tokio::test]
async fn test_second_vote_never_reaches_signer() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "popular", 0);
    chain.vote_from(ALICE, id);
    let provider = FakeProvider::with_accounts(&[ALICE]);
    let ctx = common::start(&chain, Some(provider.clone())).await;

    let err = ctx.cast_vote(id).await.unwrap_err();
    assert!(matches!(err, ClientError::AlreadyVoted { entry_id, .. } if entry_id == id));
    assert_eq!(provider.sign_requests(), 0);
    assert_eq!(chain.submissions(), 0);
    assert_eq!(chain.likes(id), Some(1));
}

#[tokio::test]
async fn test_unknown_status_suppresses_vote() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "unreachable", 0);
    let provider = FakeProvider::with_accounts(&[ALICE]);
    let ctx = common::start(&chain, Some(provider.clone())).await;
    chain.fail_queries(true);

    assert!(matches!(
        ctx.vote_availability(id).await,
        VoteAvailability::Unknown(_)
    ));
    let err = ctx.cast_vote(id).await.unwrap_err();
    assert!(matches!(err, ClientError::VoteStatusUnknown(_)));
    assert_eq!(provider.sign_requests(), 0);
}

#[tokio::test]
async fn test_vote_for_missing_entry_fails_preflight() {
    let chain = FakeChain::new();
    let provider = FakeProvider::with_accounts(&[ALICE]);
    let ctx = common::start(&chain, Some(provider.clone())).await;

    let err = ctx.cast_vote(42).await.unwrap_err();
    assert_eq!(
        err.contract_fault(),
        Some(&memevote_client::contract::ContractFault::MemeNotFound)
    );
    assert_eq!(provider.sign_requests(), 0);
}

#[tokio::test]
async fn test_duplicate_vote_while_pending_is_rejected() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "contested", 0);
    let ctx = common::start(&chain, Some(FakeProvider::with_accounts(&[ALICE]))).await;
    chain.stall_inclusion(true);

    let pending = ctx.cast_vote(id).await.unwrap();
    let key = ActionKey::CastVote {
        voter: AccountAddress::from(ALICE),
        entry_id: id,
    };
    assert!(ctx.transactions().is_in_flight(&key));
    assert_eq!(ctx.transactions().pending_for(&key).unwrap().id(), pending.id());
    assert_eq!(ctx.vote_availability(id).await, VoteAvailability::Pending);
    assert!(matches!(
        ctx.cast_vote(id).await,
        Err(ClientError::ActionInFlight)
    ));

    chain.stall_inclusion(false);
    let outcome = tokio::time::timeout(Duration::from_secs(5), pending.resolve())
        .await
        .unwrap();
    assert!(outcome.is_ok());

    // The finalizer releases the key right after resolution.
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.transactions().is_in_flight(&key) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(chain.likes(id), Some(1));
    assert_eq!(chain.submissions(), 1);
}

#[tokio::test]
async fn test_vote_lost_to_concurrent_vote_fails_with_contract_fault() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "raced", 0);
    let ctx = common::start(&chain, Some(FakeProvider::with_accounts(&[ALICE]))).await;
    chain.stall_inclusion(true);

    let pending = ctx.cast_vote(id).await.unwrap();
    // Another client signed in as the same account lands first.
    chain.vote_from(ALICE, id);
    chain.stall_inclusion(false);

    let failure = tokio::time::timeout(Duration::from_secs(5), pending.resolve())
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(
        failure.contract_fault(),
        Some(&memevote_client::contract::ContractFault::AlreadyVoted)
    );
    assert!(matches!(
        failure,
        TxFailure::Contract { ref dispatch, .. } if dispatch.is("Contracts", "ContractReverted")
    ));
    assert!(matches!(pending.phase(), TxPhase::Failed { .. }));
    assert_eq!(chain.likes(id), Some(1));
}

#[tokio::test]
async fn test_vote_status_follows_selected_account() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "split", 0);
    chain.vote_from(ALICE, id);
    let ctx = common::start(&chain, Some(FakeProvider::with_accounts(&[ALICE, BOB]))).await;

    assert_eq!(ctx.selected_account().unwrap().address.as_str(), ALICE);
    assert!(ctx.has_voted(id).await.unwrap());
    assert_eq!(ctx.votes().cached_len(), 1);
    assert_eq!(
        ctx.votes().cached_status(&AccountAddress::from(ALICE), id),
        Some(true)
    );

    ctx.select_account(&AccountAddress::from(BOB)).await.unwrap();
    assert_eq!(ctx.votes().cached_len(), 0);
    assert!(!ctx.has_voted(id).await.unwrap());
    assert_eq!(ctx.vote_availability(id).await, VoteAvailability::Available);
}

#[tokio::test]
async fn test_no_account_means_no_vote() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "lonely", 0);
    let ctx = common::start(&chain, Some(FakeProvider::with_accounts(&[]))).await;

    assert_eq!(ctx.vote_availability(id).await, VoteAvailability::NoAccount);
    assert!(matches!(
        ctx.cast_vote(id).await,
        Err(ClientError::Provider(_))
    ));
}
