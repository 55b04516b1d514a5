//! Startup with a missing node or signer provider.

mod common;

use common::{FakeChain, FakeProvider, ALICE, BOB};
use memevote_client::chain::{AccountAddress, ConnectionState};
use memevote_client::signer::ProviderError;
use memevote_client::ClientError;

#[tokio::test]
async fn test_unreachable_node_fails_without_queries() {
    let chain = FakeChain::new();
    chain.fail_connect(true);
    let provider = FakeProvider::with_accounts(&[ALICE]);
    let ctx = common::start(&chain, Some(provider.clone())).await;

    assert!(matches!(ctx.connection_state(), ConnectionState::Failed(_)));
    assert!(matches!(ctx.list_all(0, 10).await, Err(ClientError::NotReady(_))));
    assert!(matches!(ctx.list_top(10).await, Err(ClientError::NotReady(_))));
    assert!(matches!(
        ctx.create_entry("t", "https://example.com/t.png").await,
        Err(ClientError::NotReady(_))
    ));
    assert!(matches!(ctx.cast_vote(1).await, Err(ClientError::NotReady(_))));

    assert_eq!(chain.dry_runs(), 0);
    assert_eq!(provider.sign_requests(), 0);
    // Signer discovery is independent of the node.
    assert_eq!(ctx.selected_account().unwrap().address.as_str(), ALICE);
}

#[tokio::test]
async fn test_missing_provider_disables_signing_only() {
    let chain = FakeChain::new();
    let id = chain.seed(BOB, "readable", 0);
    let ctx = common::start(&chain, None).await;

    assert!(ctx.connection_state().is_ready());
    assert_eq!(ctx.discovery_error(), Some(&ProviderError::NoProviderAvailable));
    assert!(ctx.selected_account().is_none());
    assert_eq!(ctx.list_all(0, 10).await.unwrap().len(), 1);

    assert_eq!(
        ctx.accounts().await.unwrap_err(),
        ClientError::Provider(ProviderError::NoProviderAvailable)
    );
    assert_eq!(
        ctx.create_entry("t", "https://example.com/t.png").await.unwrap_err(),
        ClientError::Provider(ProviderError::NoAccountSelected)
    );
    assert_eq!(
        ctx.cast_vote(id).await.unwrap_err(),
        ClientError::Provider(ProviderError::NoAccountSelected)
    );
    assert_eq!(chain.submissions(), 0);
}

#[tokio::test]
async fn test_zero_accounts_is_not_an_error() {
    let chain = FakeChain::new();
    let ctx = common::start(&chain, Some(FakeProvider::with_accounts(&[]))).await;

    assert!(ctx.discovery_error().is_none());
    assert!(ctx.accounts().await.unwrap().is_empty());
    assert!(ctx.selected_account().is_none());
}

#[tokio::test]
async fn test_revoked_selection_is_dropped() {
    let chain = FakeChain::new();
    let provider = FakeProvider::with_accounts(&[ALICE, BOB]);
    let ctx = common::start(&chain, Some(provider.clone())).await;
    assert_eq!(ctx.selected_account().unwrap().address.as_str(), ALICE);

    provider.revoke(ALICE);
    let accounts = ctx.accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert!(ctx.selected_account().is_none());

    let selected = ctx.select_account(&AccountAddress::from(BOB)).await.unwrap();
    assert_eq!(selected.display_name.as_deref(), Some("BOB"));
    assert!(matches!(
        ctx.select_account(&AccountAddress::from(ALICE)).await,
        Err(ClientError::Provider(ProviderError::AccountNotAuthorized(_)))
    ));
}
