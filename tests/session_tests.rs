use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{oneshot, Notify};

use fhe_gig_market::collaborators::{CollabResult, ContractReader};
use fhe_gig_market::contract::{Collaborators, GigMarket, LoadOutcome};
use fhe_gig_market::msg::CiphertextHandle;
use fhe_gig_market::state::OperationStatus;
use fhe_gig_market::testing::{
    business_data, mock_market_with, MockFhe, MockLedger, MockWallet, MOCK_ACCOUNT,
};
use fhe_gig_market::view::Screen;
use fhe_gig_market::{MarketConfig, MarketError};

/// Lets the first listing call stall after reading ids until released.
struct GatedReader {
    inner: Arc<MockLedger>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    reached: Arc<Notify>,
}

#[async_trait]
impl ContractReader for GatedReader {
    async fn get_all_business_ids(&self) -> CollabResult<Vec<String>> {
        let gate = self.gate.lock().take();
        let ids = self.inner.get_all_business_ids().await?;
        if let Some(release) = gate {
            self.reached.notify_one();
            let _ = release.await;
        }
        Ok(ids)
    }

    async fn get_business_data(&self, id: &str) -> CollabResult<Value> {
        self.inner.get_business_data(id).await
    }

    async fn get_encrypted_value(&self, id: &str) -> CollabResult<CiphertextHandle> {
        self.inner.get_encrypted_value(id).await
    }

    async fn is_available(&self) -> CollabResult<bool> {
        self.inner.is_available().await
    }
}

#[tokio::test]
async fn latest_load_wins_over_a_slower_earlier_one() -> anyhow::Result<()> {
    let ledger = Arc::new(MockLedger::default());
    ledger.seed("gig-1", business_data("Early", 0, None))?;

    let (release, gate) = oneshot::channel();
    let reached = Arc::new(Notify::new());
    let market = GigMarket::new(
        MarketConfig::default(),
        Collaborators {
            wallet: Arc::new(MockWallet::connected(MOCK_ACCOUNT)),
            reader: Arc::new(GatedReader {
                inner: ledger.clone(),
                gate: Mutex::new(Some(gate)),
                reached: reached.clone(),
            }),
            writer: ledger.clone(),
            fhe: Arc::new(MockFhe::default()),
        },
    );

    let slow = market.load();
    let fast = async {
        reached.notified().await;
        assert_eq!(market.load_status(), OperationStatus::Loading);
        assert!(matches!(market.render(Utc::now()), Screen::Loading { .. }));

        ledger.seed("gig-2", business_data("Late", 1, None))?;
        let outcome = market.load().await;
        // the slow load is still outstanding
        assert_eq!(market.load_status(), OperationStatus::Loading);
        let _ = release.send(());
        outcome
    };

    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(fast?, LoadOutcome::Applied { gigs: 2 });
    assert_eq!(slow?, LoadOutcome::Discarded);

    let snapshot = market.snapshot();
    assert_eq!(snapshot.gigs.len(), 2);
    assert_eq!(snapshot.stats.total_gigs, 2);
    assert_eq!(market.load_status(), OperationStatus::Idle);
    Ok(())
}

#[tokio::test]
async fn disconnect_during_load_keeps_the_view_empty() -> anyhow::Result<()> {
    let ledger = Arc::new(MockLedger::default());
    ledger.seed("gig-1", business_data("Early", 0, None))?;
    let wallet = Arc::new(MockWallet::default());

    let (release, gate) = oneshot::channel();
    let reached = Arc::new(Notify::new());
    let market = GigMarket::new(
        MarketConfig::default(),
        Collaborators {
            wallet: wallet.clone(),
            reader: Arc::new(GatedReader {
                inner: ledger.clone(),
                gate: Mutex::new(Some(gate)),
                reached: reached.clone(),
            }),
            writer: ledger.clone(),
            fhe: Arc::new(MockFhe::default()),
        },
    );

    wallet.connect(MOCK_ACCOUNT);
    let connect = market.sync_wallet();
    let disconnect = async {
        reached.notified().await;
        wallet.disconnect();
        market.sync_wallet().await?;
        let _ = release.send(());
        Ok::<_, MarketError>(())
    };

    let (connect, disconnect) = tokio::join!(connect, disconnect);
    connect?;
    disconnect?;
    assert!(market.snapshot().gigs.is_empty());
    assert_eq!(market.load_status(), OperationStatus::Idle);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_disconnects_never_leave_gigs_behind() -> anyhow::Result<()> {
    for _ in 0..50 {
        let mock = Arc::new(mock_market_with(
            MarketConfig::default(),
            MockWallet::connected(MOCK_ACCOUNT),
        ));
        mock.ledger.seed("gig-1", business_data("API", 0, Some(10)))?;
        mock.market.sync_wallet().await?;

        let loader = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.market.load().await })
        };
        let disconnector = {
            let mock = mock.clone();
            tokio::spawn(async move {
                mock.wallet.disconnect();
                mock.market.sync_wallet().await
            })
        };

        // the load may fail on a missing wallet; only the final view matters
        let _ = loader.await?;
        disconnector.await??;
        assert!(mock.market.snapshot().gigs.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn wallet_transitions_drive_loading_and_reset() -> anyhow::Result<()> {
    let mock = mock_market_with(MarketConfig::default(), MockWallet::default());
    mock.ledger.seed("gig-1", business_data("Design system", 1, Some(700)))?;

    mock.market.sync_wallet().await?;
    assert!(matches!(
        mock.market.render(Utc::now()),
        Screen::ConnectPrompt(_)
    ));
    assert!(mock.market.snapshot().gigs.is_empty());

    mock.wallet.connect(MOCK_ACCOUNT);
    mock.market.sync_wallet().await?;
    assert_eq!(mock.market.snapshot().gigs.len(), 1);

    mock.market.set_search("design");
    mock.market.open_faq();
    match mock.market.render(Utc::now()) {
        Screen::Market(screen) => {
            assert_eq!(screen.cards.len(), 1);
            assert_eq!(screen.cards[0].budget, "$700");
            assert!(screen.faq_modal.is_some());
            assert_eq!(screen.stats[0].value, "1");
        }
        other => panic!("expected market screen, got {:?}", other),
    }

    // no transition, no reload
    mock.ledger.seed("gig-2", business_data("Blog", 2, None))?;
    mock.market.sync_wallet().await?;
    assert_eq!(mock.market.snapshot().gigs.len(), 1);

    mock.wallet.disconnect();
    mock.market.sync_wallet().await?;
    assert!(mock.market.snapshot().gigs.is_empty());
    let ui = mock.market.ui_state();
    assert_eq!(ui.search_query, "");
    assert!(!ui.show_faq);
    assert!(matches!(
        mock.market.render(Utc::now()),
        Screen::ConnectPrompt(_)
    ));
    Ok(())
}

#[tokio::test]
async fn detail_modal_tracks_the_selected_gig() -> anyhow::Result<()> {
    let mock = mock_market_with(
        MarketConfig::default(),
        MockWallet::connected(MOCK_ACCOUNT),
    );
    mock.seed_gig("gig-9", business_data("Motion graphics", 3, None), 2_500)?;
    mock.market.load().await?;

    mock.market.select_gig("gig-9");
    let detail = match mock.market.render(Utc::now()) {
        Screen::Market(screen) => screen.detail_modal.expect("detail modal"),
        other => panic!("expected market screen, got {:?}", other),
    };
    assert_eq!(detail.budget_status, "FHE encrypted");
    assert_eq!(detail.reveal_button.map(|b| b.label), Some("Reveal Budget".to_string()));

    mock.market.decrypt_budget("gig-9").await;
    let gig = mock.market.selected_gig().expect("still selected");
    assert!(gig.is_verified);

    let detail = match mock.market.render(Utc::now()) {
        Screen::Market(screen) => screen.detail_modal.expect("detail modal"),
        other => panic!("expected market screen, got {:?}", other),
    };
    assert_eq!(detail.budget, "$2500");
    assert_eq!(detail.budget_status, "On-chain verified");
    assert!(detail.reveal_button.is_none());

    mock.market.close_detail();
    assert!(mock.market.selected_gig().is_none());
    Ok(())
}
