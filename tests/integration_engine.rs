mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::FakeConnector;
use common::FakeLedger;
use common::TestFixtures;
use mustakshif::constants::NODE_BASE_WEIGHT;
use mustakshif::engine::ExplorerReport;
use mustakshif::engine::Mustakshif;
use mustakshif::model::Network;
use pretty_assertions::assert_eq;

fn engine_with(ledger: Arc<FakeLedger>) -> (Mustakshif, Arc<FakeConnector>) {
    let fixtures = TestFixtures::new();
    let connector = Arc::new(FakeConnector::new(ledger));
    let engine = Mustakshif::with_connector(fixtures.config(0), connector.clone()).unwrap();
    (engine, connector)
}

#[tokio::test]
async fn explore_builds_graph_from_history() {
    let fixtures = TestFixtures::new();
    let ledger = Arc::new(FakeLedger::default());
    let queried = fixtures.address(1);
    let alice = fixtures.address(2);
    let bob = fixtures.address(3);

    ledger.set_account(&queried, 5_000_000_000, None);
    ledger.rent_exempt_minimum.store(890_880, Ordering::SeqCst);
    ledger.add_signature(&queried, fixtures.signature(0, Some(30)), Some(fixtures.transfer_record(&queried, &alice, 1_000_000_000)));
    ledger.add_signature(&queried, fixtures.signature(1, Some(20)), Some(fixtures.transfer_record(&queried, &alice, 500_000_000)));
    ledger.add_signature(&queried, fixtures.signature(2, Some(10)), Some(fixtures.transfer_record(&bob, &queried, 250_000_000)));

    let (engine, _) = engine_with(ledger);
    let report = engine.explore(&queried.to_string(), 10).await.unwrap();

    assert_eq!(report.network, Network::Testnet);
    assert_eq!(report.overview.history.as_ref().map(Vec::len), Ok(3));
    assert!(report.overview.account.as_ref().unwrap().is_rent_exempt);
    assert_eq!(report.recent_network_activity, Some(vec![]));

    let weight_of = |address: &str| report.graph.nodes.iter().find(|n| n.id == address).map(|n| n.weight);
    assert_eq!(report.graph.nodes.len(), 3);
    assert_eq!(weight_of(&queried.to_string()), Some(NODE_BASE_WEIGHT + 2.0));
    assert_eq!(weight_of(&alice.to_string()), Some(NODE_BASE_WEIGHT + 1.0));
    assert_eq!(weight_of(&bob.to_string()), Some(NODE_BASE_WEIGHT));

    assert_eq!(report.graph.edges.len(), 2);
    let to_alice = report.graph.edges.iter().find(|e| e.target_id == alice.to_string()).unwrap();
    assert_eq!(to_alice.value, 1.5);
}

#[tokio::test]
async fn explore_rejects_invalid_address() {
    let (engine, connector) = engine_with(Arc::new(FakeLedger::default()));

    assert!(engine.explore("not-an-address", 10).await.is_err());
    assert!(connector.opened().is_empty());
}

#[tokio::test]
async fn report_serializes_outcomes() {
    let fixtures = TestFixtures::new();
    let (engine, _) = engine_with(Arc::new(FakeLedger::default()));

    let report = engine.explore(&fixtures.address(4).to_string(), 10).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["network"], "testnet");
    assert_eq!(json["history"]["ok"], serde_json::json!([]));
    assert_eq!(json["account"]["ok"]["balance_lamports"], 0);
    assert_eq!(json["graph"]["nodes"], serde_json::json!([]));
}

#[tokio::test]
async fn follow_refreshes_on_live_events_and_cleans_up() {
    let fixtures = TestFixtures::new();
    let ledger = Arc::new(FakeLedger::default());
    let queried = fixtures.address(1);
    let (engine, connector) = engine_with(ledger.clone());
    let reports: Arc<Mutex<Vec<ExplorerReport>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = reports.clone();
    let queried_address = queried.to_string();
    let follow = engine.follow(&queried_address, 10, move |report| {
        sink.lock().unwrap().push(report);
        Ok(())
    });

    let driver = async {
        while !engine.subscriptions.is_subscribed().await {
            tokio::task::yield_now().await;
        }

        ledger.add_signature(
            &queried,
            fixtures.signature(0, Some(1)),
            Some(fixtures.transfer_record(&queried, &fixtures.address(2), 1_000_000_000)),
        );
        connector.last_opened().emit(&queried, fixtures.log("sig-000", None));

        while reports.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        engine.shutdown.shutdown();
    };

    let (outcome, _) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(follow, driver) })
        .await
        .unwrap();
    outcome.unwrap();

    let first_edges = reports.lock().unwrap()[0].graph.edges.len();
    assert_eq!(first_edges, 1);
    assert!(!engine.subscriptions.is_subscribed().await);
    assert_eq!(connector.stats.active(), 0);
}

#[tokio::test]
async fn follow_resubscribes_after_the_stream_closes() {
    let fixtures = TestFixtures::new();
    let ledger = Arc::new(FakeLedger::default());
    let queried = fixtures.address(1);
    let (engine, connector) = engine_with(ledger.clone());
    let reports: Arc<Mutex<Vec<ExplorerReport>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = reports.clone();
    let queried_address = queried.to_string();
    let follow = engine.follow(&queried_address, 10, move |report| {
        sink.lock().unwrap().push(report);
        Ok(())
    });

    let subscribe_calls = || {
        connector.last_opened().call_names().iter().filter(|name| **name == "subscribe_address_logs").count()
    };

    let driver = async {
        while !engine.subscriptions.is_subscribed().await {
            tokio::task::yield_now().await;
        }
        connector.last_opened().close_streams(&queried);

        while subscribe_calls() < 2 || !engine.subscriptions.is_subscribed().await {
            tokio::task::yield_now().await;
        }
        connector.last_opened().emit(&queried, fixtures.log("sig-000", None));

        while reports.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        engine.shutdown.shutdown();
    };

    let (outcome, _) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(follow, driver) })
        .await
        .unwrap();
    outcome.unwrap();

    assert_eq!(reports.lock().unwrap().len(), 1);
    assert_eq!(connector.stats.active(), 0);
}
