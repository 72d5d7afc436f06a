//! Orchestrator tests for the paths that stay local: database serves under
//! full coverage, cache round-trips, count lookups, and input validation.
//! Explorer-backed paths decompose into pieces covered by the adapter,
//! coverage, and queue tests.

use std::sync::Arc;

use crate::config::Config;
use crate::db::{self, connection};
use crate::error::ServiceError;
use crate::models::{DataSource, SortOrder};
use crate::service::TransactionService;
use crate::state::AppState;
use crate::tests::db_tests::make_tx;

const ADDR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const ADDR_CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

async fn service_with_state() -> (TransactionService, Arc<AppState>) {
    let pool = connection::connect_in_memory().await;
    let state = Arc::new(
        AppState::new(Config::from_env(), pool).expect("failed to build app state"),
    );
    (TransactionService::new(state.clone()), state)
}

async fn seed_covered_range(state: &AppState, count: i64) {
    let txs: Vec<_> = (0..count).map(|i| make_tx(ADDR, 100 + i, i as usize)).collect();
    db::transaction::insert_transactions(&state.db_pool, &txs).await.unwrap();
    db::coverage::upsert(&state.db_pool, ADDR, 100, 200).await.unwrap();
}

#[tokio::test]
async fn full_coverage_serves_from_database() {
    let (service, state) = service_with_state().await;
    seed_covered_range(&state, 3).await;

    let response = service
        .get_transactions(ADDR, Some(100), Some(200), 1, 1000, SortOrder::Asc)
        .await
        .unwrap();

    assert_eq!(response.metadata.source, DataSource::Database);
    assert!(!response.from_cache);
    assert_eq!(response.transactions.len(), 3);
    assert!(!response.pagination.has_more);
    assert_eq!(response.metadata.background_processing, None);
    assert_eq!(response.metadata.address, ADDR_CHECKSUMMED);
    assert_eq!(response.metadata.from_block, 100);
    assert_eq!(response.metadata.to_block, 200);
}

#[tokio::test]
async fn identical_query_round_trips_through_cache() {
    let (service, state) = service_with_state().await;
    seed_covered_range(&state, 3).await;

    let first = service
        .get_transactions(ADDR, Some(100), Some(200), 1, 1000, SortOrder::Asc)
        .await
        .unwrap();
    assert!(!first.from_cache);

    let second = service
        .get_transactions(ADDR, Some(100), Some(200), 1, 1000, SortOrder::Asc)
        .await
        .unwrap();

    // Equal to the first response except the provenance stamps.
    assert!(second.from_cache);
    assert_eq!(second.metadata.source, DataSource::Cache);
    assert_eq!(second.transactions, first.transactions);
    assert_eq!(second.pagination, first.pagination);

    // The address is accepted in any case and hits the same cache entry.
    let mixed_case = service
        .get_transactions(
            ADDR_CHECKSUMMED,
            Some(100),
            Some(200),
            1,
            1000,
            SortOrder::Asc,
        )
        .await
        .unwrap();
    assert!(mixed_case.from_cache);
}

#[tokio::test]
async fn has_more_is_count_based() {
    let (service, state) = service_with_state().await;
    seed_covered_range(&state, 5).await;

    let full_page = service
        .get_transactions(ADDR, Some(100), Some(200), 1, 5, SortOrder::Asc)
        .await
        .unwrap();
    // A full page signals more, even when it is actually the last one.
    assert!(full_page.pagination.has_more);

    let short_page = service
        .get_transactions(ADDR, Some(100), Some(200), 2, 5, SortOrder::Asc)
        .await
        .unwrap();
    assert!(!short_page.pagination.has_more);
    assert!(short_page.transactions.is_empty());
}

#[tokio::test]
async fn descending_order_reads_newest_first() {
    let (service, state) = service_with_state().await;
    seed_covered_range(&state, 4).await;

    let response = service
        .get_transactions(ADDR, Some(100), Some(200), 1, 2, SortOrder::Desc)
        .await
        .unwrap();
    assert_eq!(
        response
            .transactions
            .iter()
            .map(|t| t.block_number)
            .collect::<Vec<_>>(),
        vec![103, 102]
    );
}

#[tokio::test]
async fn rejects_invalid_inputs() {
    let (service, _state) = service_with_state().await;

    let cases: Vec<ServiceError> = vec![
        service
            .get_transactions("nonsense", None, None, 1, 10, SortOrder::Asc)
            .await
            .unwrap_err(),
        service
            .get_transactions(ADDR, Some(10), Some(5), 1, 10, SortOrder::Asc)
            .await
            .unwrap_err(),
        service
            .get_transactions(ADDR, Some(0), Some(10), 0, 10, SortOrder::Asc)
            .await
            .unwrap_err(),
        service
            .get_transactions(ADDR, Some(0), Some(10), 1, 0, SortOrder::Asc)
            .await
            .unwrap_err(),
        service
            .get_transactions(ADDR, Some(0), Some(10), 1, 1001, SortOrder::Asc)
            .await
            .unwrap_err(),
        service.get_balance("0x123").await.unwrap_err(),
        service.get_stored_count("").await.unwrap_err(),
    ];

    for err in cases {
        assert!(matches!(err, ServiceError::InvalidInput(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn stored_count_caches_after_first_read() {
    let (service, state) = service_with_state().await;
    seed_covered_range(&state, 7).await;

    let first = service.get_stored_count(ADDR).await.unwrap();
    assert_eq!(first.count, 7);
    assert!(!first.from_cache);
    assert_eq!(first.source, DataSource::Database);
    assert_eq!(first.address, ADDR_CHECKSUMMED);

    let second = service.get_stored_count(ADDR).await.unwrap();
    assert_eq!(second.count, 7);
    assert!(second.from_cache);
    assert_eq!(second.source, DataSource::Cache);
}
