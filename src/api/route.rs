use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::models::{BalanceResponse, CountResponse, SortOrder, TransactionsResponse};
use crate::service::TransactionService;
use crate::state::AppState;
use crate::validation::validate_order;

#[derive(Deserialize)]
pub struct TransactionsQuery {
    address: String,
    from_block: Option<u64>,
    to_block: Option<u64>,
    page: Option<u32>,
    limit: Option<u32>,
    order: Option<String>,
}

#[derive(Deserialize)]
pub struct AddressQuery {
    address: String,
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/transactions", get(get_transactions))
        .route("/transactions/count", get(get_stored_count))
        .route("/balance", get(get_balance))
        .with_state(app_state)
}

async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let order = match params.order.as_deref() {
        Some(raw) => validate_order(raw).map_err(crate::error::ServiceError::from)?,
        None => SortOrder::Asc,
    };

    let service = TransactionService::new(state);
    let response = service
        .get_transactions(
            &params.address,
            params.from_block,
            params.to_block,
            params.page.unwrap_or(1),
            params.limit.unwrap_or(1000),
            order,
        )
        .await?;

    Ok(Json(response))
}

async fn get_balance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AddressQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let service = TransactionService::new(state);
    Ok(Json(service.get_balance(&params.address).await?))
}

async fn get_stored_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AddressQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let service = TransactionService::new(state);
    Ok(Json(service.get_stored_count(&params.address).await?))
}
