use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use mediastore_core::PaymentTransaction;
use mediastore_order::{Order, OrderStatus, StatusUpdate};
use serde::{Deserialize, Serialize};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status name, e.g. `APPROVED`
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub transactions: Vec<PaymentTransaction>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/transitions", post(transition_order))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.orchestrator.get_order(&order_id).await?;
    let transactions = state.orchestrator.transactions(&order_id).await?;
    Ok(Json(OrderResponse { order, transactions }))
}

/// POST /v1/orders/{id}/transitions
/// Cancelling a paid order refunds it first.
async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<StatusUpdate>, AppError> {
    let target: OrderStatus = req.status.parse()?;
    let update = state.orchestrator.transition_order(&order_id, target).await?;
    Ok(Json(update))
}
