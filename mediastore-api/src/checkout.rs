use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use mediastore_catalog::DeliveryInfo;
use mediastore_core::CustomerContext;
use mediastore_order::{Cart, CartLine, CheckoutReceipt};
use serde::{Deserialize, Serialize};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerContext,
    pub gateway: String,
    pub delivery: DeliveryInfo,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct RetryPaymentRequest {
    pub gateway: String,
}

#[derive(Debug, Serialize)]
pub struct RetryPaymentResponse {
    pub order_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Serialize)]
pub struct GatewayList {
    pub gateways: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout", post(create_checkout))
        .route("/v1/orders/{id}/payments", post(retry_payment))
        .route("/v1/payments/gateways", get(list_gateways))
}

/// POST /v1/checkout
async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), AppError> {
    let cart = Cart::new(req.items);
    let receipt = state
        .orchestrator
        .create_checkout(&req.customer, &cart, &req.delivery, &req.gateway)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /v1/orders/{id}/payments
/// New payment URL for an order whose previous attempt failed or expired
async fn retry_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<RetryPaymentRequest>,
) -> Result<Json<RetryPaymentResponse>, AppError> {
    let url = state.orchestrator.retry_payment(&order_id, &req.gateway).await?;
    Ok(Json(RetryPaymentResponse {
        order_id,
        redirect_url: url.to_string(),
    }))
}

async fn list_gateways(State(state): State<AppState>) -> Json<GatewayList> {
    Json(GatewayList {
        gateways: state.orchestrator.gateways().list_supported(),
    })
}
