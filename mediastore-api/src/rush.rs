use axum::{extract::State, routing::post, Json, Router};
use mediastore_catalog::{DeliveryInfo, RushDecision};
use serde::Deserialize;
use uuid::Uuid;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RushRequest {
    pub delivery: Option<DeliveryInfo>,
    pub product_ids: Vec<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/rush/evaluate", post(evaluate_rush))
}

/// POST /v1/rush/evaluate
async fn evaluate_rush(
    State(state): State<AppState>,
    Json(req): Json<RushRequest>,
) -> Result<Json<RushDecision>, AppError> {
    let mut products = Vec::with_capacity(req.product_ids.len());
    for id in req.product_ids {
        let product = state
            .catalog
            .get_product(id)
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Not found: product {}", id)))?;
        products.push(product);
    }

    Ok(Json(state.orchestrator.evaluate_rush(req.delivery.as_ref(), &products)))
}
