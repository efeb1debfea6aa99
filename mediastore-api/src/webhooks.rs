use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use mediastore_order::{CallbackParams, StatusUpdate};
use serde_json::Value;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/v1/payments/{gateway}/callback",
        get(handle_redirect_callback).post(handle_notification),
    )
}

/// GET /v1/payments/{gateway}/callback
/// Browser return from the provider; parameters arrive in the query string.
async fn handle_redirect_callback(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<StatusUpdate>, AppError> {
    tracing::info!("Received {} redirect callback", gateway);
    let update = state.orchestrator.handle_gateway_callback(&gateway, &params).await?;
    Ok(Json(update))
}

/// POST /v1/payments/{gateway}/callback
/// Server-to-server notification, either a form body or a flat JSON object.
async fn handle_notification(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusUpdate>, AppError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let params = if is_json {
        json_params(&body)?
    } else {
        url::form_urlencoded::parse(&body).into_owned().collect()
    };

    tracing::info!("Received {} notification with {} fields", gateway, params.len());
    let update = state.orchestrator.handle_gateway_callback(&gateway, &params).await?;
    Ok(Json(update))
}

/// Flattens a JSON object into string params; nested values keep their JSON text.
fn json_params(body: &[u8]) -> Result<CallbackParams, AppError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Malformed callback body: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(AppError::Validation("Callback body must be a JSON object".to_string()));
    };

    Ok(fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}
