use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediastore_core::PaymentError;
use mediastore_order::{CheckoutError, OrderError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_payment(err: &PaymentError, message: String) -> Self {
        match err {
            PaymentError::UnsupportedPaymentType { .. }
            | PaymentError::InvalidCallback(_)
            | PaymentError::InvalidOrderAmount(_) => AppError::Validation(message),
            PaymentError::CallbackVerificationFailed(_) => AppError::Unauthorized(message),
            PaymentError::OrderNotFound(_) => AppError::NotFound(message),
            PaymentError::RefundNotAllowed(_) => AppError::Unprocessable(message),
            PaymentError::GatewayUnavailable(_) => AppError::BadGateway(message),
            PaymentError::DuplicateGateway(_) | PaymentError::InvalidGatewayConfig(_) => {
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, message);
        }

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match &err {
            CheckoutError::Validation(_) => AppError::Validation(message),
            CheckoutError::NotFound(_) => AppError::NotFound(message),
            CheckoutError::InvalidTransition { .. } | CheckoutError::Reconciliation { .. } => {
                AppError::Conflict(message)
            }
            CheckoutError::Gateway(source) | CheckoutError::Payment { source, .. } => {
                AppError::from_payment(source, message)
            }
            CheckoutError::Persistence { .. } => AppError::Unavailable(message),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        AppError::Validation(err.to_string())
    }
}
