use mediastore_core::{PaymentError, PersistenceError};
use crate::models::{OrderError, OrderStatus};

/// Errors surfaced by checkout, reconciliation and order transitions.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Order {order_id}: invalid state transition from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Gateway failure before any order is involved (unknown key, bad callback).
    #[error(transparent)]
    Gateway(PaymentError),

    #[error("Order {order_id}: {source}")]
    Payment {
        order_id: String,
        #[source]
        source: PaymentError,
    },

    #[error("Order {order_id}: reconciliation failed: {reason}")]
    Reconciliation {
        order_id: String,
        reason: String,
    },

    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: PersistenceError,
    },
}

impl CheckoutError {
    pub(crate) fn from_order(order_id: &str, err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => CheckoutError::InvalidTransition {
                order_id: order_id.to_string(),
                from,
                to,
            },
            other => CheckoutError::Validation(other.to_string()),
        }
    }

    pub(crate) fn persistence(context: impl Into<String>) -> impl FnOnce(PersistenceError) -> Self {
        let context = context.into();
        move |source| CheckoutError::Persistence { context, source }
    }

    pub(crate) fn payment(order_id: &str) -> impl FnOnce(PaymentError) -> Self {
        let order_id = order_id.to_string();
        move |source| CheckoutError::Payment { order_id, source }
    }

    /// The payment-boundary error underneath, if any.
    pub fn payment_error(&self) -> Option<&PaymentError> {
        match self {
            CheckoutError::Gateway(source) | CheckoutError::Payment { source, .. } => Some(source),
            _ => None,
        }
    }
}
