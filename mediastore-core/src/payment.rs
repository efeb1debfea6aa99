use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Result of a provider interaction as recorded on a transaction row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Success,
    Failure,
    Pending,
    /// Appended after a successful refund; the original SUCCESS row is kept.
    Refunded,
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentOutcome::Success => "SUCCESS",
            PaymentOutcome::Failure => "FAILURE",
            PaymentOutcome::Pending => "PENDING",
            PaymentOutcome::Refunded => "REFUNDED",
        };
        f.write_str(name)
    }
}

/// Canonical record of one provider notification.
///
/// Rows are append-only: a correction or a refund is a new row, never an
/// in-place edit of an existing one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentTransaction {
    pub id: String,
    pub order_id: String,
    /// Normalized key of the gateway that produced this row.
    pub gateway: String,
    pub amount: Decimal,
    pub outcome: PaymentOutcome,
    /// Parameters exactly as the provider sent them, kept for disputes.
    pub raw_payload: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn new(
        id: Option<String>,
        order_id: impl Into<String>,
        gateway: impl Into<String>,
        amount: Decimal,
        outcome: PaymentOutcome,
        raw_payload: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(generate_transaction_id),
            order_id: order_id.into(),
            gateway: gateway.into(),
            amount,
            outcome,
            raw_payload,
            created_at: Utc::now(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.outcome == PaymentOutcome::Success
    }

    /// Request reference sent with every refund of this payment. Stable across
    /// retries so the provider answers a repeated refund with the first result.
    pub fn refund_reference(&self) -> String {
        format!("rf-{}", self.id)
    }

    /// Builds the REFUNDED row that records `confirmation` against this payment.
    pub fn refund_record(&self, confirmation: &RefundConfirmation) -> PaymentTransaction {
        let mut raw_payload = BTreeMap::new();
        raw_payload.insert("refund_id".to_string(), confirmation.refund_id.clone());
        raw_payload.insert("original_transaction_id".to_string(), self.id.clone());

        PaymentTransaction {
            id: confirmation.refund_id.clone(),
            order_id: self.order_id.clone(),
            gateway: self.gateway.clone(),
            amount: confirmation.amount,
            outcome: PaymentOutcome::Refunded,
            raw_payload,
            created_at: confirmation.refunded_at,
        }
    }
}

/// Acknowledgement returned by a provider for an accepted refund.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundConfirmation {
    pub transaction_id: String,
    pub refund_id: String,
    pub amount: Decimal,
    pub refunded_at: DateTime<Utc>,
}

pub fn generate_transaction_id() -> String {
    format!("txn_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Callback verification failed: {0}")]
    CallbackVerificationFailed(String),

    #[error("Refund not allowed: {0}")]
    RefundNotAllowed(String),

    #[error("Invalid order amount: {0}")]
    InvalidOrderAmount(String),

    #[error("Invalid callback payload: {0}")]
    InvalidCallback(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Unsupported payment type '{key}'. Supported types: [{}]", .supported.join(", "))]
    UnsupportedPaymentType {
        key: String,
        supported: Vec<String>,
    },

    #[error("Payment gateway registered twice: {0}")]
    DuplicateGateway(String),

    #[error("Invalid payment gateway configuration: {0}")]
    InvalidGatewayConfig(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blank_provider_id_is_replaced() {
        let txn = PaymentTransaction::new(
            Some("  ".to_string()),
            "order-1",
            "vnpay",
            dec!(200),
            PaymentOutcome::Success,
            BTreeMap::new(),
        );
        assert!(txn.id.starts_with("txn_"));

        let txn = PaymentTransaction::new(
            Some("14000001".to_string()),
            "order-1",
            "vnpay",
            dec!(200),
            PaymentOutcome::Success,
            BTreeMap::new(),
        );
        assert_eq!(txn.id, "14000001");
    }

    #[test]
    fn test_refund_record_keeps_original() {
        let txn = PaymentTransaction::new(
            Some("14000001".to_string()),
            "order-1",
            "vnpay",
            dec!(200),
            PaymentOutcome::Success,
            BTreeMap::new(),
        );
        let confirmation = RefundConfirmation {
            transaction_id: txn.id.clone(),
            refund_id: "rf-1".to_string(),
            amount: dec!(200),
            refunded_at: Utc::now(),
        };

        let refund = txn.refund_record(&confirmation);

        assert_eq!(refund.outcome, PaymentOutcome::Refunded);
        assert_eq!(refund.order_id, "order-1");
        assert_eq!(refund.raw_payload["original_transaction_id"], "14000001");
        assert!(txn.is_successful());
    }

    #[test]
    fn test_refund_reference_is_stable() {
        let txn = PaymentTransaction::new(
            Some("14000001".to_string()),
            "order-1",
            "momo",
            dec!(200),
            PaymentOutcome::Success,
            BTreeMap::new(),
        );
        assert_eq!(txn.refund_reference(), "rf-14000001");
        assert_eq!(txn.clone().refund_reference(), txn.refund_reference());
    }

    #[test]
    fn test_unsupported_type_message_lists_keys() {
        let err = PaymentError::UnsupportedPaymentType {
            key: "paypal".to_string(),
            supported: vec!["momo".to_string(), "vnpay".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported payment type 'paypal'. Supported types: [momo, vnpay]"
        );
    }
}
