use async_trait::async_trait;
use crate::payment::PaymentTransaction;

/// Storage-layer failure. Callers may retry the whole operation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Persistence failure: {0}")]
pub struct PersistenceError(pub String);

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Append-only store of payment transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn save_transaction(&self, transaction: &PaymentTransaction) -> Result<(), PersistenceError>;

    /// All rows for an order in insertion order.
    async fn transactions_for_order(
        &self,
        order_id: &str,
    ) -> Result<Vec<PaymentTransaction>, PersistenceError>;
}
