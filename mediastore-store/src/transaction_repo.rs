use async_trait::async_trait;
use mediastore_core::{PaymentTransaction, PersistenceError, TransactionRepository};
use tokio::sync::RwLock;

/// Append-only transaction log kept in memory.
#[derive(Default)]
pub struct StoreTransactionRepository {
    rows: RwLock<Vec<PaymentTransaction>>,
}

impl StoreTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for StoreTransactionRepository {
    async fn save_transaction(&self, transaction: &PaymentTransaction) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().await;
        let duplicate = rows.iter().any(|row| {
            row.id == transaction.id && row.gateway == transaction.gateway && row.outcome == transaction.outcome
        });
        if duplicate {
            return Err(PersistenceError::new(format!(
                "transaction {} from {} already recorded",
                transaction.id, transaction.gateway
            )));
        }
        rows.push(transaction.clone());
        Ok(())
    }

    async fn transactions_for_order(&self, order_id: &str) -> Result<Vec<PaymentTransaction>, PersistenceError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.order_id == order_id)
            .cloned()
            .collect())
    }
}
