use async_trait::async_trait;
use mediastore_core::PersistenceError;
use crate::models::Order;

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts or replaces the stored copy of `order`.
    async fn save_order(&self, order: &Order) -> Result<(), PersistenceError>;

    async fn load_order(&self, id: &str) -> Result<Option<Order>, PersistenceError>;
}
