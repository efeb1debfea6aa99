use async_trait::async_trait;
use mediastore_core::PersistenceError;
use mediastore_order::{Order, OrderRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local order storage; contents are lost on restart.
#[derive(Default)]
pub struct StoreOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl StoreOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn save_order(&self, order: &Order) -> Result<(), PersistenceError> {
        self.orders.write().await.insert(order.id.clone(), order.clone());
        tracing::debug!("Stored order {} as {}", order.id, order.status());
        Ok(())
    }

    async fn load_order(&self, id: &str) -> Result<Option<Order>, PersistenceError> {
        Ok(self.orders.read().await.get(id).cloned())
    }
}
