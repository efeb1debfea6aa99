use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use crate::error::CheckoutError;
use crate::models::{Order, OrderStatus, StatusChange};
use crate::repository::OrderRepository;

/// Per-order mutual exclusion.
///
/// Every load → validate → save sequence on one order runs while holding that
/// order's guard, so two requests can never both act on the same stale status.
/// Orders never share a lock. An entry lives only while some task holds or
/// waits on it.
#[derive(Default)]
pub struct OrderLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, order_id: &str) -> OrderGuard {
        // Clone the Arc out first so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        OrderGuard {
            order_id: order_id.to_string(),
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive hold on one order; dropping it releases the lock.
pub struct OrderGuard {
    order_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map's own Arc is the last one once nobody holds or waits.
        // `entry` clones under the same shard lock, so no waiter slips in.
        self.locks
            .remove_if(&self.order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Manages order persistence and serialized state transitions
pub struct OrderManager {
    repo: Arc<dyn OrderRepository>,
    locks: OrderLocks,
}

impl OrderManager {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self {
            repo,
            locks: OrderLocks::new(),
        }
    }

    pub async fn lock(&self, order_id: &str) -> OrderGuard {
        self.locks.acquire(order_id).await
    }

    pub async fn find(&self, order_id: &str) -> Result<Option<Order>, CheckoutError> {
        self.repo
            .load_order(order_id)
            .await
            .map_err(CheckoutError::persistence(format!("loading order {}", order_id)))
    }

    /// Get an order by ID, failing with `NotFound` when absent
    pub async fn get(&self, order_id: &str) -> Result<Order, CheckoutError> {
        self.find(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {}", order_id)))
    }

    pub async fn save(&self, order: &Order) -> Result<(), CheckoutError> {
        self.repo
            .save_order(order)
            .await
            .map_err(CheckoutError::persistence(format!("saving order {}", order.id)))
    }

    /// Applies one edge under the order's lock and persists the result.
    ///
    /// Use for transitions with no side effects beyond the status write;
    /// callers needing work between validation and save take the lock
    /// themselves.
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<(Order, StatusChange), CheckoutError> {
        let _guard = self.lock(order_id).await;
        let mut order = self.get(order_id).await?;
        let change = order
            .transition_to(target)
            .map_err(|err| CheckoutError::from_order(order_id, err))?;
        self.save(&order).await?;

        tracing::info!("Order {} moved {} -> {}", order_id, change.from, change.to);
        Ok((order, change))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use mediastore_catalog::{DeliveryInfo, Product, ProductCategory};
    use mediastore_core::{CustomerContext, PersistenceError};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use crate::models::OrderItem;

    /// Order store double; `load_order` yields so racing tasks interleave.
    #[derive(Default)]
    pub(crate) struct TestOrderRepo {
        orders: std::sync::Mutex<HashMap<String, Order>>,
    }

    impl TestOrderRepo {
        pub(crate) fn len(&self) -> usize {
            self.orders.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderRepository for TestOrderRepo {
        async fn save_order(&self, order: &Order) -> Result<(), PersistenceError> {
            self.orders.lock().unwrap().insert(order.id.clone(), order.clone());
            Ok(())
        }

        async fn load_order(&self, id: &str) -> Result<Option<Order>, PersistenceError> {
            tokio::task::yield_now().await;
            Ok(self.orders.lock().unwrap().get(id).cloned())
        }
    }

    fn sample_order() -> Order {
        let book = Product::new(ProductCategory::Book, "Dune", dec!(100));
        Order::new(
            &CustomerContext::new("customer-1"),
            &DeliveryInfo::new("Lan", "0912345678", "1 Trang Tien", "Ha Noi"),
            vec![OrderItem::from_product(&book, 1)],
            dec!(100),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transition_persists() {
        let manager = OrderManager::new(Arc::new(TestOrderRepo::default()));
        let order = sample_order();
        manager.save(&order).await.unwrap();

        let (updated, change) = manager.transition(&order.id, OrderStatus::PendingApproval).await.unwrap();

        assert_eq!(change.from, OrderStatus::Pending);
        assert_eq!(updated.status(), OrderStatus::PendingApproval);
        assert_eq!(manager.get(&order.id).await.unwrap().status(), OrderStatus::PendingApproval);
    }

    #[tokio::test]
    async fn test_invalid_transition_not_persisted() {
        let manager = OrderManager::new(Arc::new(TestOrderRepo::default()));
        let order = sample_order();
        manager.save(&order).await.unwrap();

        let result = manager.transition(&order.id, OrderStatus::Delivered).await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Delivered, .. })
        ));
        assert_eq!(manager.get(&order.id).await.unwrap().status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let manager = OrderManager::new(Arc::new(TestOrderRepo::default()));
        let result = manager.transition("nope", OrderStatus::Cancelled).await;
        assert!(matches!(result, Err(CheckoutError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transitions_serialized() {
        for _ in 0..20 {
            let manager = Arc::new(OrderManager::new(Arc::new(TestOrderRepo::default())));
            let order = sample_order();
            manager.save(&order).await.unwrap();

            let approve = {
                let manager = manager.clone();
                let id = order.id.clone();
                tokio::spawn(async move { manager.transition(&id, OrderStatus::PendingApproval).await })
            };
            let cancel = {
                let manager = manager.clone();
                let id = order.id.clone();
                tokio::spawn(async move { manager.transition(&id, OrderStatus::Cancelled).await })
            };

            let results = [approve.await.unwrap(), cancel.await.unwrap()];
            let succeeded = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(succeeded, 1);

            let stored = manager.get(&order.id).await.unwrap();
            assert_eq!(stored.history().len(), 1);
            assert_eq!(manager.locks.tracked(), 0);
        }
    }

    #[tokio::test]
    async fn test_lock_entry_released_after_use() {
        let locks = OrderLocks::new();

        let guard = locks.acquire("order-1").await;
        let other = locks.acquire("order-2").await;
        assert_eq!(locks.tracked(), 2);

        drop(guard);
        assert_eq!(locks.tracked(), 1);
        drop(other);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_waiting() {
        let locks = Arc::new(OrderLocks::new());
        let guard = locks.acquire("order-1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("order-1").await;
                locks.tracked()
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(locks.tracked(), 0);
    }
}
