use mediastore_catalog::{DeliveryInfo, Product, ProductCatalog, RushDecision, RushEvaluator};
use mediastore_core::{
    CustomerContext, PaymentError, PaymentOutcome, PaymentResult, PaymentTransaction, TransactionRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;
use uuid::Uuid;
use crate::error::CheckoutError;
use crate::gateway::{CallbackParams, GatewayRegistry};
use crate::manager::OrderManager;
use crate::models::{Order, OrderItem, OrderStatus};
use crate::repository::OrderRepository;

/// Knobs the orchestrator applies to every checkout.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    /// Upper bound for any single call into a payment gateway.
    pub gateway_timeout: Duration,
    /// Move paid orders straight through `PENDING_APPROVAL` to `APPROVED`.
    pub auto_approve: bool,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(10),
            auto_approve: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn add(mut self, product_id: Uuid, quantity: u32) -> Self {
        self.lines.push(CartLine { product_id, quantity });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub redirect_url: Url,
    pub total: Decimal,
    pub status: OrderStatus,
    pub rush: RushDecision,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Coordinates checkout, payment reconciliation and order transitions.
pub struct CheckoutOrchestrator {
    catalog: Arc<dyn ProductCatalog>,
    orders: OrderManager,
    transactions: Arc<dyn TransactionRepository>,
    gateways: Arc<GatewayRegistry>,
    rush: Arc<RushEvaluator>,
    policy: CheckoutPolicy,
}

impl CheckoutOrchestrator {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        gateways: Arc<GatewayRegistry>,
        rush: Arc<RushEvaluator>,
        policy: CheckoutPolicy,
    ) -> Self {
        Self {
            catalog,
            orders: OrderManager::new(orders),
            transactions,
            gateways,
            rush,
            policy,
        }
    }

    pub fn gateways(&self) -> &GatewayRegistry {
        &self.gateways
    }

    /// Turns a cart into a `PENDING` order and asks the chosen gateway where
    /// to send the customer.
    ///
    /// If the gateway fails the order is kept in `PENDING`;
    /// [`retry_payment`](Self::retry_payment) can request a new URL.
    #[instrument(skip(self, cart, delivery), fields(customer = %customer.customer_id, lines = cart.lines.len()))]
    pub async fn create_checkout(
        &self,
        customer: &CustomerContext,
        cart: &Cart,
        delivery: &DeliveryInfo,
        gateway_key: &str,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        if cart.lines.is_empty() {
            return Err(CheckoutError::Validation("cart is empty".to_string()));
        }
        let gateway = self.gateways.resolve(Some(gateway_key)).map_err(CheckoutError::Gateway)?;

        let mut items = Vec::with_capacity(cart.lines.len());
        let mut products = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = self.resolve_line(line).await?;
            items.push(OrderItem::from_product(&product, line.quantity));
            products.push(product);
        }

        // Informational only: rush never blocks checkout.
        let rush = self.rush.place_rush_order(Some(delivery), &products);

        let total: Decimal = items.iter().map(OrderItem::amount).sum();
        let order = Order::new(customer, delivery, items, total)
            .map_err(|err| CheckoutError::Validation(err.to_string()))?;
        self.orders.save(&order).await?;

        tracing::info!(
            "Order {} created for {} (recipient phone {}), total {}, rush supported: {}",
            order.id,
            order.customer_id,
            order.phone,
            order.total(),
            rush.supported
        );

        let redirect_url = self
            .call_gateway(gateway.initiate_payment(&order))
            .await
            .map_err(CheckoutError::payment(&order.id))?;

        Ok(CheckoutReceipt {
            order_id: order.id.clone(),
            redirect_url,
            total: order.total(),
            status: order.status(),
            rush,
        })
    }

    /// Requests a fresh payment URL for an order still awaiting payment.
    #[instrument(skip(self))]
    pub async fn retry_payment(&self, order_id: &str, gateway_key: &str) -> Result<Url, CheckoutError> {
        let gateway = self.gateways.resolve(Some(gateway_key)).map_err(CheckoutError::Gateway)?;
        let order = self.orders.get(order_id).await?;
        if order.status() != OrderStatus::Pending {
            return Err(CheckoutError::Validation(format!(
                "order {} is {} and no longer awaits payment",
                order_id,
                order.status()
            )));
        }

        self.call_gateway(gateway.initiate_payment(&order))
            .await
            .map_err(CheckoutError::payment(order_id))
    }

    /// Reconciles a provider callback with its order.
    ///
    /// Replaying a callback whose transaction is already recorded for an order
    /// that has left `PENDING` is a no-op returning the current status.
    #[instrument(skip(self, params), fields(params = params.len()))]
    pub async fn handle_gateway_callback(
        &self,
        gateway_key: &str,
        params: &CallbackParams,
    ) -> Result<StatusUpdate, CheckoutError> {
        let gateway = self.gateways.resolve(Some(gateway_key)).map_err(CheckoutError::Gateway)?;
        let transaction = gateway.parse_callback(params).map_err(|err| {
            tracing::warn!("Rejected {} callback: {}", gateway.key(), err);
            CheckoutError::Gateway(err)
        })?;
        let order_id = transaction.order_id.clone();

        let _guard = self.orders.lock(&order_id).await;
        let mut order = self.orders.find(&order_id).await?.ok_or_else(|| CheckoutError::Payment {
            order_id: order_id.clone(),
            source: PaymentError::OrderNotFound(order_id.clone()),
        })?;

        let history = self.load_transactions(&order_id).await?;
        let already_recorded = history.iter().any(|t| {
            t.id == transaction.id && t.gateway == transaction.gateway && t.outcome == transaction.outcome
        });

        if already_recorded && order.status() != OrderStatus::Pending {
            tracing::debug!("Callback for transaction {} already reconciled", transaction.id);
            return Ok(StatusUpdate {
                order_id,
                status: order.status(),
            });
        }

        match transaction.outcome {
            PaymentOutcome::Success => {
                if let Some(previous) = history.iter().find(|t| t.is_successful() && t.id != transaction.id) {
                    return Err(self.reconciliation_failure(
                        &order_id,
                        format!("order already paid by transaction {}", previous.id),
                    ));
                }
                if order.status() != OrderStatus::Pending {
                    return Err(self.reconciliation_failure(
                        &order_id,
                        format!("order is {}, expected PENDING", order.status()),
                    ));
                }
                if transaction.amount != order.total() {
                    return Err(self.reconciliation_failure(
                        &order_id,
                        format!("paid amount {} differs from order total {}", transaction.amount, order.total()),
                    ));
                }

                if !already_recorded {
                    self.record_transaction(&transaction).await?;
                }

                order
                    .transition_to(OrderStatus::PendingApproval)
                    .map_err(|err| CheckoutError::from_order(&order_id, err))?;
                if self.policy.auto_approve {
                    order
                        .transition_to(OrderStatus::Approved)
                        .map_err(|err| CheckoutError::from_order(&order_id, err))?;
                }
                self.orders.save(&order).await?;

                tracing::info!(
                    "Order {} paid via {} (transaction {}), now {}",
                    order_id,
                    transaction.gateway,
                    transaction.id,
                    order.status()
                );
            }
            PaymentOutcome::Failure | PaymentOutcome::Pending => {
                if !already_recorded {
                    self.record_transaction(&transaction).await?;
                }
                tracing::info!(
                    "Payment attempt {} for order {} reported {}",
                    transaction.id,
                    order_id,
                    transaction.outcome
                );
            }
            PaymentOutcome::Refunded => {
                return Err(self.reconciliation_failure(
                    &order_id,
                    "callbacks cannot report refunds".to_string(),
                ));
            }
        }

        Ok(StatusUpdate {
            order_id,
            status: order.status(),
        })
    }

    /// Moves an order along one lifecycle edge.
    ///
    /// Cancelling a paid order refunds it through the originating gateway
    /// first; if the refund fails the order keeps its current status.
    #[instrument(skip(self))]
    pub async fn transition_order(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<StatusUpdate, CheckoutError> {
        if target != OrderStatus::Cancelled {
            let (order, _) = self.orders.transition(order_id, target).await?;
            return Ok(StatusUpdate {
                order_id: order_id.to_string(),
                status: order.status(),
            });
        }

        let _guard = self.orders.lock(order_id).await;
        let mut order = self.orders.get(order_id).await?;
        if !order.status().can_transition_to(target) {
            return Err(CheckoutError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status(),
                to: target,
            });
        }

        if let Some(payment) = self.refundable_payment(order_id).await? {
            let gateway = self
                .gateways
                .resolve(Some(payment.gateway.as_str()))
                .map_err(CheckoutError::payment(order_id))?;
            let confirmation = self
                .call_gateway(gateway.refund(&payment))
                .await
                .map_err(|err| {
                    tracing::warn!("Refund of {} for order {} failed: {}", payment.id, order_id, err);
                    CheckoutError::Payment {
                        order_id: order_id.to_string(),
                        source: err,
                    }
                })?;
            // Recorded before the status write so a retry never refunds twice.
            self.record_transaction(&payment.refund_record(&confirmation)).await?;
        }

        let change = order
            .transition_to(target)
            .map_err(|err| CheckoutError::from_order(order_id, err))?;
        self.orders.save(&order).await?;

        tracing::info!("Order {} moved {} -> {}", order_id, change.from, change.to);
        Ok(StatusUpdate {
            order_id: order_id.to_string(),
            status: order.status(),
        })
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, CheckoutError> {
        self.orders.get(order_id).await
    }

    pub async fn transactions(&self, order_id: &str) -> Result<Vec<PaymentTransaction>, CheckoutError> {
        self.orders.get(order_id).await?;
        self.load_transactions(order_id).await
    }

    pub fn evaluate_rush(&self, delivery: Option<&DeliveryInfo>, products: &[Product]) -> RushDecision {
        self.rush.place_rush_order(delivery, products)
    }

    async fn resolve_line(&self, line: &CartLine) -> Result<Product, CheckoutError> {
        if line.quantity == 0 {
            return Err(CheckoutError::Validation(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }

        let product = self
            .catalog
            .get_product(line.product_id)
            .await
            .map_err(CheckoutError::persistence(format!("loading product {}", line.product_id)))?
            .ok_or_else(|| CheckoutError::NotFound(format!("product {}", line.product_id)))?;

        if product.price <= Decimal::ZERO {
            return Err(CheckoutError::Validation(format!(
                "product {} has no positive price",
                product.id
            )));
        }
        Ok(product)
    }

    /// The successful payment of an order that has not been refunded yet.
    async fn refundable_payment(&self, order_id: &str) -> Result<Option<PaymentTransaction>, CheckoutError> {
        let history = self.load_transactions(order_id).await?;
        let Some(payment) = history.iter().find(|t| t.is_successful()) else {
            return Ok(None);
        };

        let refunded = history.iter().any(|t| {
            t.outcome == PaymentOutcome::Refunded
                && t.raw_payload.get("original_transaction_id") == Some(&payment.id)
        });
        Ok((!refunded).then(|| payment.clone()))
    }

    async fn load_transactions(&self, order_id: &str) -> Result<Vec<PaymentTransaction>, CheckoutError> {
        self.transactions
            .transactions_for_order(order_id)
            .await
            .map_err(CheckoutError::persistence(format!("loading transactions of order {}", order_id)))
    }

    async fn record_transaction(&self, transaction: &PaymentTransaction) -> Result<(), CheckoutError> {
        self.transactions
            .save_transaction(transaction)
            .await
            .map_err(CheckoutError::persistence(format!(
                "saving transaction {} of order {}",
                transaction.id, transaction.order_id
            )))
    }

    fn reconciliation_failure(&self, order_id: &str, reason: String) -> CheckoutError {
        tracing::warn!("Reconciliation of order {} failed: {}", order_id, reason);
        CheckoutError::Reconciliation {
            order_id: order_id.to_string(),
            reason,
        }
    }

    async fn call_gateway<T>(&self, call: impl Future<Output = PaymentResult<T>>) -> PaymentResult<T> {
        match tokio::time::timeout(self.policy.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::GatewayUnavailable(format!(
                "no answer within {}ms",
                self.policy.gateway_timeout.as_millis()
            ))),
        }
    }
}
