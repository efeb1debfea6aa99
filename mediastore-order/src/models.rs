use chrono::{DateTime, Utc};
use mediastore_catalog::{DeliveryInfo, Product, ProductCategory};
use mediastore_core::CustomerContext;
use mediastore_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    PendingApproval,
    Approved,
    Rejected,
    Processing,
    Shipping,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses reachable in one step from `self`.
    pub fn allowed_targets(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[PendingApproval, Cancelled],
            PendingApproval => &[Approved, Rejected],
            Approved => &[Processing, Cancelled],
            Processing => &[Shipping, Cancelled],
            Shipping => &[Delivered],
            Delivered | Rejected | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::PendingApproval => "PENDING_APPROVAL",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PENDING_APPROVAL" => Ok(OrderStatus::PendingApproval),
            "APPROVED" => Ok(OrderStatus::Approved),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPING" => Ok(OrderStatus::Shipping),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// One applied status change, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// The order aggregate: line items, delivery details and lifecycle status.
///
/// `status`, `items` and `total` are private. Status moves only through
/// [`Order::transition_to`], and the total is fixed when the order is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub recipient_name: String,
    pub phone: Masked<String>,
    pub address: String,
    pub province: String,
    items: Vec<OrderItem>,
    total: Decimal,
    status: OrderStatus,
    history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a `PENDING` order, rejecting it unless `declared_total` is the
    /// exact sum of the line amounts.
    pub fn new(
        customer: &CustomerContext,
        delivery: &DeliveryInfo,
        items: Vec<OrderItem>,
        declared_total: Decimal,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::Validation("order has no line items".to_string()));
        }

        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(OrderError::Validation(format!(
                    "price for product {} must be positive",
                    item.product_id
                )));
            }
        }

        let computed: Decimal = items.iter().map(OrderItem::amount).sum();
        if computed != declared_total {
            return Err(OrderError::TotalMismatch {
                declared: declared_total,
                computed,
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: generate_order_id(),
            customer_id: customer.customer_id.clone(),
            recipient_name: delivery.recipient_name.clone(),
            phone: delivery.phone.clone(),
            address: delivery.address.clone(),
            province: delivery.province.clone(),
            items,
            total: computed,
            status: OrderStatus::Pending,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn delivery_info(&self) -> DeliveryInfo {
        DeliveryInfo {
            recipient_name: self.recipient_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            province: self.province.clone(),
        }
    }

    /// Moves to `target` if the edge is legal. On error nothing changes.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<StatusChange, OrderError> {
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        let change = StatusChange {
            from: self.status,
            to: target,
            at: Utc::now(),
        };
        self.status = target;
        self.updated_at = change.at;
        self.history.push(change.clone());
        Ok(change)
    }
}

fn generate_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A purchased line. Price, title and category are copied from the catalog at
/// checkout and never follow later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub category: ProductCategory,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub rush_eligible: bool,
}

impl OrderItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            category: product.category,
            title: product.title.clone(),
            unit_price: product.price,
            quantity,
            rush_eligible: product.rush_eligible,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Declared total {declared} does not match line items sum {computed}")]
    TotalMismatch {
        declared: Decimal,
        computed: Decimal,
    },

    #[error("Order validation failed: {0}")]
    Validation(String),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
