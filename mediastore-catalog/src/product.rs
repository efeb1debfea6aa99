use async_trait::async_trait;
use mediastore_core::PersistenceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Product categories sold by the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Book,
    Cd,
    Dvd,
    Lp,
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductCategory::Book => "BOOK",
            ProductCategory::Cd => "CD",
            ProductCategory::Dvd => "DVD",
            ProductCategory::Lp => "LP",
        };
        f.write_str(name)
    }
}

/// Catalog view of a product as checkout sees it.
///
/// `rush_eligible` is maintained by the catalog; checkout only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub category: ProductCategory,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub rush_eligible: bool,
}

impl Product {
    pub fn new(category: ProductCategory, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            title: title.into(),
            price,
            rush_eligible: false,
        }
    }

    pub fn with_rush(mut self, rush_eligible: bool) -> Self {
        self.rush_eligible = rush_eligible;
        self
    }
}

/// Read access to the product catalog.
///
/// `Ok(None)` means the id is unknown to this source; errors are reserved for
/// genuine storage failures.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PersistenceError>;
}
