use async_trait::async_trait;
use mediastore_catalog::{Product, ProductCatalog, ProductCategory};
use mediastore_core::PersistenceError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory product source, optionally restricted to one category.
#[derive(Default)]
pub struct StoreCatalog {
    category: Option<ProductCategory>,
    products: RwLock<HashMap<Uuid, Product>>,
}

impl StoreCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_category(category: ProductCategory) -> Self {
        Self {
            category: Some(category),
            products: RwLock::default(),
        }
    }

    /// Adds or replaces `product`; returns false when it belongs to another category.
    pub async fn upsert(&self, product: Product) -> bool {
        if self.category.is_some_and(|category| category != product.category) {
            return false;
        }
        self.products.write().await.insert(product.id, product);
        true
    }
}

#[async_trait]
impl ProductCatalog for StoreCatalog {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PersistenceError> {
        Ok(self.products.read().await.get(&id).cloned())
    }
}
