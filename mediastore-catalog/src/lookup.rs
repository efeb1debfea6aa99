use async_trait::async_trait;
use mediastore_core::PersistenceError;
use std::sync::Arc;
use uuid::Uuid;
use crate::product::{Product, ProductCatalog};

/// Looks a product up across per-category sources in a fixed order.
///
/// A source answering `None` hands over to the next one. A source that fails
/// stops the chain and the error is returned as-is, so a broken store is never
/// mistaken for "not in this category".
pub struct ChainedCatalog {
    sources: Vec<Arc<dyn ProductCatalog>>,
}

impl ChainedCatalog {
    pub fn new(sources: Vec<Arc<dyn ProductCatalog>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ProductCatalog for ChainedCatalog {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PersistenceError> {
        for source in &self.sources {
            if let Some(product) = source.get_product(id).await? {
                return Ok(Some(product));
            }
        }
        tracing::debug!("Product {} not found in {} catalog sources", id, self.sources.len());
        Ok(None)
    }
}
