use mediastore_catalog::ProductCatalog;
use mediastore_order::CheckoutOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CheckoutOrchestrator>,
    /// Same catalog the orchestrator reads; used to resolve products for rush previews.
    pub catalog: Arc<dyn ProductCatalog>,
}

impl AppState {
    pub fn new(orchestrator: Arc<CheckoutOrchestrator>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { orchestrator, catalog }
    }
}
