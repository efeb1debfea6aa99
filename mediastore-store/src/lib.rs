pub mod app_config;
pub mod catalog_repo;
pub mod order_repo;
pub mod transaction_repo;

pub use app_config::Config;
pub use catalog_repo::StoreCatalog;
pub use order_repo::StoreOrderRepository;
pub use transaction_repo::StoreTransactionRepository;
