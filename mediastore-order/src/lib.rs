pub mod models;
pub mod manager;
pub mod repository;
pub mod error;
pub mod gateway;
pub mod orchestrator;

pub use models::{Order, OrderError, OrderItem, OrderStatus, StatusChange};
pub use manager::{OrderGuard, OrderLocks, OrderManager};
pub use repository::OrderRepository;
pub use error::CheckoutError;
pub use gateway::{CallbackParams, GatewayRegistry, MomoConfig, MomoGateway, PaymentGateway, VnpayConfig, VnpayGateway};
pub use orchestrator::{Cart, CartLine, CheckoutOrchestrator, CheckoutPolicy, CheckoutReceipt, StatusUpdate};
