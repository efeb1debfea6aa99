pub mod identity;
pub mod payment;
pub mod repository;

pub use identity::CustomerContext;
pub use payment::{PaymentError, PaymentOutcome, PaymentResult, PaymentTransaction, RefundConfirmation};
pub use repository::{PersistenceError, TransactionRepository};
