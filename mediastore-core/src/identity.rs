use serde::{Deserialize, Serialize};

/// The authenticated customer on whose behalf a checkout runs.
///
/// Authentication happens outside this workspace; callers resolve the
/// customer and hand it in explicitly instead of relying on ambient state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContext {
    pub customer_id: String,
    pub email: Option<String>,
}

impl CustomerContext {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
