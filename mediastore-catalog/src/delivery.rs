use mediastore_shared::Masked;
use serde::{Deserialize, Serialize};

/// Where and to whom an order ships
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub recipient_name: String,
    pub phone: Masked<String>,
    pub address: String,
    /// Province or region code used by rush policies.
    pub province: String,
}

impl DeliveryInfo {
    pub fn new(
        recipient_name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        province: impl Into<String>,
    ) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            phone: Masked(phone.into()),
            address: address.into(),
            province: province.into(),
        }
    }
}
