use mediastore_core::{PaymentError, PaymentResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use super::PaymentGateway;

/// Read-only lookup of gateway adapters by provider key.
///
/// Built once at startup. Keys are trimmed and lower-cased both when
/// registering and when resolving.
pub struct GatewayRegistry {
    gateways: BTreeMap<String, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    /// Fails with `DuplicateGateway` if two adapters normalize to the same key
    /// and with `InvalidGatewayConfig` if an adapter's key is blank.
    pub fn new(adapters: Vec<Arc<dyn PaymentGateway>>) -> PaymentResult<Self> {
        let mut gateways = BTreeMap::new();
        for adapter in adapters {
            let key = Self::normalize_key(adapter.key());
            if key.is_empty() {
                return Err(PaymentError::InvalidGatewayConfig(format!(
                    "adapter key '{}' is blank",
                    adapter.key()
                )));
            }
            if gateways.insert(key.clone(), adapter).is_some() {
                return Err(PaymentError::DuplicateGateway(key));
            }
        }
        Ok(Self { gateways })
    }

    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Resolves `key`; absent, blank and unknown keys all fail with
    /// `UnsupportedPaymentType` listing the configured keys.
    pub fn resolve(&self, key: Option<&str>) -> PaymentResult<Arc<dyn PaymentGateway>> {
        let requested = key.map(Self::normalize_key).unwrap_or_default();
        self.gateways
            .get(&requested)
            .cloned()
            .ok_or_else(|| PaymentError::UnsupportedPaymentType {
                key: key.unwrap_or_default().to_string(),
                supported: self.list_supported(),
            })
    }

    /// Registered keys in ascending order
    pub fn list_supported(&self) -> Vec<String> {
        self.gateways.keys().cloned().collect()
    }

    pub fn is_supported(&self, key: &str) -> bool {
        self.gateways.contains_key(&Self::normalize_key(key))
    }
}
