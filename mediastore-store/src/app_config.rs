use mediastore_catalog::Product;
use mediastore_order::{CheckoutPolicy, MomoConfig, VnpayConfig};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub checkout: CheckoutConfig,
    pub rush: RushConfig,
    #[serde(default)]
    pub gateways: GatewaysConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    pub gateway_timeout_ms: u64,
    #[serde(default)]
    pub auto_approve: bool,
}

impl CheckoutConfig {
    pub fn policy(&self) -> CheckoutPolicy {
        CheckoutPolicy {
            gateway_timeout: Duration::from_millis(self.gateway_timeout_ms),
            auto_approve: self.auto_approve,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RushConfig {
    /// Provinces served by rush delivery; matched ignoring case and spacing.
    pub provinces: Vec<String>,
}

/// Only providers with a section here get registered.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewaysConfig {
    pub vnpay: Option<VnpayConfig>,
    pub momo: Option<MomoConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `MEDIASTORE__CHECKOUT__AUTO_APPROVE=true`
            .add_source(
                config::Environment::with_prefix("MEDIASTORE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("rush.provinces"),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Built-in defaults overlaid with a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        Self::defaults()?
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.port", 3000)?
            .set_default("checkout.gateway_timeout_ms", 10_000)?
            .set_default("checkout.auto_approve", false)?
            .set_default("rush.provinces", vec!["Ha Noi"])
    }
}
