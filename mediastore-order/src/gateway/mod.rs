//! Payment gateway adapters.
//!
//! Each provider gets one [`PaymentGateway`] implementation translating
//! between the provider's wire format and the canonical
//! [`PaymentTransaction`]. Adapters carry configuration only.

use async_trait::async_trait;
use mediastore_core::{PaymentError, PaymentResult, PaymentTransaction, RefundConfirmation};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;
use crate::models::Order;

pub mod momo;
pub mod registry;
pub mod signing;
pub mod vnpay;

pub use momo::{MomoConfig, MomoGateway};
pub use registry::GatewayRegistry;
pub use vnpay::{VnpayConfig, VnpayGateway};

/// Parameters of a provider callback, keyed by the provider's field names.
pub type CallbackParams = BTreeMap<String, String>;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider key this adapter is registered under.
    fn key(&self) -> &str;

    /// Returns the URL the customer is redirected to in order to pay.
    async fn initiate_payment(&self, order: &Order) -> PaymentResult<Url>;

    /// Verifies and converts an asynchronous provider notification.
    fn parse_callback(&self, params: &CallbackParams) -> PaymentResult<PaymentTransaction>;

    async fn refund(&self, transaction: &PaymentTransaction) -> PaymentResult<RefundConfirmation>;
}

/// Human-readable payment description shown on the provider's page.
pub fn order_description(order: &Order) -> String {
    let address = order.address.trim();
    if address.is_empty() {
        format!("Order: {}", order.id)
    } else {
        format!("Order {} shipping to {}", order.id, address)
    }
}

/// Converts `amount` to the provider's integer unit.
pub fn to_minor_units(amount: Decimal, factor: u32) -> PaymentResult<i64> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidOrderAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    let scaled = amount * Decimal::from(factor);
    if scaled.fract() != Decimal::ZERO {
        return Err(PaymentError::InvalidOrderAmount(format!(
            "amount {} has no exact representation in provider units",
            amount
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidOrderAmount(format!("amount {} out of range", amount)))
}

pub fn from_minor_units(raw: &str, factor: u32) -> PaymentResult<Decimal> {
    let minor: i64 = raw
        .trim()
        .parse()
        .map_err(|_| PaymentError::InvalidCallback(format!("unparseable amount '{}'", raw)))?;
    Ok(Decimal::from(minor) / Decimal::from(factor))
}

pub(crate) fn required<'a>(params: &'a CallbackParams, field: &str) -> PaymentResult<&'a str> {
    params
        .get(field)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| PaymentError::InvalidCallback(format!("missing field {}", field)))
}

/// POSTs a JSON body to a provider endpoint, bounded by `timeout`.
/// Any transport failure or non-success HTTP status is `GatewayUnavailable`.
pub(crate) async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    endpoint: &Url,
    timeout: Duration,
    body: &Req,
) -> PaymentResult<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = client
        .post(endpoint.clone())
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| PaymentError::GatewayUnavailable(format!("{}: {}", endpoint, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PaymentError::GatewayUnavailable(format!(
            "{} answered HTTP {}",
            endpoint, status
        )));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|e| PaymentError::GatewayUnavailable(format!("unreadable response from {}: {}", endpoint, e)))
}
