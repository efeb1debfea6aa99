//! Momo-style wallet gateway.
//!
//! Unlike the redirect-only flow, a payment is created server-to-server and
//! the provider answers with the URL to send the customer to. Requests and
//! IPN callbacks are signed with HMAC-SHA256 over a fixed `key=value&...`
//! string.

use async_trait::async_trait;
use chrono::Utc;
use mediastore_core::{
    PaymentError, PaymentOutcome, PaymentResult, PaymentTransaction, RefundConfirmation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;
use crate::models::Order;
use super::signing::{hmac_sha256_hex, verify_hmac_sha256};
use super::{from_minor_units, order_description, post_json, required, to_minor_units, CallbackParams, PaymentGateway};

pub const MOMO_KEY: &str = "momo";

const AMOUNT_FACTOR: u32 = 1;
const REQUEST_TYPE: &str = "captureWallet";

/// Fields of an IPN callback covered by its signature, in signing order.
const IPN_SIGNED_FIELDS: [&str; 12] = [
    "amount",
    "extraData",
    "message",
    "orderId",
    "orderInfo",
    "orderType",
    "partnerCode",
    "payType",
    "requestId",
    "responseTime",
    "resultCode",
    "transId",
];

#[derive(Debug, Clone, Deserialize)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    pub create_url: Url,
    pub refund_url: Url,
    pub redirect_url: String,
    pub ipn_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

pub struct MomoGateway {
    config: MomoConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest {
    partner_code: String,
    request_id: String,
    amount: i64,
    order_id: String,
    order_info: String,
    redirect_url: String,
    ipn_url: String,
    request_type: String,
    extra_data: String,
    lang: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    result_code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    pay_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundRequest {
    partner_code: String,
    order_id: String,
    request_id: String,
    amount: i64,
    trans_id: String,
    lang: String,
    description: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundResponse {
    result_code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    trans_id: Option<i64>,
}

impl MomoGateway {
    pub fn new(config: MomoConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Signature a genuine IPN for `params` must carry.
    pub fn ipn_signature(&self, params: &CallbackParams) -> String {
        hmac_sha256_hex(&self.config.secret_key, &self.ipn_signing_data(params))
    }

    fn ipn_signing_data(&self, params: &CallbackParams) -> String {
        let mut parts = vec![format!("accessKey={}", self.config.access_key)];
        parts.extend(IPN_SIGNED_FIELDS.iter().map(|field| {
            format!("{}={}", field, params.get(*field).map(String::as_str).unwrap_or_default())
        }));
        parts.join("&")
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

fn outcome_for(result_code: &str) -> PaymentOutcome {
    match result_code.trim() {
        "0" | "9000" => PaymentOutcome::Success,
        "1000" | "7000" | "7002" => PaymentOutcome::Pending,
        _ => PaymentOutcome::Failure,
    }
}

#[async_trait]
impl PaymentGateway for MomoGateway {
    fn key(&self) -> &str {
        MOMO_KEY
    }

    async fn initiate_payment(&self, order: &Order) -> PaymentResult<Url> {
        let amount = to_minor_units(order.total(), AMOUNT_FACTOR)?;
        let request_id = Uuid::new_v4().simple().to_string();
        let order_info = order_description(order);
        let extra_data = String::new();

        let raw_signature = format!(
            "accessKey={}&amount={}&extraData={}&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
            self.config.access_key,
            amount,
            extra_data,
            self.config.ipn_url,
            order.id,
            order_info,
            self.config.partner_code,
            self.config.redirect_url,
            request_id,
            REQUEST_TYPE,
        );

        let request = CreatePaymentRequest {
            partner_code: self.config.partner_code.clone(),
            request_id,
            amount,
            order_id: order.id.clone(),
            order_info,
            redirect_url: self.config.redirect_url.clone(),
            ipn_url: self.config.ipn_url.clone(),
            request_type: REQUEST_TYPE.to_string(),
            extra_data,
            lang: "vi".to_string(),
            signature: hmac_sha256_hex(&self.config.secret_key, &raw_signature),
        };

        let response: CreatePaymentResponse =
            post_json(&self.client, &self.config.create_url, self.timeout(), &request).await?;

        if response.result_code != 0 {
            return Err(PaymentError::GatewayUnavailable(format!(
                "Momo refused payment for order {} with code {}: {}",
                order.id,
                response.result_code,
                response.message.unwrap_or_default()
            )));
        }

        let pay_url = response
            .pay_url
            .ok_or_else(|| PaymentError::GatewayUnavailable("Momo response carried no payUrl".to_string()))?;
        Url::parse(&pay_url)
            .map_err(|e| PaymentError::GatewayUnavailable(format!("Momo returned invalid payUrl: {}", e)))
    }

    fn parse_callback(&self, params: &CallbackParams) -> PaymentResult<PaymentTransaction> {
        let provided = params
            .get("signature")
            .ok_or_else(|| PaymentError::CallbackVerificationFailed("missing signature".to_string()))?;

        if !verify_hmac_sha256(&self.config.secret_key, &self.ipn_signing_data(params), provided) {
            return Err(PaymentError::CallbackVerificationFailed(
                "signature does not match IPN parameters".to_string(),
            ));
        }

        if required(params, "partnerCode")? != self.config.partner_code {
            return Err(PaymentError::CallbackVerificationFailed(
                "IPN addressed to a different partner".to_string(),
            ));
        }

        let order_id = required(params, "orderId")?;
        let amount = from_minor_units(required(params, "amount")?, AMOUNT_FACTOR)?;
        let result_code = required(params, "resultCode")?;
        let outcome = outcome_for(result_code);
        let provider_id = params
            .get("transId")
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| {
                let request_id = params.get("requestId").map(String::as_str).unwrap_or_default();
                format!("momo-{}-{}-{}", order_id, request_id, result_code.trim())
            });

        Ok(PaymentTransaction::new(
            Some(provider_id),
            order_id,
            MOMO_KEY,
            amount,
            outcome,
            params.clone(),
        ))
    }

    async fn refund(&self, transaction: &PaymentTransaction) -> PaymentResult<RefundConfirmation> {
        if transaction.outcome != PaymentOutcome::Success {
            return Err(PaymentError::RefundNotAllowed(format!(
                "transaction {} is {}",
                transaction.id, transaction.outcome
            )));
        }

        let amount = to_minor_units(transaction.amount, AMOUNT_FACTOR)?;
        // Momo dedupes refunds on orderId, so a retried refund reuses it.
        let refund_order_id = transaction.refund_reference();
        let request_id = refund_order_id.clone();
        let description = format!("Refund for order {}", transaction.order_id);

        let raw_signature = format!(
            "accessKey={}&amount={}&description={}&orderId={}&partnerCode={}&requestId={}&transId={}",
            self.config.access_key,
            amount,
            description,
            refund_order_id,
            self.config.partner_code,
            request_id,
            transaction.id,
        );

        let request = RefundRequest {
            partner_code: self.config.partner_code.clone(),
            order_id: refund_order_id.clone(),
            request_id,
            amount,
            trans_id: transaction.id.clone(),
            lang: "vi".to_string(),
            description,
            signature: hmac_sha256_hex(&self.config.secret_key, &raw_signature),
        };

        let response: RefundResponse =
            post_json(&self.client, &self.config.refund_url, self.timeout(), &request).await?;

        if response.result_code != 0 {
            return Err(PaymentError::GatewayUnavailable(format!(
                "Momo rejected refund of {} with code {}: {}",
                transaction.id,
                response.result_code,
                response.message.unwrap_or_default()
            )));
        }

        tracing::info!("Momo refunded transaction {} for order {}", transaction.id, transaction.order_id);
        Ok(RefundConfirmation {
            transaction_id: transaction.id.clone(),
            refund_id: response
                .trans_id
                .map(|id| id.to_string())
                .unwrap_or(refund_order_id),
            amount: transaction.amount,
            refunded_at: Utc::now(),
        })
    }
}
