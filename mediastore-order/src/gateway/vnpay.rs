//! VNPay-style redirect gateway.
//!
//! Payments are started by redirecting the customer to a signed URL; the
//! provider reports back through a callback carrying `vnp_*` parameters and a
//! `vnp_SecureHash` computed with HMAC-SHA512 over the sorted, form-encoded
//! remaining parameters.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use mediastore_core::{
    PaymentError, PaymentOutcome, PaymentResult, PaymentTransaction, RefundConfirmation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;
use crate::models::Order;
use super::signing::{hmac_sha512_hex, verify_hmac_sha512};
use super::{from_minor_units, order_description, post_json, required, to_minor_units, CallbackParams, PaymentGateway};

pub const VNPAY_KEY: &str = "vnpay";

const API_VERSION: &str = "2.1.0";
const AMOUNT_FACTOR: u32 = 100;
const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
const RESPONSE_OK: &str = "00";
const STATUS_PENDING: &str = "01";
/// Provider timestamps are local time in Vietnam.
const PROVIDER_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: Url,
    pub refund_url: Url,
    pub return_url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_locale() -> String {
    "vn".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

pub struct VnpayGateway {
    config: VnpayConfig,
    client: reqwest::Client,
}

impl VnpayGateway {
    pub fn new(config: VnpayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Signature over every non-empty `vnp_*` parameter except the hash fields.
    pub fn secure_hash(&self, params: &CallbackParams) -> String {
        hmac_sha512_hex(&self.config.hash_secret, &signing_data(params))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

fn signing_data(params: &CallbackParams) -> String {
    let signed = params
        .iter()
        .filter(|(k, v)| k.starts_with("vnp_") && *k != SECURE_HASH && *k != SECURE_HASH_TYPE && !v.is_empty());
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(signed)
        .finish()
}

fn provider_timestamp(at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(PROVIDER_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format("%Y%m%d%H%M%S").to_string()
}

fn fallback_transaction_id(params: &CallbackParams, order_id: &str, response_code: &str, hash: &str) -> String {
    let stamp = params
        .get("vnp_PayDate")
        .filter(|date| !date.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| hash.chars().take(16).collect::<String>().to_ascii_lowercase());
    format!("vnp-{}-{}-{}", order_id, stamp, response_code)
}

fn outcome_for(response_code: &str, transaction_status: Option<&str>) -> PaymentOutcome {
    match (response_code, transaction_status) {
        (_, Some(STATUS_PENDING)) => PaymentOutcome::Pending,
        (RESPONSE_OK, None) | (RESPONSE_OK, Some(RESPONSE_OK)) => PaymentOutcome::Success,
        _ => PaymentOutcome::Failure,
    }
}

#[derive(Debug, Serialize)]
struct RefundRequest {
    #[serde(rename = "vnp_RequestId")]
    request_id: String,
    #[serde(rename = "vnp_Version")]
    version: String,
    #[serde(rename = "vnp_Command")]
    command: String,
    #[serde(rename = "vnp_TmnCode")]
    tmn_code: String,
    #[serde(rename = "vnp_TransactionType")]
    transaction_type: String,
    #[serde(rename = "vnp_TxnRef")]
    txn_ref: String,
    #[serde(rename = "vnp_Amount")]
    amount: i64,
    #[serde(rename = "vnp_OrderInfo")]
    order_info: String,
    #[serde(rename = "vnp_TransactionNo")]
    transaction_no: String,
    #[serde(rename = "vnp_TransactionDate")]
    transaction_date: String,
    #[serde(rename = "vnp_CreateBy")]
    create_by: String,
    #[serde(rename = "vnp_CreateDate")]
    create_date: String,
    #[serde(rename = "vnp_IpAddr")]
    ip_addr: String,
    #[serde(rename = "vnp_SecureHash")]
    secure_hash: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    #[serde(rename = "vnp_ResponseCode")]
    response_code: String,
    #[serde(rename = "vnp_Message", default)]
    message: Option<String>,
    #[serde(rename = "vnp_TransactionNo", default)]
    transaction_no: Option<String>,
}

#[async_trait]
impl PaymentGateway for VnpayGateway {
    fn key(&self) -> &str {
        VNPAY_KEY
    }

    async fn initiate_payment(&self, order: &Order) -> PaymentResult<Url> {
        let amount = to_minor_units(order.total(), AMOUNT_FACTOR)?;

        let mut params: CallbackParams = BTreeMap::new();
        params.insert("vnp_Version".into(), API_VERSION.into());
        params.insert("vnp_Command".into(), "pay".into());
        params.insert("vnp_TmnCode".into(), self.config.tmn_code.clone());
        params.insert("vnp_Amount".into(), amount.to_string());
        params.insert("vnp_CurrCode".into(), "VND".into());
        params.insert("vnp_TxnRef".into(), order.id.clone());
        params.insert("vnp_OrderInfo".into(), order_description(order));
        params.insert("vnp_OrderType".into(), "other".into());
        params.insert("vnp_Locale".into(), self.config.locale.clone());
        params.insert("vnp_ReturnUrl".into(), self.config.return_url.clone());
        params.insert("vnp_CreateDate".into(), provider_timestamp(order.created_at));

        let query = signing_data(&params);
        let signature = self.secure_hash(&params);

        let mut url = self.config.pay_url.clone();
        url.set_query(Some(&format!("{}&{}={}", query, SECURE_HASH, signature)));

        tracing::debug!("VNPay redirect prepared for order {} ({} minor units)", order.id, amount);
        Ok(url)
    }

    fn parse_callback(&self, params: &CallbackParams) -> PaymentResult<PaymentTransaction> {
        let provided = params
            .get(SECURE_HASH)
            .ok_or_else(|| PaymentError::CallbackVerificationFailed(format!("missing {}", SECURE_HASH)))?;

        if !verify_hmac_sha512(&self.config.hash_secret, &signing_data(params), provided) {
            return Err(PaymentError::CallbackVerificationFailed(
                "vnp_SecureHash does not match callback parameters".to_string(),
            ));
        }

        let order_id = required(params, "vnp_TxnRef")?;
        let amount = from_minor_units(required(params, "vnp_Amount")?, AMOUNT_FACTOR)?;
        let response_code = required(params, "vnp_ResponseCode")?;
        let outcome = outcome_for(response_code, params.get("vnp_TransactionStatus").map(String::as_str));

        // VNPay reports "0" when no transaction was created on its side. The
        // fallback id comes from signed fields so a replay maps to the same row.
        let provider_id = params
            .get("vnp_TransactionNo")
            .filter(|no| !no.trim().is_empty() && no.as_str() != "0")
            .cloned()
            .unwrap_or_else(|| fallback_transaction_id(params, order_id, response_code, provided));

        Ok(PaymentTransaction::new(
            Some(provider_id),
            order_id,
            VNPAY_KEY,
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
        let request_id = transaction.refund_reference();
        let transaction_date = transaction
            .raw_payload
            .get("vnp_PayDate")
            .cloned()
            .unwrap_or_else(|| provider_timestamp(transaction.created_at));
        let create_date = provider_timestamp(Utc::now());
        let order_info = format!("Refund for order {}", transaction.order_id);
        let create_by = "mediastore".to_string();
        let ip_addr = "127.0.0.1".to_string();

        let data = [
            request_id.as_str(),
            API_VERSION,
            "refund",
            self.config.tmn_code.as_str(),
            "02",
            transaction.order_id.as_str(),
            &amount.to_string(),
            transaction.id.as_str(),
            transaction_date.as_str(),
            create_by.as_str(),
            create_date.as_str(),
            ip_addr.as_str(),
            order_info.as_str(),
        ]
        .join("|");

        let request = RefundRequest {
            request_id: request_id.clone(),
            version: API_VERSION.to_string(),
            command: "refund".to_string(),
            tmn_code: self.config.tmn_code.clone(),
            transaction_type: "02".to_string(),
            txn_ref: transaction.order_id.clone(),
            amount,
            order_info,
            transaction_no: transaction.id.clone(),
            transaction_date,
            create_by,
            create_date,
            ip_addr,
            secure_hash: hmac_sha512_hex(&self.config.hash_secret, &data),
        };

        let response: RefundResponse =
            post_json(&self.client, &self.config.refund_url, self.timeout(), &request).await?;

        if response.response_code != RESPONSE_OK {
            return Err(PaymentError::GatewayUnavailable(format!(
                "VNPay rejected refund of {} with code {}: {}",
                transaction.id,
                response.response_code,
                response.message.unwrap_or_default()
            )));
        }

        tracing::info!("VNPay refunded transaction {} for order {}", transaction.id, transaction.order_id);
        Ok(RefundConfirmation {
            transaction_id: transaction.id.clone(),
            refund_id: response
                .transaction_no
                .filter(|no| !no.trim().is_empty() && no.as_str() != "0")
                .unwrap_or(request_id),
            amount: transaction.amount,
            refunded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mediastore_catalog::{DeliveryInfo, Product, ProductCategory};
    use mediastore_core::CustomerContext;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use crate::models::OrderItem;

    pub(crate) fn test_config() -> VnpayConfig {
        VnpayConfig {
            tmn_code: "MEDIA001".to_string(),
            hash_secret: "vnpay-test-secret".to_string(),
            pay_url: Url::parse("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html").unwrap(),
            refund_url: Url::parse("http://127.0.0.1:9/merchant_webapi/api/transaction").unwrap(),
            return_url: "https://shop.example/payments/vnpay/return".to_string(),
            locale: default_locale(),
            timeout_ms: 500,
        }
    }

    fn order(address: &str) -> Order {
        let book = Product::new(ProductCategory::Book, "Dune", dec!(100.0));
        let cd = Product::new(ProductCategory::Cd, "Kind of Blue", dec!(50.0));
        Order::new(
            &CustomerContext::new("customer-1"),
            &DeliveryInfo::new("Lan", "0912345678", address, "Ha Noi"),
            vec![OrderItem::from_product(&book, 1), OrderItem::from_product(&cd, 2)],
            dec!(200),
        )
        .unwrap()
    }

    fn query_of(url: &Url) -> BTreeMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    pub(crate) fn signed_callback(gateway: &VnpayGateway, order_id: &str, amount: &str, code: &str) -> CallbackParams {
        let mut params: CallbackParams = BTreeMap::new();
        params.insert("vnp_TmnCode".into(), "MEDIA001".into());
        params.insert("vnp_TxnRef".into(), order_id.into());
        params.insert("vnp_Amount".into(), amount.into());
        params.insert("vnp_ResponseCode".into(), code.into());
        params.insert("vnp_TransactionStatus".into(), code.into());
        params.insert("vnp_TransactionNo".into(), "14012345".into());
        params.insert("vnp_OrderInfo".into(), format!("Order: {}", order_id));
        params.insert("vnp_PayDate".into(), "20261015103000".into());
        let hash = gateway.secure_hash(&params);
        params.insert(SECURE_HASH.into(), hash);
        params
    }

    #[tokio::test]
    async fn test_redirect_encodes_order() {
        let gateway = VnpayGateway::new(test_config());
        let order = order("1 Trang Tien");

        let url = gateway.initiate_payment(&order).await.unwrap();
        let query = query_of(&url);

        assert_eq!(url.host_str(), Some("sandbox.vnpayment.vn"));
        assert_eq!(query["vnp_Amount"], "20000");
        assert_eq!(query["vnp_TxnRef"], order.id);
        assert_eq!(query["vnp_OrderInfo"], format!("Order {} shipping to 1 Trang Tien", order.id));

        let mut unsigned = query.clone();
        let hash = unsigned.remove(SECURE_HASH).unwrap();
        assert_eq!(hash, gateway.secure_hash(&unsigned));
    }

    #[tokio::test]
    async fn test_description_falls_back_without_address() {
        let gateway = VnpayGateway::new(test_config());
        let order = order("   ");

        let url = gateway.initiate_payment(&order).await.unwrap();

        assert_eq!(query_of(&url)["vnp_OrderInfo"], format!("Order: {}", order.id));
        assert_eq!(order.status(), crate::models::OrderStatus::Pending);
    }

    #[test]
    fn test_successful_callback_parsed() {
        let gateway = VnpayGateway::new(test_config());
        let params = signed_callback(&gateway, "abc123", "20000", "00");

        let txn = gateway.parse_callback(&params).unwrap();

        assert_eq!(txn.id, "14012345");
        assert_eq!(txn.order_id, "abc123");
        assert_eq!(txn.gateway, "vnpay");
        assert_eq!(txn.amount, dec!(200));
        assert_eq!(txn.outcome, PaymentOutcome::Success);
        assert_eq!(txn.raw_payload, params);
    }

    #[test]
    fn test_failed_and_pending_codes() {
        let gateway = VnpayGateway::new(test_config());

        let failed = gateway.parse_callback(&signed_callback(&gateway, "abc123", "20000", "24")).unwrap();
        assert_eq!(failed.outcome, PaymentOutcome::Failure);

        let pending = gateway.parse_callback(&signed_callback(&gateway, "abc123", "20000", "01")).unwrap();
        assert_eq!(pending.outcome, PaymentOutcome::Pending);
    }

    #[test]
    fn test_tampered_callback_rejected() {
        let gateway = VnpayGateway::new(test_config());
        let mut params = signed_callback(&gateway, "abc123", "20000", "00");
        params.insert("vnp_Amount".into(), "2000000".into());

        assert!(matches!(
            gateway.parse_callback(&params),
            Err(PaymentError::CallbackVerificationFailed(_))
        ));

        params.remove(SECURE_HASH);
        assert!(matches!(
            gateway.parse_callback(&params),
            Err(PaymentError::CallbackVerificationFailed(_))
        ));
    }

    #[test]
    fn test_signed_callback_missing_order_ref() {
        let gateway = VnpayGateway::new(test_config());
        let mut params = signed_callback(&gateway, "abc123", "20000", "00");
        params.remove("vnp_TxnRef");
        params.remove(SECURE_HASH);
        let hash = gateway.secure_hash(&params);
        params.insert(SECURE_HASH.into(), hash);

        assert!(matches!(gateway.parse_callback(&params), Err(PaymentError::InvalidCallback(_))));
    }

    #[tokio::test]
    async fn test_refund_requires_successful_transaction() {
        let gateway = VnpayGateway::new(test_config());
        let failed = gateway.parse_callback(&signed_callback(&gateway, "abc123", "20000", "24")).unwrap();

        assert!(matches!(gateway.refund(&failed).await, Err(PaymentError::RefundNotAllowed(_))));
    }
    #[test]
    fn test_missing_provider_number_gives_stable_id() {
        let gateway = VnpayGateway::new(test_config());
        let resign = |mut params: CallbackParams| {
            params.remove(SECURE_HASH);
            let hash = gateway.secure_hash(&params);
            params.insert(SECURE_HASH.into(), hash);
            params
        };
        let mut params = signed_callback(&gateway, "abc123", "20000", "24");
        params.insert("vnp_TransactionNo".into(), "0".into());
        let params = resign(params);

        let first = gateway.parse_callback(&params).unwrap();
        let replay = gateway.parse_callback(&params).unwrap();
        assert_eq!(first.id, "vnp-abc123-20261015103000-24");
        assert_eq!(first.id, replay.id);

        let mut later = params.clone();
        later.insert("vnp_PayDate".into(), "20261015104500".into());
        let later = gateway.parse_callback(&resign(later)).unwrap();
        assert_ne!(later.id, first.id);
    }

    const REFUND_PATH: &str = "/merchant_webapi/api/transaction";

    fn mocked_config(server: &MockServer) -> VnpayConfig {
        VnpayConfig {
            refund_url: Url::parse(&format!("{}{}", server.uri(), REFUND_PATH)).unwrap(),
            ..test_config()
        }
    }

    fn paid(gateway: &VnpayGateway) -> PaymentTransaction {
        gateway.parse_callback(&signed_callback(gateway, "abc123", "20000", "00")).unwrap()
    }

    fn request_ids(requests: &[wiremock::Request]) -> Vec<serde_json::Value> {
        requests
            .iter()
            .map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).unwrap()["vnp_RequestId"].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_refund_accepted_by_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFUND_PATH))
            .and(body_partial_json(json!({
                "vnp_RequestId": "rf-14012345",
                "vnp_Command": "refund",
                "vnp_TmnCode": "MEDIA001",
                "vnp_TxnRef": "abc123",
                "vnp_Amount": 20000,
                "vnp_TransactionNo": "14012345",
                "vnp_TransactionDate": "20261015103000",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vnp_ResponseCode": "00",
                "vnp_Message": "Refund success",
                "vnp_TransactionNo": "14099999",
            })))
            .expect(1)
            .mount(&server)
            .await;
        let gateway = VnpayGateway::new(mocked_config(&server));

        let confirmation = gateway.refund(&paid(&gateway)).await.unwrap();

        assert_eq!(confirmation.transaction_id, "14012345");
        assert_eq!(confirmation.refund_id, "14099999");
        assert_eq!(confirmation.amount, dec!(200));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let data = [
            "vnp_RequestId",
            "vnp_Version",
            "vnp_Command",
            "vnp_TmnCode",
            "vnp_TransactionType",
            "vnp_TxnRef",
            "vnp_Amount",
            "vnp_TransactionNo",
            "vnp_TransactionDate",
            "vnp_CreateBy",
            "vnp_CreateDate",
            "vnp_IpAddr",
            "vnp_OrderInfo",
        ]
        .iter()
        .map(|field| match &body[*field] {
            serde_json::Value::String(value) => value.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|");
        assert_eq!(body["vnp_SecureHash"], hmac_sha512_hex("vnpay-test-secret", &data));
    }

    #[tokio::test]
    async fn test_repeated_refund_sends_same_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFUND_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "vnp_ResponseCode": "00" })))
            .expect(2)
            .mount(&server)
            .await;
        let gateway = VnpayGateway::new(mocked_config(&server));
        let payment = paid(&gateway);

        let first = gateway.refund(&payment).await.unwrap();
        let second = gateway.refund(&payment).await.unwrap();

        assert_eq!(first.refund_id, "rf-14012345");
        assert_eq!(second.refund_id, first.refund_id);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(request_ids(&requests), vec![json!("rf-14012345"), json!("rf-14012345")]);
    }

    #[tokio::test]
    async fn test_refund_rejected_by_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFUND_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vnp_ResponseCode": "94",
                "vnp_Message": "Duplicate request",
            })))
            .mount(&server)
            .await;
        let gateway = VnpayGateway::new(mocked_config(&server));

        match gateway.refund(&paid(&gateway)).await {
            Err(PaymentError::GatewayUnavailable(message)) => {
                assert!(message.contains("code 94"), "{}", message);
                assert!(message.contains("Duplicate request"), "{}", message);
            }
            other => panic!("expected GatewayUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refund_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFUND_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let gateway = VnpayGateway::new(mocked_config(&server));

        match gateway.refund(&paid(&gateway)).await {
            Err(PaymentError::GatewayUnavailable(message)) => {
                assert!(message.contains("HTTP 500"), "{}", message)
            }
            other => panic!("expected GatewayUnavailable, got {:?}", other),
        }
    }
}
