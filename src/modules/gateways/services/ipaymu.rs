use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::str::FromStr;

use crate::core::error::{GatewayError, Result};
use crate::core::serde_ext::{opt_string_or_number, string_or_number};
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const SANDBOX_BASE_URL: &str = "https://sandbox.ipaymu.com/api/v2";

type HmacSha256 = Hmac<Sha256>;

/// iPaymu v2 direct-payment adapter.
///
/// Outbound requests are signed with HMAC-SHA256 over
/// `METHOD:VA:BODY:APIKEY`. iPaymu webhooks carry no signature of their
/// own; `verify_signature` always succeeds and authenticity is delegated to
/// network-level controls (see DESIGN.md).
pub struct IpaymuGateway {
    client: Client,
    api_key: String,
    va: String,
    notify_url: String,
    base_url: String,
}

/// hex(HMAC-SHA256(api_key, "METHOD:VA:BODY:APIKEY"))
pub fn generate_signature(body: &str, method: &str, va: &str, api_key: &str) -> String {
    let string_to_sign = format!("{}:{}:{}:{}", method.to_uppercase(), va, body, api_key);

    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

impl IpaymuGateway {
    pub fn new(api_key: String, va: String, notify_url: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            va,
            notify_url,
            base_url: base_url.unwrap_or_else(|| SANDBOX_BASE_URL.to_string()),
        }
    }

    fn map_input_to_payload(&self, input: &CreatePaymentInput) -> IpaymuDirectRequest {
        IpaymuDirectRequest {
            name: input.customer.full_name(),
            email: input.customer.email.clone(),
            phone: input
                .customer
                .phone
                .clone()
                .unwrap_or_else(|| "08123456789".to_string()),
            amount: input.amount.to_string(),
            notify_url: self.notify_url.clone(),
            expired: 24,
            expired_type: "hours".to_string(),
            reference_id: input.reference_id.clone(),
            payment_method: map_payment_method(input.payment_method).to_string(),
            payment_channel: map_payment_channel(input.payment_method).to_string(),
            product: vec![input
                .description
                .clone()
                .unwrap_or_else(|| "Payment".to_string())],
            qty: vec![1],
            price: vec![input.amount.to_string()],
        }
    }
}

#[async_trait]
impl PaymentGateway for IpaymuGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let payload = self.map_input_to_payload(input);
        // Body is serialized once: the signature covers the exact wire bytes
        let body = serde_json::to_string(&payload).map_err(|e| {
            GatewayError::validation(format!("Failed to encode iPaymu payload: {}", e))
        })?;
        let signature = generate_signature(&body, "POST", &self.va, &self.api_key);

        let url = format!("{}/payment/direct", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("signature", signature.as_str())
            .header("va", self.va.as_str())
            .header("timestamp", Utc::now().timestamp_millis().to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider(
                        "NETWORK_ERROR",
                        format!("iPaymu gateway unavailable: {}", e),
                    )
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("iPaymu request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let response_body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read iPaymu response: {}", e))
        })?;

        if http_status == reqwest::StatusCode::UNAUTHORIZED
            || http_status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::authentication(format!(
                "iPaymu rejected credentials (HTTP {})",
                http_status.as_u16()
            )));
        }

        let raw: serde_json::Value = serde_json::from_str(&response_body).map_err(|e| {
            GatewayError::provider("PARSE_ERROR", format!("iPaymu response is not JSON: {}", e))
        })?;

        if !http_status.is_success() {
            return Err(provider_error_from_body(&raw, http_status.as_u16()));
        }

        let payment: IpaymuPaymentResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                "PARSE_ERROR",
                format!("Invalid iPaymu response structure: {}", e),
            )
        })?;

        if !payment.success {
            return Err(GatewayError::provider(
                payment.status.to_string(),
                payment.message,
            ));
        }

        let data = payment.data.unwrap_or_default();
        let amount = match &data.total {
            Some(total) => Decimal::from_str(total)
                .map_err(|e| GatewayError::validation(format!("Invalid iPaymu total: {}", e)))?,
            None => input.amount,
        };

        let metadata = serde_json::json!({
            "payment_no": data.payment_no,
            "url": data.url,
        });

        Ok(PaymentTransaction {
            id: data
                .transaction_id
                .or(data.session_id)
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            reference_id: data
                .reference_id
                .unwrap_or_else(|| input.reference_id.clone()),
            amount,
            currency: input.currency.clone(),
            status: PaymentStatus::Pending,
            payment_method: input.payment_method,
            metadata: Some(metadata),
            raw_response: raw,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    /// iPaymu provides no webhook signature to reconstruct; trust is
    /// delegated to IP allow-listing at the network layer
    async fn verify_signature(&self, _payload: &str, _headers: &WebhookHeaders) -> Result<bool> {
        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        let raw: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| GatewayError::validation(format!("Webhook payload is not JSON: {}", e)))?;

        let webhook: IpaymuWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid iPaymu webhook: {}", e)))?;

        Ok(PaymentTransaction {
            id: webhook.trx_id,
            reference_id: webhook.reference_id,
            // iPaymu notifications do not carry the paid amount; the host
            // reconciles against the stored transaction by reference
            amount: Decimal::ZERO,
            currency: "IDR".to_string(),
            status: map_status(&webhook.status),
            payment_method: PaymentMethodType::VirtualAccount,
            metadata: None,
            raw_response: raw,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "ipaymu"
    }
}

fn map_status(status: &str) -> PaymentStatus {
    match status.to_lowercase().as_str() {
        "berhasil" | "success" => PaymentStatus::Paid,
        "pending" => PaymentStatus::Pending,
        "expired" => PaymentStatus::Expired,
        _ => PaymentStatus::Failed,
    }
}

fn map_payment_method(method: PaymentMethodType) -> &'static str {
    match method {
        PaymentMethodType::Qris => "qris",
        PaymentMethodType::Ewallet => "ewallet",
        _ => "va",
    }
}

fn map_payment_channel(method: PaymentMethodType) -> &'static str {
    match method {
        PaymentMethodType::Qris => "qris",
        _ => "bca",
    }
}

fn provider_error_from_body(raw: &serde_json::Value, http_status: u16) -> GatewayError {
    let code = raw["Status"]
        .as_i64()
        .map(|s| s.to_string())
        .unwrap_or_else(|| http_status.to_string());
    let message = raw["Message"].as_str().unwrap_or("iPaymu Error").to_string();
    GatewayError::provider(code, message)
}

// iPaymu wire structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IpaymuDirectRequest {
    name: String,
    email: String,
    phone: String,
    amount: String,
    notify_url: String,
    expired: u32,
    expired_type: String,
    reference_id: String,
    payment_method: String,
    payment_channel: String,
    product: Vec<String>,
    qty: Vec<u32>,
    price: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IpaymuPaymentResponse {
    #[serde(rename = "Status")]
    status: i64,
    #[serde(rename = "Success")]
    success: bool,
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "Data")]
    data: Option<IpaymuPaymentData>,
}

#[derive(Debug, Default, Deserialize)]
struct IpaymuPaymentData {
    #[serde(rename = "SessionID")]
    session_id: Option<String>,
    #[serde(rename = "TransactionID", default, deserialize_with = "opt_string_or_number")]
    transaction_id: Option<String>,
    #[serde(rename = "ReferenceId")]
    reference_id: Option<String>,
    #[serde(rename = "PaymentNo")]
    payment_no: Option<String>,
    #[serde(rename = "Total", default, deserialize_with = "opt_string_or_number")]
    total: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpaymuWebhook {
    #[serde(deserialize_with = "string_or_number")]
    trx_id: String,
    #[allow(dead_code)]
    sid: String,
    status: String,
    reference_id: String,
}
