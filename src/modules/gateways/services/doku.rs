use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::core::error::{GatewayError, Result};
use crate::core::serde_ext::string_or_number;
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const SANDBOX_BASE_URL: &str = "https://api-sandbox.doku.com";
const CHECKOUT_PATH: &str = "/checkout/v1/payment";

type HmacSha256 = Hmac<Sha256>;

/// Doku (Jokul) checkout adapter.
///
/// Every request is authenticated with an HMAC-SHA256 signature over a
/// five-line canonical string of the Client-Id, Request-Id,
/// Request-Timestamp, Request-Target and body digest headers. Webhooks are
/// verified by reconstructing the same signature from the inbound headers.
pub struct DokuGateway {
    client: Client,
    client_id: String,
    secret_key: String,
    base_url: String,
}

/// Digest header value: Base64(SHA-256(body))
pub fn generate_digest(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Signature header value over the canonical component string:
///
/// ```text
/// Client-Id:...\nRequest-Id:...\nRequest-Timestamp:...\nRequest-Target:...\nDigest:...
/// ```
pub fn generate_signature(
    client_id: &str,
    request_id: &str,
    timestamp: &str,
    request_target: &str,
    digest: &str,
    secret_key: &str,
) -> String {
    let component = format!(
        "Client-Id:{}\nRequest-Id:{}\nRequest-Timestamp:{}\nRequest-Target:{}\nDigest:{}",
        client_id, request_id, timestamp, request_target, digest
    );

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(component.as_bytes());

    format!("HMACSHA256={}", BASE64.encode(mac.finalize().into_bytes()))
}

impl DokuGateway {
    pub fn new(client_id: String, secret_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            client_id,
            secret_key,
            base_url: base_url.unwrap_or_else(|| SANDBOX_BASE_URL.to_string()),
        }
    }

    fn map_input_to_payload(&self, input: &CreatePaymentInput) -> DokuPaymentRequest {
        DokuPaymentRequest {
            order: DokuOrderRequest {
                invoice_number: input.reference_id.clone(),
                amount: input.amount.to_string(),
            },
            payment: DokuPaymentSection {
                payment_due_date: 60,
            },
            customer: DokuCustomer {
                name: input.customer.full_name(),
                email: input.customer.email.clone(),
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for DokuGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let payload = self.map_input_to_payload(input);
        // The digest must cover the exact bytes that go on the wire, so the
        // body is serialized once and reused
        let body = serde_json::to_string(&payload)
            .map_err(|e| GatewayError::validation(format!("Failed to encode Doku payload: {}", e)))?;

        let request_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let digest = generate_digest(&body);
        let signature = generate_signature(
            &self.client_id,
            &request_id,
            &timestamp,
            CHECKOUT_PATH,
            &digest,
            &self.secret_key,
        );

        let url = format!("{}{}", self.base_url, CHECKOUT_PATH);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Client-Id", self.client_id.as_str())
            .header("Request-Id", request_id.as_str())
            .header("Request-Timestamp", timestamp.as_str())
            .header("Signature", signature.as_str())
            .header("Digest", digest.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider("NETWORK_ERROR", format!("Doku gateway unavailable: {}", e))
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("Doku request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let response_body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read Doku response: {}", e))
        })?;

        if http_status == reqwest::StatusCode::UNAUTHORIZED
            || http_status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::authentication(format!(
                "Doku rejected credentials (HTTP {})",
                http_status.as_u16()
            )));
        }

        if !http_status.is_success() {
            return Err(GatewayError::provider(
                "DOKU_ERROR",
                format!("HTTP {}: {}", http_status.as_u16(), response_body),
            ));
        }

        let raw: serde_json::Value = serde_json::from_str(&response_body).map_err(|e| {
            GatewayError::provider("PARSE_ERROR", format!("Doku response is not JSON: {}", e))
        })?;

        let checkout: DokuPaymentResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider("PARSE_ERROR", format!("Invalid Doku response structure: {}", e))
        })?;

        let amount = Decimal::from_str(&checkout.order.amount)
            .map_err(|e| GatewayError::validation(format!("Invalid Doku amount: {}", e)))?;

        let metadata = checkout.virtual_account_info.as_ref().map(|va| {
            serde_json::json!({ "virtual_account": va.virtual_account_number })
        });

        Ok(PaymentTransaction {
            id: checkout.order.invoice_number.clone(),
            reference_id: checkout.order.invoice_number,
            amount,
            currency: input.currency.clone(),
            status: PaymentStatus::Pending,
            payment_method: input.payment_method,
            metadata,
            raw_response: raw,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    async fn verify_signature(&self, payload: &str, headers: &WebhookHeaders) -> Result<bool> {
        let client_id = required_header(headers, "client-id")?;
        let request_id = required_header(headers, "request-id")?;
        let timestamp = required_header(headers, "request-timestamp")?;
        let signature = required_header(headers, "signature")?;
        // The notification signature covers the path the webhook was
        // delivered to, which Doku echoes in this header
        let request_target = required_header(headers, "request-target")?;

        let digest = generate_digest(payload);
        let expected = generate_signature(
            client_id,
            request_id,
            timestamp,
            request_target,
            &digest,
            &self.secret_key,
        );

        let matches: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        if !matches {
            return Err(GatewayError::signature("Invalid Doku signature"));
        }

        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        // Header-based verification happens in verify_signature, which the
        // host calls with the inbound headers before handing the body here
        let raw: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| GatewayError::validation(format!("Webhook payload is not JSON: {}", e)))?;

        let webhook: DokuWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid Doku webhook: {}", e)))?;

        let amount = Decimal::from_str(&webhook.order.amount)
            .map_err(|e| GatewayError::validation(format!("Invalid Doku amount: {}", e)))?;

        Ok(PaymentTransaction {
            id: webhook.transaction.original_request_id.clone(),
            reference_id: webhook.order.invoice_number.clone(),
            amount,
            currency: "IDR".to_string(),
            status: map_status(&webhook.transaction.status),
            payment_method: PaymentMethodType::VirtualAccount,
            metadata: None,
            raw_response: raw,
            created_at: parse_transaction_date(&webhook.transaction.date),
            updated_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "doku"
    }
}

fn required_header<'a>(headers: &'a WebhookHeaders, name: &str) -> Result<&'a str> {
    headers.get(name).ok_or_else(|| {
        GatewayError::signature(format!(
            "Missing required header for signature verification: {}",
            name
        ))
    })
}

fn map_status(status: &str) -> PaymentStatus {
    match status {
        "SUCCESS" => PaymentStatus::Paid,
        "FAILED" => PaymentStatus::Failed,
        other => {
            if other != "PENDING" {
                warn!(provider = "doku", code = %other, "Unmapped transaction status, defaulting to PENDING");
            }
            PaymentStatus::Pending
        }
    }
}

fn parse_transaction_date(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// Doku wire structures

#[derive(Debug, Serialize)]
struct DokuPaymentRequest {
    order: DokuOrderRequest,
    payment: DokuPaymentSection,
    customer: DokuCustomer,
}

#[derive(Debug, Serialize)]
struct DokuOrderRequest {
    invoice_number: String,
    amount: String,
}

#[derive(Debug, Serialize)]
struct DokuPaymentSection {
    /// Minutes until the payment expires
    payment_due_date: u32,
}

#[derive(Debug, Serialize)]
struct DokuCustomer {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct DokuPaymentResponse {
    order: DokuOrderInfo,
    virtual_account_info: Option<DokuVirtualAccountInfo>,
}

#[derive(Debug, Deserialize)]
struct DokuOrderInfo {
    invoice_number: String,
    #[serde(deserialize_with = "string_or_number")]
    amount: String,
}

#[derive(Debug, Deserialize)]
struct DokuVirtualAccountInfo {
    virtual_account_number: String,
}

#[derive(Debug, Deserialize)]
struct DokuWebhook {
    #[allow(dead_code)]
    service: DokuIdentifier,
    #[allow(dead_code)]
    acquirer: DokuIdentifier,
    #[allow(dead_code)]
    channel: DokuIdentifier,
    order: DokuOrderInfo,
    transaction: DokuTransactionInfo,
}

#[derive(Debug, Deserialize)]
struct DokuIdentifier {
    #[allow(dead_code)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct DokuTransactionInfo {
    status: String,
    date: String,
    original_request_id: String,
}
