use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use md5::Md5;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::core::error::{GatewayError, Result};
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const DEFAULT_BASE_URL: &str = "https://web.faspay.co.id";
const TERMINAL: &str = "10";
const DEFAULT_PAYMENT_CHANNEL: &str = "402";

/// Faspay Business (debit) adapter.
///
/// Faspay speaks XML on the wire and authenticates with a legacy digest
/// chain: SHA1(MD5(user_id + password) + seed), where the seed is the bill
/// number for requests and bill number + payment status code for
/// notifications. Numeric-looking XML fields are kept as strings so leading
/// zeros survive.
pub struct FaspayGateway {
    client: Client,
    merchant_id: String,
    merchant_name: String,
    user_id: String,
    password: String,
    base_url: String,
}

/// SHA1(MD5(user_id + password) + seed), hex-encoded
pub fn legacy_signature(user_id: &str, password: &str, seed: &str) -> String {
    let mut md5 = Md5::new();
    md5.update(user_id.as_bytes());
    md5.update(password.as_bytes());
    let credential_hash = hex::encode(md5.finalize());

    let mut sha1 = Sha1::new();
    sha1.update(credential_hash.as_bytes());
    sha1.update(seed.as_bytes());
    hex::encode(sha1.finalize())
}

impl FaspayGateway {
    pub fn new(
        merchant_id: String,
        merchant_name: String,
        user_id: String,
        password: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            merchant_id,
            merchant_name,
            user_id,
            password,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn map_input_to_request(&self, input: &CreatePaymentInput) -> FaspayChargeRequest {
        FaspayChargeRequest {
            request: "Post Data Transaction".to_string(),
            merchant_id: self.merchant_id.clone(),
            merchant: self.merchant_name.clone(),
            bill_no: input.reference_id.clone(),
            bill_desc: input
                .description
                .clone()
                .unwrap_or_else(|| "Payment".to_string()),
            bill_total: input.amount.to_string(),
            bill_currency: input.currency.clone(),
            pay_type: "1".to_string(),
            terminal: TERMINAL.to_string(),
            cust_name: input.customer.full_name(),
            cust_email: input.customer.email.clone(),
            signature: legacy_signature(&self.user_id, &self.password, &input.reference_id),
            payment_channel: DEFAULT_PAYMENT_CHANNEL.to_string(),
        }
    }

    fn verify_notification(&self, notification: &FaspayNotification) -> Result<()> {
        let seed = format!(
            "{}{}",
            notification.bill_no, notification.payment_status_code
        );
        let expected = legacy_signature(&self.user_id, &self.password, &seed);

        let matches: bool = expected
            .as_bytes()
            .ct_eq(notification.signature.as_bytes())
            .into();
        if !matches {
            return Err(GatewayError::signature("Invalid Faspay signature"));
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FaspayGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let request = self.map_input_to_request(input);
        let body = quick_xml::se::to_string_with_root("faspay", &request)
            .map_err(|e| GatewayError::validation(format!("Failed to encode Faspay XML: {}", e)))?;

        let url = format!("{}/cvr/{}/{}", self.base_url, self.merchant_id, TERMINAL);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider(
                        "NETWORK_ERROR",
                        format!("Faspay gateway unavailable: {}", e),
                    )
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("Faspay request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let response_body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read Faspay response: {}", e))
        })?;

        if !http_status.is_success() {
            return Err(GatewayError::provider(
                "FASPAY_ERROR",
                format!("HTTP {}: {}", http_status.as_u16(), response_body),
            ));
        }

        let charge: FaspayChargeResponse = quick_xml::de::from_str(&response_body).map_err(|e| {
            GatewayError::provider(
                "XML_PARSE_ERROR",
                format!("Invalid Faspay response structure: {}", e),
            )
        })?;

        if charge.response_code != "00" {
            return Err(GatewayError::provider(
                charge.response_code,
                charge
                    .response_desc
                    .unwrap_or_else(|| "Faspay Error".to_string()),
            ));
        }

        let amount = Decimal::from_str(&charge.bill_total)
            .map_err(|e| GatewayError::validation(format!("Invalid Faspay bill_total: {}", e)))?;

        let metadata = charge
            .redirect_url
            .as_ref()
            .map(|url| serde_json::json!({ "redirect_url": url }));

        let raw = serde_json::to_value(&charge)
            .map_err(|e| GatewayError::validation(format!("Failed to encode raw response: {}", e)))?;

        Ok(PaymentTransaction {
            id: charge.trx_id,
            reference_id: charge.bill_no,
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

    async fn verify_signature(&self, payload: &str, _headers: &WebhookHeaders) -> Result<bool> {
        let notification: FaspayNotification = quick_xml::de::from_str(payload).map_err(|e| {
            GatewayError::signature(format!(
                "Invalid payload structure for signature verification: {}",
                e
            ))
        })?;

        self.verify_notification(&notification)?;
        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        let notification: FaspayNotification = quick_xml::de::from_str(payload)
            .map_err(|e| GatewayError::validation(format!("Invalid Faspay notification: {}", e)))?;

        self.verify_notification(&notification)?;

        let amount = Decimal::from_str(&notification.payment_total).map_err(|e| {
            GatewayError::validation(format!("Invalid Faspay payment_total: {}", e))
        })?;

        let raw = serde_json::to_value(&notification)
            .map_err(|e| GatewayError::validation(format!("Failed to encode raw response: {}", e)))?;

        Ok(PaymentTransaction {
            id: notification.trx_id.clone(),
            reference_id: notification.bill_no.clone(),
            amount,
            currency: "IDR".to_string(),
            status: map_status(&notification.payment_status_code),
            payment_method: PaymentMethodType::VirtualAccount,
            metadata: None,
            raw_response: raw,
            created_at: parse_payment_date(notification.payment_date.as_deref()),
            updated_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "faspay"
    }
}

fn map_status(code: &str) -> PaymentStatus {
    match code {
        "2" => PaymentStatus::Paid,
        "1" => PaymentStatus::Pending,
        "7" => PaymentStatus::Expired,
        "8" => PaymentStatus::Failed,
        other => {
            warn!(provider = "faspay", code = %other, "Unmapped payment_status_code, defaulting to PENDING");
            PaymentStatus::Pending
        }
    }
}

fn parse_payment_date(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S").ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(Utc::now)
}

// Faspay wire structures. Codes and totals stay as strings: Faspay zero-pads
// response codes and XML has no number type anyway.

#[derive(Debug, Serialize)]
struct FaspayChargeRequest {
    request: String,
    merchant_id: String,
    merchant: String,
    bill_no: String,
    bill_desc: String,
    bill_total: String,
    bill_currency: String,
    pay_type: String,
    terminal: String,
    cust_name: String,
    cust_email: String,
    signature: String,
    payment_channel: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FaspayChargeResponse {
    #[allow(dead_code)]
    response: String,
    response_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_desc: Option<String>,
    trx_id: String,
    bill_no: String,
    bill_total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FaspayNotification {
    request: String,
    trx_id: String,
    bill_no: String,
    payment_status_code: String,
    payment_total: String,
    signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_date: Option<String>,
}
