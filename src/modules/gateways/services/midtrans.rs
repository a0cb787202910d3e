use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::core::error::{GatewayError, Result};
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const SANDBOX_BASE_URL: &str = "https://api.sandbox.midtrans.com";

/// Midtrans Core API adapter.
///
/// Outbound calls use HTTP Basic auth with the server key; webhooks carry a
/// `signature_key` that must equal SHA-512(order_id + status_code +
/// gross_amount + server_key).
///
/// API Documentation: https://docs.midtrans.com/reference/api-reference
pub struct MidtransGateway {
    client: Client,
    server_key: String,
    base_url: String,
}

impl MidtransGateway {
    /// `base_url` defaults to the sandbox environment when not given
    pub fn new(server_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            server_key,
            base_url: base_url.unwrap_or_else(|| SANDBOX_BASE_URL.to_string()),
        }
    }

    fn map_input_to_payload(&self, input: &CreatePaymentInput) -> MidtransChargeRequest {
        MidtransChargeRequest {
            payment_type: map_method_to_payment_type(input.payment_method).to_string(),
            transaction_details: MidtransTransactionDetails {
                order_id: input.reference_id.clone(),
                gross_amount: input.amount.to_string(),
            },
            customer_details: MidtransCustomerDetails {
                first_name: input.customer.first_name.clone(),
                last_name: input.customer.last_name.clone(),
                email: input.customer.email.clone(),
                phone: input.customer.phone.clone(),
            },
            credit_card: matches!(input.payment_method, PaymentMethodType::CreditCard)
                .then_some(MidtransCreditCard { secure: true }),
            bank_transfer: matches!(input.payment_method, PaymentMethodType::VirtualAccount)
                .then_some(MidtransBankTransfer { bank: "bca".to_string() }),
        }
    }

    fn verify_webhook_signature(&self, webhook: &MidtransWebhook) -> Result<()> {
        let signature_string = format!(
            "{}{}{}{}",
            webhook.order_id, webhook.status_code, webhook.gross_amount, self.server_key
        );

        let mut hasher = Sha512::new();
        hasher.update(signature_string.as_bytes());
        let expected = hex::encode(hasher.finalize());

        let matches: bool = expected
            .as_bytes()
            .ct_eq(webhook.signature_key.as_bytes())
            .into();
        if !matches {
            return Err(GatewayError::signature("Invalid Midtrans signature"));
        }

        Ok(())
    }

    fn map_response_to_transaction(
        &self,
        response: MidtransChargeResponse,
        raw: serde_json::Value,
        input: &CreatePaymentInput,
    ) -> Result<PaymentTransaction> {
        let amount = parse_amount(&response.gross_amount)?;

        Ok(PaymentTransaction {
            id: response.transaction_id,
            reference_id: response.order_id,
            amount,
            currency: response.currency.unwrap_or_else(|| input.currency.clone()),
            status: map_status(&response.transaction_status),
            payment_method: input.payment_method,
            metadata: None,
            raw_response: raw,
            created_at: parse_transaction_time(&response.transaction_time),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let payload = self.map_input_to_payload(input);
        let url = format!("{}/v2/charge", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.server_key, Some(""))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider(
                        "NETWORK_ERROR",
                        format!("Midtrans gateway unavailable: {}", e),
                    )
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("Midtrans request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read Midtrans response: {}", e))
        })?;

        if http_status == reqwest::StatusCode::UNAUTHORIZED
            || http_status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::authentication(format!(
                "Midtrans rejected server key (HTTP {})",
                http_status.as_u16()
            )));
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            GatewayError::provider("PARSE_ERROR", format!("Midtrans response is not JSON: {}", e))
        })?;

        if !http_status.is_success() {
            return Err(provider_error_from_body(&raw, http_status.as_u16()));
        }

        // Midtrans signals rejection in-band: a 200 body can still carry a
        // non-2xx status_code (e.g. 406 duplicate order_id), and rejection
        // bodies omit the transaction fields
        if let Some(code) = raw["status_code"].as_str() {
            if !code.starts_with('2') {
                return Err(provider_error_from_body(&raw, http_status.as_u16()));
            }
        }

        let charge: MidtransChargeResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                "PARSE_ERROR",
                format!("Invalid Midtrans response structure: {}", e),
            )
        })?;

        self.map_response_to_transaction(charge, raw, input)
    }

    async fn verify_signature(&self, payload: &str, _headers: &WebhookHeaders) -> Result<bool> {
        let webhook: MidtransWebhook = serde_json::from_str(payload).map_err(|e| {
            GatewayError::signature(format!(
                "Invalid payload structure for signature verification: {}",
                e
            ))
        })?;

        self.verify_webhook_signature(&webhook)?;
        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        let raw: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| GatewayError::validation(format!("Webhook payload is not JSON: {}", e)))?;

        let webhook: MidtransWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid Midtrans webhook: {}", e)))?;

        self.verify_webhook_signature(&webhook)?;

        let amount = parse_amount(&webhook.gross_amount)?;

        Ok(PaymentTransaction {
            id: webhook.transaction_id,
            reference_id: webhook.order_id,
            amount,
            currency: webhook.currency.unwrap_or_else(|| "IDR".to_string()),
            status: map_status(&webhook.transaction_status),
            payment_method: map_payment_type(&webhook.payment_type),
            metadata: None,
            raw_response: raw,
            created_at: parse_transaction_time(&webhook.transaction_time),
            updated_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "midtrans"
    }
}

fn map_status(status: &str) -> PaymentStatus {
    match status {
        "capture" | "settlement" => PaymentStatus::Paid,
        "pending" => PaymentStatus::Pending,
        "deny" | "cancel" | "expire" | "failure" => PaymentStatus::Failed,
        "refund" => PaymentStatus::Refunded,
        other => {
            warn!(provider = "midtrans", code = %other, "Unmapped transaction status, defaulting to PENDING");
            PaymentStatus::Pending
        }
    }
}

fn map_method_to_payment_type(method: PaymentMethodType) -> &'static str {
    match method {
        PaymentMethodType::CreditCard => "credit_card",
        PaymentMethodType::VirtualAccount => "bank_transfer",
        PaymentMethodType::Ewallet => "gopay",
        PaymentMethodType::Qris => "qris",
        PaymentMethodType::RetailOutlet | PaymentMethodType::DirectDebit => "other",
    }
}

fn map_payment_type(payment_type: &str) -> PaymentMethodType {
    match payment_type {
        "credit_card" => PaymentMethodType::CreditCard,
        "bank_transfer" | "echannel" => PaymentMethodType::VirtualAccount,
        "gopay" | "shopeepay" => PaymentMethodType::Ewallet,
        "qris" => PaymentMethodType::Qris,
        _ => PaymentMethodType::RetailOutlet,
    }
}

fn parse_amount(gross_amount: &str) -> Result<Decimal> {
    Decimal::from_str(gross_amount)
        .map_err(|e| GatewayError::validation(format!("Invalid gross_amount: {}", e)))
}

// Midtrans reports times as "YYYY-MM-DD HH:MM:SS" with no offset
fn parse_transaction_time(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn provider_error_from_body(raw: &serde_json::Value, http_status: u16) -> GatewayError {
    let code = raw["status_code"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| http_status.to_string());
    let message = raw["status_message"]
        .as_str()
        .unwrap_or("Midtrans Error")
        .to_string();
    GatewayError::provider(code, message)
}

// Midtrans wire structures

#[derive(Debug, Serialize)]
struct MidtransChargeRequest {
    payment_type: String,
    transaction_details: MidtransTransactionDetails,
    customer_details: MidtransCustomerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    credit_card: Option<MidtransCreditCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank_transfer: Option<MidtransBankTransfer>,
}

#[derive(Debug, Serialize)]
struct MidtransTransactionDetails {
    order_id: String,
    gross_amount: String,
}

#[derive(Debug, Serialize)]
struct MidtransCustomerDetails {
    first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

#[derive(Debug, Serialize)]
struct MidtransCreditCard {
    secure: bool,
}

#[derive(Debug, Serialize)]
struct MidtransBankTransfer {
    bank: String,
}

#[derive(Debug, Deserialize)]
struct MidtransChargeResponse {
    transaction_id: String,
    order_id: String,
    gross_amount: String,
    currency: Option<String>,
    transaction_status: String,
    #[allow(dead_code)]
    payment_type: String,
    transaction_time: String,
    #[allow(dead_code)]
    status_code: String,
    #[allow(dead_code)]
    status_message: String,
}

#[derive(Debug, Deserialize)]
struct MidtransWebhook {
    transaction_id: String,
    order_id: String,
    gross_amount: String,
    currency: Option<String>,
    transaction_status: String,
    payment_type: String,
    transaction_time: String,
    status_code: String,
    signature_key: String,
}
