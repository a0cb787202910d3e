use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::core::error::{GatewayError, Result};
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const DEFAULT_BASE_URL: &str = "https://api.xendit.co";
const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Xendit invoice adapter.
///
/// Outbound calls use HTTP Basic auth with the secret key as username.
/// Webhooks are authenticated by a static callback token header rather than
/// a signature over the payload.
pub struct XenditGateway {
    client: Client,
    secret_key: String,
    callback_token: String,
    base_url: String,
}

impl XenditGateway {
    pub fn new(secret_key: String, callback_token: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            callback_token,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn map_input_to_payload(&self, input: &CreatePaymentInput) -> XenditInvoiceRequest {
        XenditInvoiceRequest {
            external_id: input.reference_id.clone(),
            amount: input.amount.to_string(),
            payer_email: Some(input.customer.email.clone()),
            description: input.description.clone(),
            customer: XenditCustomer {
                given_names: Some(input.customer.first_name.clone()),
                surname: input.customer.last_name.clone(),
                email: Some(input.customer.email.clone()),
                mobile_number: input.customer.phone.clone(),
            },
            currency: input.currency.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for XenditGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let payload = self.map_input_to_payload(input);
        let url = format!("{}/v2/invoices", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, Some(""))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider(
                        "NETWORK_ERROR",
                        format!("Xendit gateway unavailable: {}", e),
                    )
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("Xendit request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read Xendit response: {}", e))
        })?;

        if http_status == reqwest::StatusCode::UNAUTHORIZED
            || http_status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::authentication(format!(
                "Xendit rejected secret key (HTTP {})",
                http_status.as_u16()
            )));
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            GatewayError::provider("PARSE_ERROR", format!("Xendit response is not JSON: {}", e))
        })?;

        if !http_status.is_success() {
            let code = raw["error_code"].as_str().unwrap_or("XENDIT_ERROR").to_string();
            let message = raw["message"].as_str().unwrap_or("Xendit Error").to_string();
            return Err(GatewayError::provider(code, message));
        }

        let invoice: XenditInvoiceResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                "PARSE_ERROR",
                format!("Invalid Xendit response structure: {}", e),
            )
        })?;

        let metadata = serde_json::json!({
            "invoice_url": invoice.invoice_url,
            "expiry_date": invoice.expiry_date,
        });

        Ok(PaymentTransaction {
            id: invoice.id,
            reference_id: invoice.external_id,
            amount: invoice.amount,
            currency: invoice.currency,
            status: map_status(&invoice.status),
            payment_method: input.payment_method,
            metadata: Some(metadata),
            raw_response: raw,
            created_at: parse_timestamp(&invoice.created),
            updated_at: parse_timestamp(&invoice.updated),
        })
    }

    async fn verify_signature(&self, _payload: &str, headers: &WebhookHeaders) -> Result<bool> {
        let token = headers.get(CALLBACK_TOKEN_HEADER).ok_or_else(|| {
            GatewayError::signature("Missing x-callback-token header")
        })?;

        let matches: bool = self
            .callback_token
            .as_bytes()
            .ct_eq(token.as_bytes())
            .into();
        if !matches {
            return Err(GatewayError::signature("Invalid callback token"));
        }

        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        // Token verification happens in verify_signature, which the host
        // calls with the inbound headers before handing the body here
        let raw: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| GatewayError::validation(format!("Webhook payload is not JSON: {}", e)))?;

        let webhook: XenditWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid Xendit webhook: {}", e)))?;

        Ok(PaymentTransaction {
            id: webhook.id,
            reference_id: webhook.external_id,
            amount: webhook.amount,
            currency: webhook.currency,
            status: map_status(&webhook.status),
            payment_method: map_payment_method(webhook.payment_method.as_deref()),
            metadata: None,
            raw_response: raw,
            created_at: parse_timestamp(&webhook.created),
            updated_at: parse_timestamp(&webhook.updated),
        })
    }

    fn name(&self) -> &str {
        "xendit"
    }
}

fn map_status(status: &str) -> PaymentStatus {
    match status {
        "PAID" | "SETTLED" => PaymentStatus::Paid,
        "PENDING" => PaymentStatus::Pending,
        "EXPIRED" => PaymentStatus::Expired,
        other => {
            warn!(provider = "xendit", code = %other, "Unmapped invoice status, treating as FAILED");
            PaymentStatus::Failed
        }
    }
}

fn map_payment_method(method: Option<&str>) -> PaymentMethodType {
    match method {
        Some("CREDIT_CARD") => PaymentMethodType::CreditCard,
        Some("BANK_TRANSFER") | Some("VIRTUAL_ACCOUNT") => PaymentMethodType::VirtualAccount,
        Some("EWALLET") => PaymentMethodType::Ewallet,
        Some("QR_CODE") => PaymentMethodType::Qris,
        Some("DIRECT_DEBIT") => PaymentMethodType::DirectDebit,
        _ => PaymentMethodType::RetailOutlet,
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// Xendit wire structures

#[derive(Debug, Serialize)]
struct XenditInvoiceRequest {
    external_id: String,
    amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    customer: XenditCustomer,
    currency: String,
}

#[derive(Debug, Serialize)]
struct XenditCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    given_names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XenditInvoiceResponse {
    id: String,
    external_id: String,
    status: String,
    amount: Decimal,
    invoice_url: String,
    expiry_date: String,
    created: String,
    updated: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct XenditWebhook {
    id: String,
    external_id: String,
    status: String,
    amount: Decimal,
    payment_method: Option<String>,
    created: String,
    updated: String,
    currency: String,
}
