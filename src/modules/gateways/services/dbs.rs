use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgp::composed::{Deserializable, Message, SignedPublicKey, SignedSecretKey};
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::core::error::{GatewayError, Result};
use crate::core::types::{
    CreatePaymentInput, PaymentMethodType, PaymentStatus, PaymentTransaction, WebhookHeaders,
};

use super::gateway_trait::PaymentGateway;

const DEFAULT_BASE_URL: &str = "https://ideal.dbs.com";
const PGP_ARMOR_HEADER: &str = "-----BEGIN PGP MESSAGE-----";

/// DBS RAPID adapter.
///
/// The entire payload travels as ASCII-armored OpenPGP ciphertext: requests
/// are encrypted to the bank's public key, responses and webhooks are
/// decrypted with the merchant private key. There is no separate signature
/// step; successful decryption is treated as the authenticity proof, so
/// `verify_signature` is a stub (see DESIGN.md).
pub struct DbsGateway {
    client: Client,
    client_id: String,
    private_key: SignedSecretKey,
    bank_public_key: SignedPublicKey,
    base_url: String,
}

/// Encrypt a JSON document to the recipient key, ASCII-armored
pub fn encrypt_payload(plaintext: &str, recipient: &SignedPublicKey) -> Result<String> {
    let message = Message::new_literal("payload.json", plaintext);
    let encrypted = message
        .encrypt_to_keys(
            &mut rand::thread_rng(),
            SymmetricKeyAlgorithm::AES256,
            &[recipient],
        )
        .map_err(|e| GatewayError::crypto(format!("PGP encryption failed: {}", e)))?;

    encrypted
        .to_armored_string(None)
        .map_err(|e| GatewayError::crypto(format!("PGP armoring failed: {}", e)))
}

/// Decrypt an ASCII-armored message and return the literal data as UTF-8
pub fn decrypt_payload(armored: &str, key: &SignedSecretKey) -> Result<String> {
    let (message, _) = Message::from_string(armored)
        .map_err(|e| GatewayError::crypto(format!("Invalid PGP message: {}", e)))?;

    let (mut decrypter, _key_ids) = message
        .decrypt(String::default, &[key])
        .map_err(|e| GatewayError::crypto(format!("PGP decryption failed: {}", e)))?;

    let decrypted = decrypter
        .next()
        .ok_or_else(|| GatewayError::crypto("Decrypted message carries no content"))?
        .map_err(|e| GatewayError::crypto(format!("PGP decryption failed: {}", e)))?;

    let content = decrypted
        .get_content()
        .map_err(|e| GatewayError::crypto(format!("PGP decryption failed: {}", e)))?
        .ok_or_else(|| GatewayError::crypto("Decrypted message carries no content"))?;

    String::from_utf8(content)
        .map_err(|e| GatewayError::crypto(format!("Decrypted payload is not UTF-8: {}", e)))
}

impl DbsGateway {
    /// Keys are parsed once here; a malformed key is a `Crypto` error at
    /// construction rather than on the first call
    pub fn new(
        client_id: String,
        private_key_armored: &str,
        bank_public_key_armored: &str,
        base_url: Option<String>,
    ) -> Result<Self> {
        let (private_key, _) = SignedSecretKey::from_string(private_key_armored)
            .map_err(|e| GatewayError::crypto(format!("Invalid DBS private key: {}", e)))?;
        let (bank_public_key, _) = SignedPublicKey::from_string(bank_public_key_armored)
            .map_err(|e| GatewayError::crypto(format!("Invalid DBS bank public key: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            client_id,
            private_key,
            bank_public_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn map_input_to_payload(&self, input: &CreatePaymentInput) -> DbsPaymentRequest {
        let now = Utc::now();
        DbsPaymentRequest {
            header: DbsHeader {
                msg_id: now.timestamp_millis().to_string(),
                org_id: self.client_id.clone(),
                time_stamp: now.to_rfc3339(),
                ctry: "ID".to_string(),
            },
            txn_info: DbsTxnRequest {
                customer_reference: input.reference_id.clone(),
                txn_date: now.format("%Y-%m-%d").to_string(),
                txn_amount: input.amount.to_string(),
                txn_ccy: input.currency.clone(),
                txn_type: "ACT".to_string(),
            },
        }
    }

    fn map_envelope_to_transaction(
        &self,
        envelope: DbsEnvelope,
        raw: serde_json::Value,
        payment_method: PaymentMethodType,
    ) -> Result<PaymentTransaction> {
        let amount = Decimal::from_str(&envelope.txn_info.txn_amount)
            .map_err(|e| GatewayError::validation(format!("Invalid DBS txnAmount: {}", e)))?;

        Ok(PaymentTransaction {
            id: envelope.txn_info.txn_ref_id,
            reference_id: envelope.txn_info.customer_reference,
            amount,
            currency: envelope.txn_info.txn_ccy,
            status: map_status(&envelope.txn_info.txn_status),
            payment_method,
            metadata: None,
            raw_response: raw,
            created_at: parse_timestamp(&envelope.header.time_stamp),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PaymentGateway for DbsGateway {
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction> {
        input.validate()?;

        let payload = self.map_input_to_payload(input);
        let plaintext = serde_json::to_string(&payload)
            .map_err(|e| GatewayError::validation(format!("Failed to encode DBS payload: {}", e)))?;
        let ciphertext = encrypt_payload(&plaintext, &self.bank_public_key)?;

        let url = format!("{}/api/v1/payments", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("X-Client-ID", self.client_id.as_str())
            .body(ciphertext)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GatewayError::provider("NETWORK_ERROR", format!("DBS gateway unavailable: {}", e))
                } else {
                    GatewayError::provider("NETWORK_ERROR", format!("DBS request failed: {}", e))
                }
            })?;

        let http_status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::provider("NETWORK_ERROR", format!("Failed to read DBS response: {}", e))
        })?;

        if http_status == reqwest::StatusCode::UNAUTHORIZED
            || http_status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::authentication(format!(
                "DBS rejected client credentials (HTTP {})",
                http_status.as_u16()
            )));
        }

        if !http_status.is_success() {
            return Err(GatewayError::provider(
                "DBS_ERROR",
                format!("HTTP {}: {}", http_status.as_u16(), body),
            ));
        }

        let decrypted = decrypt_payload(&body, &self.private_key)?;
        let raw: serde_json::Value = serde_json::from_str(&decrypted).map_err(|e| {
            GatewayError::provider("DBS_PARSE_ERROR", format!("DBS response is not JSON: {}", e))
        })?;

        let envelope: DbsEnvelope = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                "DBS_PARSE_ERROR",
                format!("Invalid DBS response structure: {}", e),
            )
        })?;

        if envelope.txn_info.txn_status == "RJCT" {
            return Err(GatewayError::provider(
                "DBS_REJECTED",
                envelope
                    .txn_info
                    .txn_status_description
                    .unwrap_or_else(|| "DBS Transaction Rejected".to_string()),
            ));
        }

        self.map_envelope_to_transaction(envelope, raw, input.payment_method)
    }

    /// Authenticity is established by decryption; there is no detached
    /// signature to check
    async fn verify_signature(&self, _payload: &str, _headers: &WebhookHeaders) -> Result<bool> {
        Ok(true)
    }

    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction> {
        let armored = extract_ciphertext(payload)?;
        let decrypted = decrypt_payload(&armored, &self.private_key)?;

        let raw: serde_json::Value = serde_json::from_str(&decrypted).map_err(|e| {
            GatewayError::validation(format!("Decrypted DBS webhook is not JSON: {}", e))
        })?;

        let envelope: DbsEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid DBS webhook: {}", e)))?;

        self.map_envelope_to_transaction(envelope, raw, PaymentMethodType::DirectDebit)
    }

    fn name(&self) -> &str {
        "dbs"
    }
}

/// Webhooks arrive either as bare armored text or wrapped as `{"data": "..."}`
fn extract_ciphertext(payload: &str) -> Result<String> {
    let trimmed = payload.trim_start();
    if trimmed.starts_with(PGP_ARMOR_HEADER) {
        return Ok(payload.to_string());
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if let Some(data) = value["data"].as_str() {
            return Ok(data.to_string());
        }
    }

    Err(GatewayError::validation("Invalid DBS webhook payload format"))
}

fn map_status(status: &str) -> PaymentStatus {
    match status {
        "ACTC" => PaymentStatus::Paid,
        "RJCT" => PaymentStatus::Failed,
        "PDNG" => PaymentStatus::Pending,
        other => {
            warn!(provider = "dbs", code = %other, "Unmapped txnStatus, defaulting to PENDING");
            PaymentStatus::Pending
        }
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// DBS wire structures (camelCase on the wire)

#[derive(Debug, Serialize)]
struct DbsPaymentRequest {
    header: DbsHeader,
    #[serde(rename = "txnInfo")]
    txn_info: DbsTxnRequest,
}

#[derive(Debug, Serialize, Deserialize)]
struct DbsHeader {
    #[serde(rename = "msgId")]
    msg_id: String,
    #[serde(rename = "orgId")]
    org_id: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    ctry: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DbsTxnRequest {
    customer_reference: String,
    txn_date: String,
    txn_amount: String,
    txn_ccy: String,
    txn_type: String,
}

#[derive(Debug, Deserialize)]
struct DbsEnvelope {
    header: DbsHeader,
    #[serde(rename = "txnInfo")]
    txn_info: DbsTxnInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DbsTxnInfo {
    #[allow(dead_code)]
    txn_type: String,
    customer_reference: String,
    txn_ref_id: String,
    #[allow(dead_code)]
    txn_date: String,
    txn_amount: String,
    txn_ccy: String,
    txn_status: String,
    txn_status_description: Option<String>,
}
