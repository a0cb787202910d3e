use crate::core::error::{GatewayError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Payment methods supported across providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    VirtualAccount,
    CreditCard,
    Ewallet,
    Qris,
    RetailOutlet,
    DirectDebit,
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethodType::VirtualAccount => "VIRTUAL_ACCOUNT",
            PaymentMethodType::CreditCard => "CREDIT_CARD",
            PaymentMethodType::Ewallet => "EWALLET",
            PaymentMethodType::Qris => "QRIS",
            PaymentMethodType::RetailOutlet => "RETAIL_OUTLET",
            PaymentMethodType::DirectDebit => "DIRECT_DEBIT",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PaymentMethodType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "VIRTUAL_ACCOUNT" => Ok(PaymentMethodType::VirtualAccount),
            "CREDIT_CARD" => Ok(PaymentMethodType::CreditCard),
            "EWALLET" => Ok(PaymentMethodType::Ewallet),
            "QRIS" => Ok(PaymentMethodType::Qris),
            "RETAIL_OUTLET" => Ok(PaymentMethodType::RetailOutlet),
            "DIRECT_DEBIT" => Ok(PaymentMethodType::DirectDebit),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Canonical payment status every provider vocabulary maps onto.
///
/// Unrecognized provider codes default to `Pending`; they are never dropped
/// and never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "EXPIRED" => Ok(PaymentStatus::Expired),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// Customer identity attached to a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerDetails {
    /// Full name as providers expect it ("first last", or just first)
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Caller-supplied request to initiate a charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub amount: Decimal,
    /// ISO-4217-like currency code, e.g. "IDR"
    pub currency: String,
    /// Caller-assigned reference, globally unique per logical order
    pub reference_id: String,
    pub payment_method: PaymentMethodType,
    pub customer: CustomerDetails,
    pub metadata: Option<serde_json::Value>,
    pub description: Option<String>,
}

impl CreatePaymentInput {
    /// Validate field-level invariants before anything is sent to a provider
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(GatewayError::validation("Amount must be positive"));
        }
        if self.reference_id.trim().is_empty() {
            return Err(GatewayError::validation("Reference ID cannot be empty"));
        }
        if self.currency.trim().is_empty() {
            return Err(GatewayError::validation("Currency cannot be empty"));
        }
        if self.customer.email.trim().is_empty() || !self.customer.email.contains('@') {
            return Err(GatewayError::validation("Customer email is invalid"));
        }
        if self.customer.first_name.trim().is_empty() {
            return Err(GatewayError::validation(
                "Customer first name cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Provider-independent view of a payment, returned by every adapter call.
///
/// `reference_id` always echoes the caller's input (or the value parsed
/// verbatim from a webhook); it is never regenerated. `raw_response` holds
/// the provider payload verbatim for audit and is not mutated after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Provider-native transaction identifier
    pub id: String,
    /// Caller's reference, used for correlation and idempotent lookups
    pub reference_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethodType,
    pub metadata: Option<serde_json::Value>,
    pub raw_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Headers accompanying an inbound webhook, with case-insensitive lookup.
///
/// The core never sees HTTP; the host hands it the already-received body
/// plus these headers.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders(HashMap<String, String>);

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for WebhookHeaders {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = WebhookHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
