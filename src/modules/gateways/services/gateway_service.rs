use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::core::error::{GatewayError, Result};
use crate::core::types::{CreatePaymentInput, PaymentTransaction, WebhookHeaders};

use super::gateway_trait::PaymentGateway;

/// Named registry of gateway adapters with an optional default.
///
/// This replaces framework-level dependency injection: the host constructs
/// adapters explicitly, registers them here, and routes calls by name.
#[derive(Default)]
pub struct GatewayService {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
    default_name: Option<String>,
}

impl GatewayService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its own name
    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        let name = gateway.name().to_string();
        self.gateways.insert(name, gateway);
    }

    /// Set the gateway used when no name is given to [`get`](Self::get)
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_name = Some(name.into());
    }

    /// Resolve a gateway by name, falling back to the configured default
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>> {
        let target = match name {
            Some(name) => name,
            None => self.default_name.as_deref().ok_or_else(|| {
                GatewayError::configuration("No provider specified and no default provider set")
            })?,
        };

        self.gateways
            .get(target)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("Gateway '{}' not found", target)))
    }

    /// Create a payment using the named (or default) gateway
    pub async fn create_payment(
        &self,
        name: Option<&str>,
        input: &CreatePaymentInput,
    ) -> Result<PaymentTransaction> {
        let gateway = self.get(name)?;

        info!(
            gateway = %gateway.name(),
            reference_id = %input.reference_id,
            amount = %input.amount,
            currency = %input.currency,
            "Creating payment with gateway"
        );

        match gateway.create_payment(input).await {
            Ok(transaction) => {
                info!(
                    gateway = %gateway.name(),
                    transaction_id = %transaction.id,
                    status = %transaction.status,
                    "Payment created"
                );
                Ok(transaction)
            }
            Err(e) => {
                error!(
                    gateway = %gateway.name(),
                    reference_id = %input.reference_id,
                    error = %e,
                    "Failed to create payment"
                );
                Err(e)
            }
        }
    }

    /// Verify an inbound webhook against the named (or default) gateway
    pub async fn verify_signature(
        &self,
        name: Option<&str>,
        payload: &str,
        headers: &WebhookHeaders,
    ) -> Result<bool> {
        self.get(name)?.verify_signature(payload, headers).await
    }

    /// Process an inbound webhook with the named (or default) gateway
    pub async fn process_webhook(
        &self,
        name: Option<&str>,
        payload: &str,
    ) -> Result<PaymentTransaction> {
        let gateway = self.get(name)?;

        match gateway.process_webhook(payload).await {
            Ok(transaction) => {
                info!(
                    gateway = %gateway.name(),
                    reference_id = %transaction.reference_id,
                    status = %transaction.status,
                    "Webhook processed"
                );
                Ok(transaction)
            }
            Err(e) => {
                error!(gateway = %gateway.name(), error = %e, "Failed to process webhook");
                Err(e)
            }
        }
    }

    /// Names of all registered gateways
    pub fn list(&self) -> Vec<&str> {
        self.gateways.keys().map(String::as_str).collect()
    }
}
