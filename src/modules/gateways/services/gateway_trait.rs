use crate::core::error::Result;
use crate::core::types::{CreatePaymentInput, PaymentTransaction, WebhookHeaders};
use async_trait::async_trait;

/// Payment gateway capability implemented by every provider adapter.
///
/// Implementations hold only read-only credential material after
/// construction and are safe for concurrent use; each operation is a single
/// request/response exchange with no internal retries or timeouts. Hosts
/// that need resiliency wrap these calls in their own retry/backoff logic.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiate a charge/invoice with the provider and return the canonical
    /// transaction
    async fn create_payment(&self, input: &CreatePaymentInput) -> Result<PaymentTransaction>;

    /// Authenticate an inbound webhook against provider-specific secret
    /// material.
    ///
    /// Fails closed: missing verification material or a mismatch raises
    /// `SignatureVerification` rather than returning `false`. iPaymu and
    /// DBS are documented exceptions that return `Ok(true)` (see DESIGN.md).
    async fn verify_signature(&self, payload: &str, headers: &WebhookHeaders) -> Result<bool>;

    /// Parse a raw inbound notification, run the provider's verification
    /// policy, and return the canonical transaction. No transaction is
    /// produced if verification fails.
    async fn process_webhook(&self, payload: &str) -> Result<PaymentTransaction>;

    /// Gateway name used as the registry key
    fn name(&self) -> &str;
}
