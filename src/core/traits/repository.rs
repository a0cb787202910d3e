use crate::core::error::Result;
use crate::core::types::{PaymentStatus, PaymentTransaction};
use async_trait::async_trait;

/// Persistence contract for canonical transactions.
///
/// The adapters never call this themselves; the host invokes it after
/// receiving a `PaymentTransaction` from the core. Consistency guarantees
/// around persisted records (e.g. at-most-once save per reference) belong
/// to the implementor.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Save a new transaction record
    async fn create(&self, transaction: &PaymentTransaction) -> Result<()>;

    /// Find a transaction by the caller-assigned reference ID
    async fn find_by_reference(&self, reference_id: &str) -> Result<Option<PaymentTransaction>>;

    /// Update the status of a transaction
    async fn update_status(
        &self,
        reference_id: &str,
        status: PaymentStatus,
        metadata: Option<serde_json::Value>,
    ) -> Result<()>;
}
