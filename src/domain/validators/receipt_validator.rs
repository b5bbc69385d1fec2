use async_trait::async_trait;

use crate::domain::entities::validation_outcome::ValidationOutcome;

/// Capability shared by the local pipeline and any remote (server-side)
/// validator, so callers can use either without knowing which one answered.
///
/// Implementations resolve exactly once per call and never retry.
#[async_trait]
pub trait ReceiptValidator: Send + Sync {
    async fn validate(&self) -> ValidationOutcome;
}
