use thiserror::Error;

/// Terminal failure of a receipt validation.
///
/// The same taxonomy is surfaced by the local pipeline and by any remote
/// implementation of [`crate::domain::validators::receipt_validator::ReceiptValidator`],
/// so callers never need to know which path produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error("No receipt data found.")]
    NoReceiptData,

    #[error("Receipt does not contain a signed payload.")]
    EmptyPayload,

    #[error("Receipt is malformed: {0}")]
    MalformedReceipt(String),

    #[error("Receipt is not signed.")]
    ReceiptNotSigned,

    #[error("Trusted root certificate could not be loaded.")]
    RootCertificateNotFound,

    #[error("Receipt signature is invalid.")]
    SignatureInvalid,

    #[error("Receipt hash does not match this device.")]
    IncorrectHash,

    #[error("In-app purchase entry is malformed: {0}")]
    MalformedPurchaseEntry(String),

    /// Reserved for remote validators sharing the same outcome type.
    #[error("Remote validation failed: {0}")]
    Remote(String),
}

impl ReceiptError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedReceipt(reason.to_string())
    }

    pub(crate) fn malformed_purchase(reason: impl std::fmt::Display) -> Self {
        Self::MalformedPurchaseEntry(reason.to_string())
    }
}
