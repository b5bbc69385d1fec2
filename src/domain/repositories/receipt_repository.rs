use crate::{domain::entities::app_receipt::AppReceipt, errors::ReceiptError};

pub trait ReceiptRepository: Send + Sync {
    /// Raw receipt bytes from the configured source.
    fn load_receipt(&self) -> Result<Vec<u8>, ReceiptError>;

    /// Runs the full local pipeline over `receipt`: envelope extraction,
    /// signature verification, payload parsing and the device-binding
    /// check. Only a receipt passing every stage is returned.
    fn validate_receipt(&self, receipt: &[u8]) -> Result<AppReceipt, ReceiptError>;
}
