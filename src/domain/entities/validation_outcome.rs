use crate::errors::ReceiptError;

use super::app_receipt::AppReceipt;

/// Terminal result of one validation, regardless of whether it ran locally
/// or against a remote validation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(AppReceipt),
    Invalid(ReceiptError),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn receipt(&self) -> Option<&AppReceipt> {
        match self {
            ValidationOutcome::Valid(receipt) => Some(receipt),
            ValidationOutcome::Invalid(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReceiptError> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<AppReceipt, ReceiptError> {
        self.into()
    }
}

impl From<Result<AppReceipt, ReceiptError>> for ValidationOutcome {
    fn from(result: Result<AppReceipt, ReceiptError>) -> Self {
        match result {
            Ok(receipt) => ValidationOutcome::Valid(receipt),
            Err(error) => ValidationOutcome::Invalid(error),
        }
    }
}

impl From<ValidationOutcome> for Result<AppReceipt, ReceiptError> {
    fn from(outcome: ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid(receipt) => Ok(receipt),
            ValidationOutcome::Invalid(error) => Err(error),
        }
    }
}
