use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{
    config::ValidatorConfig,
    data::{
        datasources::{
            receipt_datasource::{FileReceiptDatasource, ReceiptDatasource},
            trusted_root_datasource::TrustedRoot,
        },
        repositories::receipt_repository_impl::{validate_receipt_bytes, ReceiptRepositoryImpl},
    },
    domain::{
        entities::{device_identifier::DeviceIdentifier, validation_outcome::ValidationOutcome},
        repositories::receipt_repository::ReceiptRepository,
        validators::receipt_validator::ReceiptValidator,
    },
    errors::ReceiptError,
};

/// Validates the receipt on this device, without a network round-trip.
pub struct LocalReceiptValidator<R: ReceiptRepository> {
    receipt_repository: Arc<R>,
}

impl<R: ReceiptRepository> Clone for LocalReceiptValidator<R> {
    fn clone(&self) -> Self {
        Self {
            receipt_repository: Arc::clone(&self.receipt_repository),
        }
    }
}

impl<R: ReceiptRepository> LocalReceiptValidator<R> {
    /// Runs the pipeline on the calling thread.
    pub fn validate_blocking(&self) -> ValidationOutcome {
        run_pipeline(self.receipt_repository.as_ref())
    }
}

#[async_trait]
impl<R: ReceiptRepository + 'static> ReceiptValidator for LocalReceiptValidator<R> {
    /// Runs on tokio's blocking pool when polled inside a tokio runtime, and
    /// on the polling thread under any other executor.
    async fn validate(&self) -> ValidationOutcome {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime, validating on the calling thread");
            return self.validate_blocking();
        };
        let receipt_repository = Arc::clone(&self.receipt_repository);
        match runtime
            .spawn_blocking(move || run_pipeline(receipt_repository.as_ref()))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "receipt validation task did not complete");
                ValidationOutcome::Invalid(ReceiptError::malformed(
                    "validation task did not complete",
                ))
            }
        }
    }
}

impl LocalReceiptValidator<ReceiptRepositoryImpl<FileReceiptDatasource>> {
    /// Validator over the receipt file named by `config`. The trusted root
    /// is read from `config.root_certificate_path` when set, otherwise the
    /// process-wide root is used.
    pub fn new(
        config: &ValidatorConfig,
        device_identifier: DeviceIdentifier,
    ) -> Result<Self, ReceiptError> {
        let trusted_root = match &config.root_certificate_path {
            Some(path) => Arc::new(TrustedRoot::from_file(path)?),
            None => TrustedRoot::global().ok_or_else(|| {
                debug!("no trusted root configured or installed");
                ReceiptError::RootCertificateNotFound
            })?,
        };
        Ok(Self::with_datasource(
            FileReceiptDatasource::new(&config.receipt_path),
            trusted_root,
            device_identifier,
            config.check_certificate_time,
        ))
    }
}

impl<D: ReceiptDatasource> LocalReceiptValidator<ReceiptRepositoryImpl<D>> {
    pub fn with_datasource(
        datasource: D,
        trusted_root: Arc<TrustedRoot>,
        device_identifier: DeviceIdentifier,
        check_certificate_time: bool,
    ) -> Self {
        Self {
            receipt_repository: Arc::new(ReceiptRepositoryImpl::new(
                datasource,
                trusted_root,
                device_identifier,
                check_certificate_time,
            )),
        }
    }
}

/// Validates receipt bytes already in hand, e.g. posted by a client.
pub fn validate_receipt_data(
    receipt: &[u8],
    trusted_root: &TrustedRoot,
    device_identifier: &DeviceIdentifier,
    check_certificate_time: bool,
) -> ValidationOutcome {
    validate_receipt_bytes(
        receipt,
        trusted_root,
        device_identifier,
        check_certificate_time,
    )
    .into()
}

fn run_pipeline<R: ReceiptRepository + ?Sized>(receipt_repository: &R) -> ValidationOutcome {
    receipt_repository
        .load_receipt()
        .and_then(|receipt| receipt_repository.validate_receipt(&receipt))
        .into()
}
