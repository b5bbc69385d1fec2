use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    data::{
        datasources::{receipt_datasource::ReceiptDatasource, trusted_root_datasource::TrustedRoot},
        parsers::attribute_payload_parser::parse_receipt_payload,
        pkcs7::{signature_verifier::verify_signature, signed_data_extractor::extract_signed_data},
        validators::device_binding_validator::validate_device_binding,
    },
    domain::{
        entities::{app_receipt::AppReceipt, device_identifier::DeviceIdentifier},
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::ReceiptError,
};

/// The on-device [`ReceiptRepository`]: loads through `D` and validates
/// against the pinned root.
pub struct ReceiptRepositoryImpl<D: ReceiptDatasource> {
    datasource: D,
    trusted_root: Arc<TrustedRoot>,
    device_identifier: DeviceIdentifier,
    check_certificate_time: bool,
}

impl<D: ReceiptDatasource> ReceiptRepository for ReceiptRepositoryImpl<D> {
    fn load_receipt(&self) -> Result<Vec<u8>, ReceiptError> {
        self.datasource.load_receipt()
    }

    fn validate_receipt(&self, receipt: &[u8]) -> Result<AppReceipt, ReceiptError> {
        validate_receipt_bytes(
            receipt,
            &self.trusted_root,
            &self.device_identifier,
            self.check_certificate_time,
        )
    }
}

impl<D: ReceiptDatasource> ReceiptRepositoryImpl<D> {
    pub(crate) fn new(
        datasource: D,
        trusted_root: Arc<TrustedRoot>,
        device_identifier: DeviceIdentifier,
        check_certificate_time: bool,
    ) -> Self {
        Self {
            datasource,
            trusted_root,
            device_identifier,
            check_certificate_time,
        }
    }
}

/// The local pipeline. Stages run in a fixed order and the first failure is
/// returned; the payload is only parsed once its signature has verified.
pub(crate) fn validate_receipt_bytes(
    receipt: &[u8],
    trusted_root: &TrustedRoot,
    device_identifier: &DeviceIdentifier,
    check_certificate_time: bool,
) -> Result<AppReceipt, ReceiptError> {
    let signed_data = extract_signed_data(receipt)?;
    verify_signature(&signed_data, trusted_root, check_certificate_time)?;
    debug!("receipt signature verified");

    let (evidence, app_receipt) = parse_receipt_payload(&signed_data.payload)?;
    validate_device_binding(evidence, device_identifier)?;

    info!(
        bundle_id = %app_receipt.bundle_id,
        purchases = app_receipt.purchases.len(),
        "receipt validated"
    );
    Ok(app_receipt)
}
