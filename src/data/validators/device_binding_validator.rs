use openssl::{memcmp, sha::Sha1};
use tracing::debug;

use crate::{
    constants::DEVICE_BINDING_DIGEST_LEN,
    data::parsers::attribute_payload_parser::ValidationEvidence,
    domain::entities::device_identifier::DeviceIdentifier,
    errors::ReceiptError,
};

/// Checks that the receipt was issued to this device:
/// `SHA-1(device identifier ‖ opaque value ‖ bundle id)` must equal the
/// receipt's hash attribute. The bundle id enters the digest as its encoded
/// attribute value, header included.
pub(crate) fn validate_device_binding(
    evidence: ValidationEvidence<'_>,
    device_identifier: &DeviceIdentifier,
) -> Result<(), ReceiptError> {
    let (Some(opaque), Some(bundle_id), Some(expected)) = (
        evidence.opaque_value_bytes,
        evidence.bundle_id_bytes,
        evidence.sha_digest_bytes,
    ) else {
        return Err(ReceiptError::malformed("missing device binding attributes"));
    };
    if device_identifier.is_empty() {
        return Err(ReceiptError::malformed("device identifier is empty"));
    }

    let mut hasher = Sha1::new();
    hasher.update(device_identifier.as_bytes());
    hasher.update(opaque);
    hasher.update(bundle_id);
    let computed = hasher.finish();

    // `memcmp::eq` panics on length mismatch.
    if expected.len() != DEVICE_BINDING_DIGEST_LEN || !memcmp::eq(&computed, expected) {
        debug!(
            expected_len = expected.len(),
            "device binding digest does not match"
        );
        return Err(ReceiptError::IncorrectHash);
    }
    Ok(())
}
