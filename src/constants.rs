/// Resource name of the pinned App Store root certificate asset.
pub const APPLE_ROOT_CERTIFICATE_RESOURCE: &str = "AppleIncRootCertificate.cer";

/// Upper bound on constructed-value nesting, both inside the signed-data
/// envelope and across nested purchase sets.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Content-octets of OID 1.2.840.113549.1.7.1 (pkcs7-data).
pub(crate) const OID_PKCS7_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];

/// Content-octets of OID 1.2.840.113549.1.7.2 (pkcs7-signedData).
pub(crate) const OID_PKCS7_SIGNED_DATA: &[u8] =
    &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// Length of the SHA-1 device-binding digest.
pub(crate) const DEVICE_BINDING_DIGEST_LEN: usize = 20;

/// Timestamp layout used by receipt date attributes (RFC 3339, UTC, no
/// fractional seconds).
pub(crate) const RECEIPT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
