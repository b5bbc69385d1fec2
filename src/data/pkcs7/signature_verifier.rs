use openssl::{
    pkcs7::{Pkcs7, Pkcs7Flags},
    stack::Stack,
    x509::{
        store::{X509Store, X509StoreBuilder},
        verify::X509VerifyFlags,
        X509,
    },
};
use tracing::{debug, warn};

use crate::{data::datasources::trusted_root_datasource::TrustedRoot, errors::ReceiptError};

use super::signed_data_extractor::SignedData;

/// Verifies that `signed_data` was signed by a chain terminating at
/// `trusted_root` and that the signed content is the extracted payload.
pub(crate) fn verify_signature(
    signed_data: &SignedData<'_>,
    trusted_root: &TrustedRoot,
    check_certificate_time: bool,
) -> Result<(), ReceiptError> {
    if signed_data.signatures.is_empty() {
        debug!("signed data carries no signer infos");
        return Err(ReceiptError::ReceiptNotSigned);
    }

    let pkcs7 = Pkcs7::from_der(signed_data.envelope).map_err(|e| {
        debug!(error = %e, "envelope rejected by PKCS #7 decoder");
        ReceiptError::malformed("envelope is not a PKCS #7 structure")
    })?;
    if pkcs7.signed().is_none() {
        return Err(ReceiptError::ReceiptNotSigned);
    }

    let store = build_store(trusted_root, check_certificate_time)?;
    let extra_certificates = intermediate_certificates(&signed_data.certificates)?;
    let mut signed_content = Vec::new();
    pkcs7
        .verify(
            &extra_certificates,
            &store,
            None,
            Some(&mut signed_content),
            Pkcs7Flags::empty(),
        )
        .map_err(|e| {
            debug!(error = %e, "receipt signature verification failed");
            ReceiptError::SignatureInvalid
        })?;

    if signed_content != signed_data.payload.as_ref() {
        debug!("signed content differs from the extracted payload");
        return Err(ReceiptError::SignatureInvalid);
    }
    Ok(())
}

/// Certificates shipped in the envelope, offered as untrusted intermediates.
fn intermediate_certificates(encoded: &[&[u8]]) -> Result<Stack<X509>, ReceiptError> {
    let mut stack = Stack::new().map_err(|e| {
        warn!(error = %e, "failed to allocate certificate stack");
        ReceiptError::SignatureInvalid
    })?;
    for der in encoded {
        let certificate = X509::from_der(der)
            .map_err(|_| ReceiptError::malformed("envelope certificate is not valid DER"))?;
        stack.push(certificate).map_err(|e| {
            warn!(error = %e, "failed to collect envelope certificates");
            ReceiptError::SignatureInvalid
        })?;
    }
    Ok(stack)
}

fn build_store(
    trusted_root: &TrustedRoot,
    check_certificate_time: bool,
) -> Result<X509Store, ReceiptError> {
    let store_error = |e: openssl::error::ErrorStack| {
        warn!(error = %e, "failed to build certificate store");
        ReceiptError::RootCertificateNotFound
    };
    let mut builder = X509StoreBuilder::new().map_err(store_error)?;
    builder
        .add_cert(trusted_root.certificate().to_owned())
        .map_err(store_error)?;
    if !check_certificate_time {
        builder
            .set_flags(X509VerifyFlags::NO_CHECK_TIME)
            .map_err(store_error)?;
    }
    Ok(builder.build())
}
