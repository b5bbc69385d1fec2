//! Unwraps the PKCS #7 envelope of an App Store receipt:
//!
//! ```asn1
//! ContentInfo ::= SEQUENCE {
//!   contentType OBJECT IDENTIFIER,               -- signedData
//!   content     [0] EXPLICIT SignedData }
//!
//! SignedData ::= SEQUENCE {
//!   version          INTEGER,
//!   digestAlgorithms SET OF AlgorithmIdentifier,
//!   contentInfo      SEQUENCE {
//!     contentType OBJECT IDENTIFIER,             -- data
//!     content     [0] EXPLICIT OCTET STRING OPTIONAL },
//!   certificates     [0] IMPLICIT SET OF Certificate OPTIONAL,
//!   crls             [1] IMPLICIT SET OF CertificateList OPTIONAL,
//!   signerInfos      SET OF SignerInfo }
//! ```

use std::borrow::Cow;

use tracing::debug;

use crate::{
    constants::{OID_PKCS7_DATA, OID_PKCS7_SIGNED_DATA},
    data::der::{
        der_cursor::{DerCursor, DerError, Tag},
        der_value::octet_string_content,
    },
    errors::ReceiptError,
};

/// The parts of a signed receipt needed for verification and parsing.
#[derive(Debug, Clone)]
pub(crate) struct SignedData<'a> {
    /// The complete envelope, as handed to the signature check.
    pub(crate) envelope: &'a [u8],
    /// The signed attribute payload.
    pub(crate) payload: Cow<'a, [u8]>,
    /// Encoded certificates shipped inside the envelope.
    pub(crate) certificates: Vec<&'a [u8]>,
    /// One encrypted digest per signer.
    pub(crate) signatures: Vec<&'a [u8]>,
}

fn malformed(stage: &str, error: DerError) -> ReceiptError {
    debug!(stage, error = %error, "receipt envelope is malformed");
    ReceiptError::malformed(format!("{stage}: {error}"))
}

pub(crate) fn extract_signed_data(receipt: &[u8]) -> Result<SignedData<'_>, ReceiptError> {
    if receipt.is_empty() {
        return Err(ReceiptError::NoReceiptData);
    }
    let mut outer = DerCursor::new(receipt);
    let content_info = outer
        .expect(Tag::SEQUENCE)
        .map_err(|e| malformed("content info", e))?;
    outer
        .finish()
        .map_err(|e| malformed("after content info", e))?;
    let envelope = content_info.encoded;
    let mut content_info = content_info
        .children()
        .map_err(|e| malformed("content info", e))?;

    let content_type = content_info
        .expect(Tag::OBJECT_IDENTIFIER)
        .map_err(|e| malformed("content type", e))?;
    if content_type.value != OID_PKCS7_SIGNED_DATA {
        debug!("receipt content type is not signedData");
        return Err(ReceiptError::ReceiptNotSigned);
    }

    let mut explicit = content_info
        .take_optional(Tag::context(0, true))
        .map_err(|e| malformed("signed data", e))?
        .ok_or(ReceiptError::EmptyPayload)?
        .children()
        .map_err(|e| malformed("signed data", e))?;
    let mut signed_data = explicit
        .enter(Tag::SEQUENCE)
        .map_err(|e| malformed("signed data", e))?;

    signed_data
        .expect(Tag::INTEGER)
        .map_err(|e| malformed("signed data version", e))?;
    signed_data
        .expect(Tag::SET)
        .map_err(|e| malformed("digest algorithms", e))?;

    let payload = take_encapsulated_content(&mut signed_data)?;

    let certificates = match signed_data
        .take_optional(Tag::context(0, true))
        .map_err(|e| malformed("certificates", e))?
    {
        Some(certificates) => collect_encoded(certificates.children())
            .map_err(|e| malformed("certificates", e))?,
        None => Vec::new(),
    };
    signed_data
        .take_optional(Tag::context(1, true))
        .map_err(|e| malformed("crls", e))?;

    let mut signer_infos = signed_data
        .enter(Tag::SET)
        .map_err(|e| malformed("signer infos", e))?;
    let mut signatures = Vec::new();
    while !signer_infos.is_empty() {
        let signature =
            take_signature(&mut signer_infos).map_err(|e| malformed("signer info", e))?;
        signatures.push(signature);
    }

    debug!(
        payload_len = payload.len(),
        certificates = certificates.len(),
        signers = signatures.len(),
        "extracted signed data"
    );
    Ok(SignedData {
        envelope,
        payload,
        certificates,
        signatures,
    })
}

fn take_encapsulated_content<'a>(
    signed_data: &mut DerCursor<'a>,
) -> Result<Cow<'a, [u8]>, ReceiptError> {
    let mut content_info = signed_data
        .enter(Tag::SEQUENCE)
        .map_err(|e| malformed("content info", e))?;
    let content_type = content_info
        .expect(Tag::OBJECT_IDENTIFIER)
        .map_err(|e| malformed("content type", e))?;
    if content_type.value != OID_PKCS7_DATA {
        debug!("encapsulated content type is not data");
        return Err(ReceiptError::EmptyPayload);
    }
    let Some(explicit) = content_info
        .take_optional(Tag::context(0, true))
        .map_err(|e| malformed("content", e))?
    else {
        return Err(ReceiptError::EmptyPayload);
    };
    let mut explicit = explicit
        .children()
        .map_err(|e| malformed("content", e))?;
    let octets = explicit
        .next_object()
        .map_err(|e| malformed("content", e))?;
    let payload = octet_string_content(&octets).map_err(|e| malformed("content", e))?;
    if payload.is_empty() {
        return Err(ReceiptError::EmptyPayload);
    }
    Ok(payload)
}

fn collect_encoded(children: Result<DerCursor<'_>, DerError>) -> Result<Vec<&[u8]>, DerError> {
    let mut children = children?;
    let mut encoded = Vec::new();
    while !children.is_empty() {
        encoded.push(children.next_object()?.encoded);
    }
    Ok(encoded)
}

/// ```asn1
/// SignerInfo ::= SEQUENCE {
///   version                   INTEGER,
///   issuerAndSerialNumber     SEQUENCE,
///   digestAlgorithm           AlgorithmIdentifier,
///   authenticatedAttributes   [0] IMPLICIT Attributes OPTIONAL,
///   digestEncryptionAlgorithm AlgorithmIdentifier,
///   encryptedDigest           OCTET STRING,
///   unauthenticatedAttributes [1] IMPLICIT Attributes OPTIONAL }
/// ```
fn take_signature<'a>(signer_infos: &mut DerCursor<'a>) -> Result<&'a [u8], DerError> {
    let mut signer_info = signer_infos.enter(Tag::SEQUENCE)?;
    signer_info.expect(Tag::INTEGER)?;
    signer_info.next_object()?;
    signer_info.expect(Tag::SEQUENCE)?;
    signer_info.take_optional(Tag::context(0, true))?;
    signer_info.expect(Tag::SEQUENCE)?;
    Ok(signer_info.expect(Tag::OCTET_STRING)?.value)
}
