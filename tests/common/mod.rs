#![allow(dead_code)]

use fractic_iap_receipt::{DeviceIdentifier, TrustedRoot};
use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, MsbOption},
    hash::MessageDigest,
    pkcs7::{Pkcs7, Pkcs7Flags},
    pkey::{PKey, Private},
    rsa::Rsa,
    sha::sha1,
    stack::Stack,
    x509::{
        extension::{AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier},
        X509Name, X509NameBuilder, X509,
    },
};

pub const VENDOR_ID: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

pub fn device() -> DeviceIdentifier {
    DeviceIdentifier::parse_uuid(VENDOR_ID).unwrap()
}

// --- DER writer ---

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|&b| b == 0)
            .collect();
        out.push(0x80 | bytes.len() as u8);
        out.extend(bytes);
    }
    out.extend_from_slice(content);
    out
}

pub fn integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7
        && ((bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0))
    {
        start += 1;
    }
    tlv(0x02, &bytes[start..])
}

pub fn utf8(text: &str) -> Vec<u8> {
    tlv(0x0c, text.as_bytes())
}

pub fn ia5(text: &str) -> Vec<u8> {
    tlv(0x16, text.as_bytes())
}

pub fn set(items: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x31, &items.concat())
}

pub fn sequence(items: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &items.concat())
}

pub fn attribute(type_code: i64, value: &[u8]) -> Vec<u8> {
    sequence(&[integer(type_code), integer(1), tlv(0x04, value)])
}

// --- Payloads ---

#[derive(Debug, Clone)]
pub struct Purchase {
    pub quantity: Option<i64>,
    pub product_id: &'static str,
    pub transaction_id: &'static str,
    pub extra: Vec<Vec<u8>>,
}

impl Purchase {
    pub fn new(quantity: i64, product_id: &'static str, transaction_id: &'static str) -> Self {
        Self {
            quantity: Some(quantity),
            product_id,
            transaction_id,
            extra: Vec::new(),
        }
    }

    pub fn with(mut self, type_code: i64, value: Vec<u8>) -> Self {
        self.extra.push(attribute(type_code, &value));
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut attributes = Vec::new();
        if let Some(quantity) = self.quantity {
            attributes.push(attribute(1701, &integer(quantity)));
        }
        attributes.push(attribute(1702, &utf8(self.product_id)));
        attributes.push(attribute(1703, &utf8(self.transaction_id)));
        attributes.extend(self.extra.iter().cloned());
        set(&attributes)
    }
}

#[derive(Debug, Clone)]
pub struct ReceiptPayload {
    pub bundle_id: &'static str,
    pub app_version: &'static str,
    pub original_app_version: &'static str,
    pub creation_date: &'static str,
    pub opaque: Vec<u8>,
    pub purchases: Vec<Purchase>,
    /// Raw attributes appended after everything else.
    pub extra: Vec<Vec<u8>>,
}

impl ReceiptPayload {
    pub fn new(bundle_id: &'static str) -> Self {
        Self {
            bundle_id,
            app_version: "42",
            original_app_version: "1.0",
            creation_date: "2024-03-05T10:20:30Z",
            opaque: vec![0x5e, 0x1f, 0x9a, 0x03, 0x77, 0x20, 0xc4, 0x61],
            purchases: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn with_purchase(mut self, purchase: Purchase) -> Self {
        self.purchases.push(purchase);
        self
    }

    /// Encodes the payload with a hash attribute bound to `device`.
    pub fn encode(&self, device: &DeviceIdentifier) -> Vec<u8> {
        let bundle_id = utf8(self.bundle_id);
        let digest = sha1(&[device.as_bytes(), &self.opaque[..], &bundle_id[..]].concat());
        let mut attributes = vec![
            attribute(2, &bundle_id),
            attribute(3, &utf8(self.app_version)),
            attribute(4, &self.opaque),
            attribute(5, &digest),
            attribute(12, &ia5(self.creation_date)),
            attribute(19, &utf8(self.original_app_version)),
            // Undocumented attribute types appear in real receipts.
            attribute(8, &ia5("2024-03-05T10:20:30Z")),
            attribute(10, &utf8("4+")),
        ];
        attributes.extend(self.purchases.iter().map(|p| attribute(17, &p.encode())));
        attributes.extend(self.extra.iter().cloned());
        set(&attributes)
    }
}

// --- Certificates and signing ---

fn name(common_name: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder.append_entry_by_text("O", "Example Test CA").unwrap();
    builder.append_entry_by_text("CN", common_name).unwrap();
    builder.build()
}

fn serial() -> openssl::asn1::Asn1Integer {
    let mut serial = BigNum::new().unwrap();
    serial.rand(120, MsbOption::MAYBE_ZERO, false).unwrap();
    serial.to_asn1_integer().unwrap()
}

/// A throwaway root CA plus a signing certificate issued by it.
pub struct SigningAuthority {
    pub root: X509,
    pub signer: X509,
    signer_key: PKey<Private>,
}

impl SigningAuthority {
    pub fn new() -> Self {
        Self::with_signer_validity(
            Asn1Time::days_from_now(0).unwrap(),
            Asn1Time::days_from_now(365).unwrap(),
        )
    }

    /// Signing certificate that expired long ago.
    pub fn with_expired_signer() -> Self {
        Self::with_signer_validity(
            Asn1Time::from_unix(1_000_000_000).unwrap(),
            Asn1Time::from_unix(1_100_000_000).unwrap(),
        )
    }

    fn with_signer_validity(not_before: Asn1Time, not_after: Asn1Time) -> Self {
        let root_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let root_name = name("Example Root");
        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_serial_number(&serial()).unwrap();
        builder.set_subject_name(&root_name).unwrap();
        builder.set_issuer_name(&root_name).unwrap();
        builder.set_pubkey(&root_key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(3650).unwrap())
            .unwrap();
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .unwrap();
        builder.append_extension(ski).unwrap();
        builder.sign(&root_key, MessageDigest::sha256()).unwrap();
        let root = builder.build();

        let signer_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_serial_number(&serial()).unwrap();
        builder.set_subject_name(&name("Example Receipt Signing")).unwrap();
        builder.set_issuer_name(root.subject_name()).unwrap();
        builder.set_pubkey(&signer_key).unwrap();
        builder.set_not_before(&not_before).unwrap();
        builder.set_not_after(&not_after).unwrap();
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(&*root), None))
            .unwrap();
        builder.append_extension(aki).unwrap();
        builder.sign(&root_key, MessageDigest::sha256()).unwrap();
        let signer = builder.build();

        Self {
            root,
            signer,
            signer_key,
        }
    }

    pub fn root_der(&self) -> Vec<u8> {
        self.root.to_der().unwrap()
    }

    pub fn trusted_root(&self) -> TrustedRoot {
        TrustedRoot::from_der(&self.root_der()).unwrap()
    }

    /// PKCS #7 signed-data envelope over `payload`, signer certificate
    /// embedded.
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let extra = Stack::<X509>::new().unwrap();
        Pkcs7::sign(
            &self.signer,
            &self.signer_key,
            &extra,
            payload,
            Pkcs7Flags::BINARY,
        )
        .unwrap()
        .to_der()
        .unwrap()
    }
}
