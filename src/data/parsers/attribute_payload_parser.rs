//! Decodes the signed payload:
//!
//! ```asn1
//! Payload ::= SET OF ReceiptAttribute
//!
//! ReceiptAttribute ::= SEQUENCE {
//!   type    INTEGER,
//!   version INTEGER,
//!   value   OCTET STRING }
//!
//! InAppAttribute ::= SEQUENCE {
//!   type    INTEGER,
//!   version INTEGER,
//!   value   OCTET STRING }
//!
//! InAppReceipt ::= SET OF InAppAttribute
//! ```
//!
//! Both levels are walked by [`parse_attribute_set`], parameterized by the
//! level's [`FieldSpec`] table and an [`AttributeSink`] collecting fields.

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::{
    data::{
        der::{
            der_cursor::{DerCursor, DerError, Tag},
            der_value::{bool_attribute, date_attribute, integer_attribute, string_attribute},
        },
        models::{
            raw_attribute_model::RawAttribute,
            receipt_fields::{
                FieldSpec, PurchaseField, ReceiptField, PURCHASE_FIELDS, RECEIPT_FIELDS,
            },
        },
    },
    domain::entities::{app_receipt::AppReceipt, purchase_entry::PurchaseEntry},
    errors::ReceiptError,
};

/// Receives the recognized attributes of one attribute set.
pub(crate) trait AttributeSink<'a> {
    type Field: Copy + std::fmt::Debug + 'static;

    /// How framing errors at this level are reported.
    fn framing_error(error: DerError) -> ReceiptError;

    fn accept(
        &mut self,
        field: Self::Field,
        attribute: RawAttribute<'a>,
        depth: usize,
    ) -> Result<(), ReceiptError>;
}

/// Walks `SET OF SEQUENCE { type, version, value }` found at `depth`,
/// handing every attribute whose type code appears in `table` to `sink`.
/// Unknown type codes are skipped.
pub(crate) fn parse_attribute_set<'a, S: AttributeSink<'a>>(
    encoded: &'a [u8],
    table: &FieldSpec<S::Field>,
    sink: &mut S,
    depth: usize,
) -> Result<(), ReceiptError> {
    let mut outer = DerCursor::at_depth(encoded, depth).map_err(S::framing_error)?;
    let mut set = outer.enter(Tag::SET).map_err(S::framing_error)?;
    outer.finish().map_err(S::framing_error)?;

    while !set.is_empty() {
        let attribute = RawAttribute::take_from(&mut set).map_err(S::framing_error)?;
        match table.lookup(attribute.type_code) {
            Some(field) => {
                trace!(?field, version = attribute.version, "decoding attribute");
                // Attribute values sit inside SEQUENCE and OCTET STRING.
                sink.accept(field, attribute, set.depth() + 2)?;
            }
            None => trace!(type_code = attribute.type_code, "skipping unknown attribute"),
        }
    }
    Ok(())
}

/// Raw inputs of the device-binding hash, borrowed from the payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidationEvidence<'a> {
    pub(crate) bundle_id_bytes: Option<&'a [u8]>,
    pub(crate) opaque_value_bytes: Option<&'a [u8]>,
    pub(crate) sha_digest_bytes: Option<&'a [u8]>,
}

fn receipt_framing_error(error: DerError) -> ReceiptError {
    debug!(error = %error, "receipt payload is malformed");
    ReceiptError::malformed(error)
}

/// Framing errors inside a purchase set fail the entry, except for integer
/// overflow, which fails the whole receipt at any level.
fn purchase_framing_error(error: DerError) -> ReceiptError {
    match error {
        DerError::IntegerOverflow => receipt_framing_error(error),
        other => {
            debug!(error = %other, "in-app purchase entry is malformed");
            ReceiptError::malformed_purchase(other)
        }
    }
}

#[derive(Debug, Default)]
struct ReceiptFields<'a> {
    evidence: ValidationEvidence<'a>,
    bundle_id: Option<String>,
    app_version: Option<String>,
    original_app_version: Option<String>,
    creation_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    purchases: Vec<PurchaseEntry>,
}

impl<'a> AttributeSink<'a> for ReceiptFields<'a> {
    type Field = ReceiptField;

    fn framing_error(error: DerError) -> ReceiptError {
        receipt_framing_error(error)
    }

    fn accept(
        &mut self,
        field: ReceiptField,
        attribute: RawAttribute<'a>,
        depth: usize,
    ) -> Result<(), ReceiptError> {
        let value = attribute.value;
        match field {
            ReceiptField::BundleId => {
                self.evidence.bundle_id_bytes = Some(value);
                self.bundle_id = string_attribute(value);
            }
            ReceiptField::AppVersion => self.app_version = string_attribute(value),
            ReceiptField::OpaqueValue => self.evidence.opaque_value_bytes = Some(value),
            ReceiptField::Sha1Hash => self.evidence.sha_digest_bytes = Some(value),
            ReceiptField::InAppPurchase => {
                if let Some(purchase) = parse_purchase_entry(value, depth)? {
                    self.purchases.push(purchase);
                }
            }
            ReceiptField::OriginalAppVersion => {
                self.original_app_version = string_attribute(value)
            }
            ReceiptField::CreationDate => self.creation_date = date_attribute(value),
            ReceiptField::ExpirationDate => self.expiration_date = date_attribute(value),
        }
        Ok(())
    }
}

impl<'a> ReceiptFields<'a> {
    fn build(self) -> Result<(ValidationEvidence<'a>, AppReceipt), ReceiptError> {
        let missing = |name: &str| ReceiptError::malformed(format!("missing {name}"));
        let receipt = AppReceipt {
            bundle_id: self.bundle_id.ok_or_else(|| missing("bundle id"))?,
            app_version: self.app_version.ok_or_else(|| missing("app version"))?,
            original_app_version: self
                .original_app_version
                .ok_or_else(|| missing("original app version"))?,
            creation_date: self
                .creation_date
                .ok_or_else(|| missing("receipt creation date"))?,
            expiration_date: self.expiration_date,
            purchases: self.purchases,
        };
        Ok((self.evidence, receipt))
    }
}

#[derive(Debug, Default)]
struct PurchaseFields {
    quantity: Option<i64>,
    product_id: Option<String>,
    transaction_id: Option<String>,
    original_transaction_id: Option<String>,
    purchase_date: Option<DateTime<Utc>>,
    original_purchase_date: Option<DateTime<Utc>>,
    subscription_expiration_date: Option<DateTime<Utc>>,
    is_in_introductory_price_period: Option<bool>,
    cancellation_date: Option<DateTime<Utc>>,
    web_order_line_item_id: Option<String>,
}

impl<'a> AttributeSink<'a> for PurchaseFields {
    type Field = PurchaseField;

    fn framing_error(error: DerError) -> ReceiptError {
        purchase_framing_error(error)
    }

    fn accept(
        &mut self,
        field: PurchaseField,
        attribute: RawAttribute<'a>,
        _depth: usize,
    ) -> Result<(), ReceiptError> {
        let value = attribute.value;
        match field {
            PurchaseField::Quantity => {
                self.quantity = integer_attribute(value).map_err(purchase_framing_error)?
            }
            PurchaseField::ProductId => self.product_id = string_attribute(value),
            PurchaseField::TransactionId => self.transaction_id = string_attribute(value),
            PurchaseField::OriginalTransactionId => {
                self.original_transaction_id = string_attribute(value)
            }
            PurchaseField::PurchaseDate => self.purchase_date = date_attribute(value),
            PurchaseField::OriginalPurchaseDate => {
                self.original_purchase_date = date_attribute(value)
            }
            PurchaseField::SubscriptionExpirationDate => {
                self.subscription_expiration_date = date_attribute(value)
            }
            PurchaseField::WebOrderLineItemId => {
                // Encoded as an INTEGER in current receipts, as a string in
                // older ones.
                self.web_order_line_item_id = match integer_attribute(value)
                    .map_err(purchase_framing_error)?
                {
                    Some(number) => Some(number.to_string()),
                    None => string_attribute(value),
                }
            }
            PurchaseField::CancellationDate => self.cancellation_date = date_attribute(value),
            PurchaseField::IsInIntroductoryPricePeriod => {
                self.is_in_introductory_price_period =
                    bool_attribute(value).map_err(purchase_framing_error)?
            }
        }
        Ok(())
    }
}

impl PurchaseFields {
    fn build(self) -> Option<PurchaseEntry> {
        Some(PurchaseEntry {
            quantity: self.quantity?,
            product_id: self.product_id?,
            transaction_id: self.transaction_id?,
            original_transaction_id: self.original_transaction_id,
            purchase_date: self.purchase_date,
            original_purchase_date: self.original_purchase_date,
            subscription_expiration_date: self.subscription_expiration_date,
            is_in_introductory_price_period: self.is_in_introductory_price_period,
            cancellation_date: self.cancellation_date,
            web_order_line_item_id: self.web_order_line_item_id,
        })
    }
}

/// Parses one nested in-app purchase set. Entries lacking quantity, product
/// id or transaction id are dropped; broken framing fails the receipt.
fn parse_purchase_entry(encoded: &[u8], depth: usize) -> Result<Option<PurchaseEntry>, ReceiptError> {
    let mut fields = PurchaseFields::default();
    parse_attribute_set(encoded, &PURCHASE_FIELDS, &mut fields, depth)?;
    let entry = fields.build();
    if entry.is_none() {
        warn!("discarding in-app purchase entry without quantity, product id or transaction id");
    }
    Ok(entry)
}

/// Parses the signed payload into the receipt model and the evidence needed
/// for the device-binding check.
pub(crate) fn parse_receipt_payload(
    payload: &[u8],
) -> Result<(ValidationEvidence<'_>, AppReceipt), ReceiptError> {
    let mut fields = ReceiptFields::default();
    parse_attribute_set(payload, &RECEIPT_FIELDS, &mut fields, 0)?;
    let (evidence, receipt) = fields.build()?;
    debug!(
        bundle_id = %receipt.bundle_id,
        purchases = receipt.purchases.len(),
        "parsed receipt payload"
    );
    Ok((evidence, receipt))
}
