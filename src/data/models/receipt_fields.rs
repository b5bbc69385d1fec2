//! Attribute type codes of the App Store receipt payload:
//! https://developer.apple.com/library/archive/releasenotes/General/ValidateAppStoreReceipt/Chapters/ReceiptFields.html

/// Static mapping from attribute type code to semantic field.
#[derive(Debug)]
pub(crate) struct FieldSpec<F: 'static> {
    entries: &'static [(i64, F)],
}

impl<F: Copy> FieldSpec<F> {
    pub(crate) const fn new(entries: &'static [(i64, F)]) -> Self {
        Self { entries }
    }

    pub(crate) fn lookup(&self, type_code: i64) -> Option<F> {
        self.entries
            .iter()
            .find(|(code, _)| *code == type_code)
            .map(|(_, field)| *field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptField {
    /// The app's bundle identifier (CFBundleIdentifier).
    BundleId,
    /// The app's version number (CFBundleVersion).
    AppVersion,
    /// An opaque value used, with other data, to compute the SHA-1 hash
    /// during validation.
    OpaqueValue,
    /// A SHA-1 hash, used to validate the receipt.
    Sha1Hash,
    /// The receipt for one in-app purchase. The payload contains one such
    /// attribute per purchase, each a nested attribute set.
    InAppPurchase,
    /// The version of the app that was originally purchased.
    OriginalAppVersion,
    /// The date when the app receipt was created.
    CreationDate,
    /// The date that the app receipt expires. Only present for apps
    /// purchased through the Volume Purchase Program.
    ExpirationDate,
}

pub(crate) static RECEIPT_FIELDS: FieldSpec<ReceiptField> = FieldSpec::new(&[
    (2, ReceiptField::BundleId),
    (3, ReceiptField::AppVersion),
    (4, ReceiptField::OpaqueValue),
    (5, ReceiptField::Sha1Hash),
    (12, ReceiptField::CreationDate),
    (17, ReceiptField::InAppPurchase),
    (19, ReceiptField::OriginalAppVersion),
    (21, ReceiptField::ExpirationDate),
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PurchaseField {
    /// The number of items purchased.
    Quantity,
    /// The product identifier of the item that was purchased.
    ProductId,
    /// The transaction identifier of the item that was purchased.
    TransactionId,
    /// The date and time that the item was purchased.
    PurchaseDate,
    /// For a transaction that restores a previous transaction, the
    /// transaction identifier of the original transaction.
    OriginalTransactionId,
    /// For a transaction that restores a previous transaction, the date of
    /// the original transaction.
    OriginalPurchaseDate,
    /// The expiration date for the subscription. Only present for
    /// auto-renewable subscriptions.
    SubscriptionExpirationDate,
    /// The primary key for identifying subscription purchases.
    WebOrderLineItemId,
    /// For a transaction that was cancelled by Apple customer support, the
    /// time and date of the cancellation.
    CancellationDate,
    /// Whether the subscription is in its introductory price period.
    IsInIntroductoryPricePeriod,
}

pub(crate) static PURCHASE_FIELDS: FieldSpec<PurchaseField> = FieldSpec::new(&[
    (1701, PurchaseField::Quantity),
    (1702, PurchaseField::ProductId),
    (1703, PurchaseField::TransactionId),
    (1704, PurchaseField::PurchaseDate),
    (1705, PurchaseField::OriginalTransactionId),
    (1706, PurchaseField::OriginalPurchaseDate),
    (1708, PurchaseField::SubscriptionExpirationDate),
    (1711, PurchaseField::WebOrderLineItemId),
    (1712, PurchaseField::CancellationDate),
    (1719, PurchaseField::IsInIntroductoryPricePeriod),
]);
