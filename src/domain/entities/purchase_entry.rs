use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use super::app_store_date::AppStoreDate;

/// One in-app purchase recorded in an app receipt.
///
/// Field names and date layout follow the App Store JSON receipt
/// representation, so the same type can be read from a verifyReceipt
/// response. The `*_ms` and `*_pst` companion fields are not produced.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEntry {
    /// The number of items purchased.
    #[serde_as(as = "DisplayFromStr")]
    pub quantity: i64,
    pub product_id: String,
    pub transaction_id: String,
    /// For restored transactions, the identifier of the transaction being
    /// restored. For subscription renewals, the identifier of the first
    /// purchase in the renewal chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    #[serde_as(as = "Option<AppStoreDate>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<AppStoreDate>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Only present for auto-renewable subscriptions.
    #[serde_as(as = "Option<AppStoreDate>")]
    #[serde(
        rename = "expires_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_expiration_date: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(
        rename = "is_in_intro_offer_period",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_in_introductory_price_period: Option<bool>,
    /// Set when Apple customer support cancelled (refunded) the
    /// transaction.
    #[serde_as(as = "Option<AppStoreDate>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_order_line_item_id: Option<String>,
}

impl PurchaseEntry {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }

    pub fn is_subscription(&self) -> bool {
        self.subscription_expiration_date.is_some()
    }

    /// Whether this entry grants subscription access at `now`: it must be a
    /// subscription, not cancelled, and not yet expired.
    pub fn is_subscription_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_expiration_date {
            Some(expires) => !self.is_cancelled() && now < expires,
            None => false,
        }
    }
}
