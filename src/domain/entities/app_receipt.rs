use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{app_store_date::AppStoreDate, purchase_entry::PurchaseEntry};

/// A validated app receipt.
///
/// Only ever handed out once the receipt's signature and device binding have
/// been checked; the required fields are therefore always populated.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppReceipt {
    pub bundle_id: String,
    #[serde(rename = "application_version")]
    pub app_version: String,
    #[serde(rename = "original_application_version")]
    pub original_app_version: String,
    #[serde_as(as = "AppStoreDate")]
    #[serde(rename = "receipt_creation_date")]
    pub creation_date: DateTime<Utc>,
    #[serde_as(as = "Option<AppStoreDate>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    /// In payload order.
    #[serde(rename = "in_app", default)]
    pub purchases: Vec<PurchaseEntry>,
}

impl AppReceipt {
    pub fn purchases_for<'a>(
        &'a self,
        product_id: &'a str,
    ) -> impl Iterator<Item = &'a PurchaseEntry> + 'a {
        self.purchases
            .iter()
            .filter(move |p| p.product_id == product_id)
    }

    /// Receipts without an expiration date never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date
            .map(|expiration| now >= expiration)
            .unwrap_or(false)
    }

    /// Subscription entries that grant access at `now`.
    pub fn active_subscriptions_at(
        &self,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &PurchaseEntry> + '_ {
        self.purchases
            .iter()
            .filter(move |p| p.is_subscription_active_at(now))
    }
}
