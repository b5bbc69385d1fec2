use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

const APP_STORE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const APP_STORE_DATE_ZONE: &str = " Etc/GMT";

/// The date layout of App Store JSON receipts, `yyyy-MM-dd HH:mm:ss
/// Etc/GMT`.
///
/// RFC 3339 timestamps are also accepted when deserializing.
pub(crate) struct AppStoreDate;

impl SerializeAs<DateTime<Utc>> for AppStoreDate {
    fn serialize_as<S>(source: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!(
            "{}{APP_STORE_DATE_ZONE}",
            source.format(APP_STORE_DATE_FORMAT)
        ))
    }
}

impl<'de> DeserializeAs<'de, DateTime<Utc>> for AppStoreDate {
    fn deserialize_as<D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_app_store_date(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid App Store date '{text}'")))
    }
}

fn parse_app_store_date(text: &str) -> Option<DateTime<Utc>> {
    match text.strip_suffix(APP_STORE_DATE_ZONE) {
        Some(local) => NaiveDateTime::parse_from_str(local, APP_STORE_DATE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc()),
        None => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|date| date.with_timezone(&Utc)),
    }
}
