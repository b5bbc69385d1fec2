use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub const RECEIPT_PATH: &str = "IAP_RECEIPT_PATH";
pub const ROOT_CERTIFICATE_PATH: &str = "IAP_ROOT_CERTIFICATE_PATH";
pub const CHECK_CERTIFICATE_TIME: &str = "IAP_CHECK_CERTIFICATE_TIME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration key '{0}'.")]
    MissingKey(&'static str),

    #[error("Invalid value '{value}' for configuration key '{key}'.")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the local validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorConfig {
    /// Where the platform stores the signed receipt.
    pub receipt_path: PathBuf,

    /// DER-encoded trusted root. When unset, the root installed with
    /// [`crate::TrustedRoot::install_global`] is used.
    #[serde(default)]
    pub root_certificate_path: Option<PathBuf>,

    /// Whether certificate validity periods are enforced during chain
    /// verification. App Store intermediates expire while receipts signed
    /// under them stay valid, so some deployments turn this off.
    #[serde(default = "default_check_certificate_time")]
    pub check_certificate_time: bool,
}

fn default_check_certificate_time() -> bool {
    true
}

impl ValidatorConfig {
    pub fn new(receipt_path: impl Into<PathBuf>) -> Self {
        Self {
            receipt_path: receipt_path.into(),
            root_certificate_path: None,
            check_certificate_time: default_check_certificate_time(),
        }
    }

    pub fn with_root_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_certificate_path = Some(path.into());
        self
    }

    pub fn with_check_certificate_time(mut self, check: bool) -> Self {
        self.check_certificate_time = check;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let receipt_path = lookup(RECEIPT_PATH).ok_or(ConfigError::MissingKey(RECEIPT_PATH))?;
        let check_certificate_time = match lookup(CHECK_CERTIFICATE_TIME) {
            None => default_check_certificate_time(),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: CHECK_CERTIFICATE_TIME,
                        value,
                    })
                }
            },
        };
        Ok(Self {
            receipt_path: receipt_path.into(),
            root_certificate_path: lookup(ROOT_CERTIFICATE_PATH).map(PathBuf::from),
            check_certificate_time,
        })
    }
}
