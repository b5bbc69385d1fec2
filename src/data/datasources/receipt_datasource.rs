use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::errors::ReceiptError;

/// Source of raw receipt bytes.
///
/// Implementations must report a missing, unreadable or empty receipt as
/// [`ReceiptError::NoReceiptData`].
pub trait ReceiptDatasource: Send + Sync {
    fn load_receipt(&self) -> Result<Vec<u8>, ReceiptError>;
}

/// Reads the receipt from the app bundle's receipt file.
#[derive(Debug, Clone)]
pub struct FileReceiptDatasource {
    path: PathBuf,
}

impl FileReceiptDatasource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReceiptDatasource for FileReceiptDatasource {
    fn load_receipt(&self) -> Result<Vec<u8>, ReceiptError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "receipt file is unreadable");
            ReceiptError::NoReceiptData
        })?;
        if bytes.is_empty() {
            warn!(path = %self.path.display(), "receipt file is empty");
            return Err(ReceiptError::NoReceiptData);
        }
        debug!(path = %self.path.display(), len = bytes.len(), "loaded receipt");
        Ok(bytes)
    }
}

/// Serves receipt bytes already held in memory, e.g. as posted by a client
/// to a server.
#[derive(Debug, Clone)]
pub struct InMemoryReceiptDatasource {
    bytes: Vec<u8>,
}

impl InMemoryReceiptDatasource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Accepts the base64 `receipt-data` form used by StoreKit clients.
    /// Undecodable input is treated as no receipt at all.
    pub fn from_base64(encoded: &str) -> Result<Self, ReceiptError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            warn!(error = %e, "receipt data is not valid base64");
            ReceiptError::NoReceiptData
        })?;
        Ok(Self::new(bytes))
    }
}

impl ReceiptDatasource for InMemoryReceiptDatasource {
    fn load_receipt(&self) -> Result<Vec<u8>, ReceiptError> {
        if self.bytes.is_empty() {
            return Err(ReceiptError::NoReceiptData);
        }
        Ok(self.bytes.clone())
    }
}
