use std::{path::Path, sync::Arc};

use once_cell::sync::OnceCell;
use openssl::x509::{X509Ref, X509};
use tracing::{debug, warn};

use crate::{constants::APPLE_ROOT_CERTIFICATE_RESOURCE, errors::ReceiptError};

static GLOBAL_TRUSTED_ROOT: OnceCell<Arc<TrustedRoot>> = OnceCell::new();

/// The single pinned certificate a receipt's signing chain must terminate
/// at. Read-only once loaded and safe to share between threads.
#[derive(Clone)]
pub struct TrustedRoot {
    certificate: X509,
}

impl std::fmt::Debug for TrustedRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedRoot").finish_non_exhaustive()
    }
}

impl TrustedRoot {
    pub fn from_der(der: &[u8]) -> Result<Self, ReceiptError> {
        let certificate = X509::from_der(der).map_err(|e| {
            warn!(error = %e, "trusted root certificate is not valid DER");
            ReceiptError::RootCertificateNotFound
        })?;
        Ok(Self { certificate })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReceiptError> {
        let path = path.as_ref();
        let der = std::fs::read(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "trusted root certificate is unreadable");
            ReceiptError::RootCertificateNotFound
        })?;
        debug!(path = %path.display(), "loaded trusted root certificate");
        Self::from_der(&der)
    }

    /// Loads the bundled App Store root from an asset directory.
    pub fn from_asset_dir(dir: impl AsRef<Path>) -> Result<Self, ReceiptError> {
        Self::from_file(dir.as_ref().join(APPLE_ROOT_CERTIFICATE_RESOURCE))
    }

    /// Installs the process-wide root. Intended to be called once at
    /// startup; later calls leave the first root in place and return
    /// `false`.
    pub fn install_global(root: TrustedRoot) -> bool {
        GLOBAL_TRUSTED_ROOT.set(Arc::new(root)).is_ok()
    }

    pub fn global() -> Option<Arc<TrustedRoot>> {
        GLOBAL_TRUSTED_ROOT.get().cloned()
    }

    pub(crate) fn certificate(&self) -> &X509Ref {
        &self.certificate
    }
}
