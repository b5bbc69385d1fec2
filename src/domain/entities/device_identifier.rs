use uuid::Uuid;

/// Bytes identifying this installation, hashed into the receipt's
/// device-binding digest.
///
/// On iOS this is the 16 raw bytes of `identifierForVendor`; on macOS the
/// MAC address of the primary network interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentifier(Vec<u8>);

impl DeviceIdentifier {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.as_bytes().to_vec())
    }

    /// Parses the hyphenated textual form of a vendor identifier.
    pub fn parse_uuid(text: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(text).map(Self::from_uuid)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Uuid> for DeviceIdentifier {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}
