use crate::data::der::{
    der_cursor::{DerCursor, DerError, Tag},
    der_value::read_integer,
};

/// One `ReceiptAttribute ::= SEQUENCE { type INTEGER, version INTEGER,
/// value OCTET STRING }` entry, borrowed from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawAttribute<'a> {
    pub(crate) type_code: i64,
    pub(crate) version: i64,
    pub(crate) value: &'a [u8],
}

impl<'a> RawAttribute<'a> {
    /// Reads the next attribute SEQUENCE from a SET cursor.
    pub(crate) fn take_from(set: &mut DerCursor<'a>) -> Result<Self, DerError> {
        let mut sequence = set.enter(Tag::SEQUENCE)?;
        let type_code = read_integer(&mut sequence)?;
        let version = read_integer(&mut sequence)?;
        let value = sequence.expect(Tag::OCTET_STRING)?.value;
        Ok(Self {
            type_code,
            version,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_from() {
        // SET { SEQUENCE { INTEGER 2, INTEGER 1, OCTET STRING { UTF8String "a" } } }
        let buf = [
            0x31, 0x0c, 0x30, 0x0a, 0x02, 0x01, 0x02, 0x02, 0x01, 0x01, 0x04, 0x02, 0x0c, 0x00,
        ];
        let mut cursor = DerCursor::new(&buf);
        let mut set = cursor.enter(Tag::SET).unwrap();
        let attribute = RawAttribute::take_from(&mut set).unwrap();
        assert_eq!(attribute.type_code, 2);
        assert_eq!(attribute.version, 1);
        assert_eq!(attribute.value, &[0x0c, 0x00]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_take_from_rejects_non_octet_value() {
        // SEQUENCE { INTEGER 2, INTEGER 1, INTEGER 0 }
        let buf = [
            0x31, 0x0b, 0x30, 0x09, 0x02, 0x01, 0x02, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00,
        ];
        let mut cursor = DerCursor::new(&buf);
        let mut set = cursor.enter(Tag::SET).unwrap();
        assert!(matches!(
            RawAttribute::take_from(&mut set),
            Err(DerError::UnexpectedTag { .. })
        ));
    }
}
