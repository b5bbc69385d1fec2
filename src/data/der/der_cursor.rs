//! Bounds-checked reader for the DER/BER subset used by App Store receipts.
//!
//! Every read is checked against the remaining input; malformed input
//! produces a [`DerError`], never a panic or an out-of-bounds read.

use std::fmt;

use thiserror::Error;

use crate::constants::MAX_NESTING_DEPTH;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerError {
    #[error("truncated header at offset {offset}")]
    TruncatedHeader { offset: usize },

    #[error("length {length} at offset {offset} exceeds the {remaining} remaining bytes")]
    Truncated {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    #[error("length field at offset {offset} is not representable")]
    LengthOverflow { offset: usize },

    #[error("tag number at offset {offset} is not representable")]
    TagOverflow { offset: usize },

    #[error("indefinite length on primitive {tag} at offset {offset}")]
    IndefinitePrimitive { tag: Tag, offset: usize },

    #[error("missing end-of-contents for {tag} at offset {offset}")]
    MissingEndOfContents { tag: Tag, offset: usize },

    #[error("unexpected end-of-contents at offset {offset}")]
    UnexpectedEndOfContents { offset: usize },

    #[error("expected {expected} at offset {offset}, found {found}")]
    UnexpectedTag {
        expected: Tag,
        found: Tag,
        offset: usize,
    },

    #[error("expected {expected} at offset {offset}, found end of input")]
    UnexpectedEnd { expected: Tag, offset: usize },

    #[error("{remaining} trailing bytes after the last object")]
    TrailingData { remaining: usize },

    #[error("nesting deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("integer has no content octets")]
    EmptyInteger,

    #[error("integer does not fit in 64 bits")]
    IntegerOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// An identifier octet (or octets) decoded into class, form and number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const END_OF_CONTENTS: Tag = Tag::universal(0, false);
    pub const INTEGER: Tag = Tag::universal(2, false);
    pub const OCTET_STRING: Tag = Tag::universal(4, false);
    pub const OCTET_STRING_CONSTRUCTED: Tag = Tag::universal(4, true);
    pub const OBJECT_IDENTIFIER: Tag = Tag::universal(6, false);
    pub const UTF8_STRING: Tag = Tag::universal(12, false);
    pub const SEQUENCE: Tag = Tag::universal(16, true);
    pub const SET: Tag = Tag::universal(17, true);
    pub const IA5_STRING: Tag = Tag::universal(22, false);

    pub const fn universal(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Universal,
            constructed,
            number,
        }
    }

    pub const fn context(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            constructed,
            number,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match (self.class, self.number) {
            (TagClass::Universal, 0) => Some("END-OF-CONTENTS"),
            (TagClass::Universal, 2) => Some("INTEGER"),
            (TagClass::Universal, 4) => Some("OCTET STRING"),
            (TagClass::Universal, 6) => Some("OBJECT IDENTIFIER"),
            (TagClass::Universal, 12) => Some("UTF8String"),
            (TagClass::Universal, 16) => Some("SEQUENCE"),
            (TagClass::Universal, 17) => Some("SET"),
            (TagClass::Universal, 22) => Some("IA5String"),
            _ => None,
        };
        match name {
            Some(name) => write!(f, "{name}"),
            None => write!(
                f,
                "[{:?} {}{}]",
                self.class,
                self.number,
                if self.constructed { " constructed" } else { "" }
            ),
        }
    }
}

/// One decoded TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerObject<'a> {
    pub tag: Tag,
    /// Content octets. For indefinite-length values this excludes the
    /// trailing end-of-contents marker.
    pub value: &'a [u8],
    /// Offset of the content octets within the cursor's buffer.
    pub value_offset: usize,
    /// The complete encoding: identifier, length, content and, for
    /// indefinite lengths, the end-of-contents marker.
    pub encoded: &'a [u8],
    /// Nesting depth of this object; children of a constructed value live
    /// one level deeper.
    depth: usize,
}

impl<'a> DerObject<'a> {
    /// Cursor over the children of this object.
    pub fn children(&self) -> Result<DerCursor<'a>, DerError> {
        DerCursor::at_depth(self.value, self.depth + 1)
    }

    /// Shorthand for `value.len()`.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Shorthand for `value.is_empty()`.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

enum Length {
    Definite(usize),
    Indefinite,
}

/// A forward-only reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct DerCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> DerCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// A cursor for content found `depth` levels below the outermost
    /// object.
    pub fn at_depth(buf: &'a [u8], depth: usize) -> Result<Self, DerError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DerError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(Self { buf, pos: 0, depth })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), DerError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DerError::TrailingData { remaining }),
        }
    }

    /// Decodes the next object and advances past it.
    pub fn next_object(&mut self) -> Result<DerObject<'a>, DerError> {
        let start = self.pos;
        let (tag, length, header_len) = self.read_header()?;
        if tag == Tag::END_OF_CONTENTS {
            return Err(DerError::UnexpectedEndOfContents { offset: start });
        }
        let value_offset = start + header_len;
        let (value_len, total_len) = match length {
            Length::Definite(length) => {
                let remaining = self.buf.len() - value_offset;
                if length > remaining {
                    return Err(DerError::Truncated {
                        offset: start,
                        length,
                        remaining,
                    });
                }
                (length, header_len + length)
            }
            Length::Indefinite => {
                let value_len = self.indefinite_content_len(tag, value_offset)?;
                // Content plus the two end-of-contents octets.
                (value_len, header_len + value_len + 2)
            }
        };
        self.pos = start + total_len;
        Ok(DerObject {
            tag,
            value: &self.buf[value_offset..value_offset + value_len],
            value_offset,
            encoded: &self.buf[start..start + total_len],
            depth: self.depth,
        })
    }

    /// Tag of the next object, without consuming it.
    pub fn peek_tag(&self) -> Result<Option<Tag>, DerError> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut lookahead = self.clone();
        lookahead.read_tag().map(Some)
    }

    /// Consumes the next object, which must carry `tag`.
    pub fn expect(&mut self, tag: Tag) -> Result<DerObject<'a>, DerError> {
        let offset = self.pos;
        match self.peek_tag()? {
            None => Err(DerError::UnexpectedEnd {
                expected: tag,
                offset,
            }),
            Some(found) if found != tag => Err(DerError::UnexpectedTag {
                expected: tag,
                found,
                offset,
            }),
            Some(_) => self.next_object(),
        }
    }

    /// Consumes the next object only if it carries `tag`.
    pub fn take_optional(&mut self, tag: Tag) -> Result<Option<DerObject<'a>>, DerError> {
        match self.peek_tag()? {
            Some(found) if found == tag => self.next_object().map(Some),
            _ => Ok(None),
        }
    }

    /// Consumes a constructed object carrying `tag` and returns a cursor over
    /// its children.
    pub fn enter(&mut self, tag: Tag) -> Result<DerCursor<'a>, DerError> {
        self.expect(tag)?.children()
    }

    fn read_header(&mut self) -> Result<(Tag, Length, usize), DerError> {
        let start = self.pos;
        let tag = self.read_tag()?;
        let length = self.read_length()?;
        if matches!(length, Length::Indefinite) && !tag.constructed {
            return Err(DerError::IndefinitePrimitive { tag, offset: start });
        }
        Ok((tag, length, self.pos - start))
    }

    fn read_byte(&mut self) -> Result<u8, DerError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(DerError::TruncatedHeader { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_tag(&mut self) -> Result<Tag, DerError> {
        let offset = self.pos;
        let first = self.read_byte()?;
        let class = match first >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let constructed = first & 0x20 != 0;
        let mut number = u32::from(first & 0x1f);
        if number == 0x1f {
            // High-tag-number form: base-128, most significant group first.
            number = 0;
            loop {
                let byte = self.read_byte()?;
                number = number
                    .checked_mul(128)
                    .and_then(|n| n.checked_add(u32::from(byte & 0x7f)))
                    .ok_or(DerError::TagOverflow { offset })?;
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }
        Ok(Tag {
            class,
            constructed,
            number,
        })
    }

    fn read_length(&mut self) -> Result<Length, DerError> {
        let offset = self.pos;
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(Length::Definite(usize::from(first)));
        }
        if first == 0x80 {
            return Ok(Length::Indefinite);
        }
        let count = usize::from(first & 0x7f);
        if first == 0xff || count > std::mem::size_of::<usize>() {
            return Err(DerError::LengthOverflow { offset });
        }
        let mut length: usize = 0;
        for _ in 0..count {
            let byte = self.read_byte()?;
            length = length
                .checked_mul(256)
                .and_then(|l| l.checked_add(usize::from(byte)))
                .ok_or(DerError::LengthOverflow { offset })?;
        }
        Ok(Length::Definite(length))
    }

    /// Walks the children of an indefinite-length value to find its
    /// end-of-contents marker.
    fn indefinite_content_len(&self, tag: Tag, value_offset: usize) -> Result<usize, DerError> {
        let mut children = DerCursor::at_depth(&self.buf[value_offset..], self.depth + 1)?;
        loop {
            match children.buf.get(children.pos..children.pos + 2) {
                Some([0, 0]) => return Ok(children.pos),
                Some(_) => {
                    children.next_object()?;
                }
                None => {
                    return Err(DerError::MissingEndOfContents {
                        tag,
                        offset: value_offset,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_object_short_form() {
        let buf = [0x04, 0x03, b'a', b'b', b'c', 0x02, 0x01, 0x05];
        let mut cursor = DerCursor::new(&buf);
        let first = cursor.next_object().unwrap();
        assert_eq!(first.tag, Tag::OCTET_STRING);
        assert_eq!(first.value, b"abc");
        assert_eq!(first.value_offset, 2);
        assert_eq!(first.encoded, &buf[..5]);
        assert_eq!(cursor.remaining(), 3);
        let second = cursor.next_object().unwrap();
        assert_eq!(second.tag, Tag::INTEGER);
        assert_eq!(second.value, &[0x05]);
        assert!(cursor.is_empty());
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_next_object_long_form_length() {
        let mut buf = vec![0x04, 0x82, 0x01, 0x00];
        buf.extend(std::iter::repeat(0xaa).take(256));
        let mut cursor = DerCursor::new(&buf);
        let object = cursor.next_object().unwrap();
        assert_eq!(object.len(), 256);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_length_exceeding_buffer_is_rejected() {
        let buf = [0x04, 0x05, b'a', b'b'];
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(
            cursor.next_object(),
            Err(DerError::Truncated {
                offset: 0,
                length: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_truncated_headers_are_rejected() {
        for buf in [&[][..], &[0x04][..], &[0x04, 0x82, 0x01][..], &[0x1f, 0x81][..]] {
            let mut cursor = DerCursor::new(buf);
            assert!(
                matches!(
                    cursor.next_object(),
                    Err(DerError::TruncatedHeader { .. })
                ),
                "{buf:02x?}"
            );
        }
    }

    #[test]
    fn test_huge_length_field_is_rejected() {
        let buf = [0x04, 0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(
            cursor.next_object(),
            Err(DerError::LengthOverflow { offset: 1 })
        );

        let buf = [0x04, 0x88, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        let mut cursor = DerCursor::new(&buf);
        assert!(cursor.next_object().is_err());
    }

    #[test]
    fn test_expect_reports_unexpected_tag() {
        let buf = [0x02, 0x01, 0x01];
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(
            cursor.expect(Tag::SEQUENCE),
            Err(DerError::UnexpectedTag {
                expected: Tag::SEQUENCE,
                found: Tag::INTEGER,
                offset: 0
            })
        );
        // Nothing consumed on mismatch.
        assert_eq!(cursor.remaining(), 3);
        assert!(cursor.expect(Tag::INTEGER).is_ok());
        assert_eq!(
            cursor.expect(Tag::INTEGER),
            Err(DerError::UnexpectedEnd {
                expected: Tag::INTEGER,
                offset: 3
            })
        );
    }

    #[test]
    fn test_enter_and_take_optional() {
        // SEQUENCE { [0] { INTEGER 7 }, INTEGER 9 }
        let buf = [0x30, 0x08, 0xa0, 0x03, 0x02, 0x01, 0x07, 0x02, 0x01, 0x09];
        let mut cursor = DerCursor::new(&buf);
        let mut sequence = cursor.enter(Tag::SEQUENCE).unwrap();
        assert_eq!(sequence.depth(), 1);
        assert!(sequence.take_optional(Tag::context(1, true)).unwrap().is_none());
        let mut explicit = sequence.enter(Tag::context(0, true)).unwrap();
        assert_eq!(explicit.expect(Tag::INTEGER).unwrap().value, &[7]);
        assert_eq!(sequence.expect(Tag::INTEGER).unwrap().value, &[9]);
        assert!(sequence.finish().is_ok());
    }

    #[test]
    fn test_indefinite_length_constructed() {
        // SEQUENCE (indefinite) { OCTET STRING "hi", SET (indefinite) { } } EOC
        let buf = [
            0x30, 0x80, 0x04, 0x02, b'h', b'i', 0x31, 0x80, 0x00, 0x00, 0x00, 0x00, 0x02, 0x01,
            0x01,
        ];
        let mut cursor = DerCursor::new(&buf);
        let sequence = cursor.next_object().unwrap();
        assert_eq!(sequence.tag, Tag::SEQUENCE);
        assert_eq!(sequence.value, &buf[2..10]);
        assert_eq!(sequence.encoded, &buf[..12]);
        let mut children = sequence.children().unwrap();
        assert_eq!(children.expect(Tag::OCTET_STRING).unwrap().value, b"hi");
        assert!(children.expect(Tag::SET).unwrap().is_empty());
        assert!(children.finish().is_ok());
        assert_eq!(cursor.expect(Tag::INTEGER).unwrap().value, &[1]);
    }

    #[test]
    fn test_indefinite_length_without_end_of_contents() {
        let buf = [0x30, 0x80, 0x04, 0x01, 0x00];
        let mut cursor = DerCursor::new(&buf);
        assert!(matches!(
            cursor.next_object(),
            Err(DerError::MissingEndOfContents { .. })
        ));
    }

    #[test]
    fn test_indefinite_length_on_primitive_is_rejected() {
        let buf = [0x04, 0x80, 0x00, 0x00];
        let mut cursor = DerCursor::new(&buf);
        assert!(matches!(
            cursor.next_object(),
            Err(DerError::IndefinitePrimitive { .. })
        ));
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        // 20 nested indefinite-length SEQUENCEs, properly terminated.
        let depth = MAX_NESTING_DEPTH + 4;
        let mut buf = Vec::new();
        for _ in 0..depth {
            buf.extend([0x30, 0x80]);
        }
        for _ in 0..depth {
            buf.extend([0x00, 0x00]);
        }
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(
            cursor.next_object(),
            Err(DerError::NestingTooDeep {
                max: MAX_NESTING_DEPTH
            })
        );
    }

    #[test]
    fn test_high_tag_number() {
        let buf = [0x9f, 0x81, 0x00, 0x01, 0xaa];
        let mut cursor = DerCursor::new(&buf);
        let object = cursor.next_object().unwrap();
        assert_eq!(object.tag, Tag::context(128, false));
        assert_eq!(object.value, &[0xaa]);
    }

    #[test]
    fn test_stray_end_of_contents() {
        let buf = [0x00, 0x00];
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(
            cursor.next_object(),
            Err(DerError::UnexpectedEndOfContents { offset: 0 })
        );
    }

    #[test]
    fn test_every_truncation_fails_cleanly() {
        // SEQUENCE { INTEGER 1, OCTET STRING "abc" }
        let buf = [0x30, 0x08, 0x02, 0x01, 0x01, 0x04, 0x03, b'a', b'b', b'c'];
        for end in 0..buf.len() {
            let mut cursor = DerCursor::new(&buf[..end]);
            assert!(cursor.next_object().is_err(), "prefix of {end} bytes");
        }
    }
}
