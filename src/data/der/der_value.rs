use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::constants::RECEIPT_DATE_FORMAT;

use super::der_cursor::{DerCursor, DerError, DerObject, Tag};

/// Decodes two's-complement INTEGER content octets into an `i64`.
pub(crate) fn decode_integer(content: &[u8]) -> Result<i64, DerError> {
    let Some(&first) = content.first() else {
        return Err(DerError::EmptyInteger);
    };
    let negative = first & 0x80 != 0;
    let significant = if content.len() > 8 {
        let (padding, rest) = content.split_at(content.len() - 8);
        let fill = if negative { 0xff } else { 0x00 };
        let sign_preserved = (rest[0] & 0x80 != 0) == negative;
        if !padding.iter().all(|&b| b == fill) || !sign_preserved {
            return Err(DerError::IntegerOverflow);
        }
        rest
    } else {
        content
    };
    let seed: i64 = if negative { -1 } else { 0 };
    Ok(significant
        .iter()
        .fold(seed, |acc, &byte| (acc << 8) | i64::from(byte)))
}

/// Reads the next object as an INTEGER.
pub(crate) fn read_integer(cursor: &mut DerCursor<'_>) -> Result<i64, DerError> {
    decode_integer(cursor.expect(Tag::INTEGER)?.value)
}

/// Interprets an attribute value as an encoded INTEGER. A value carrying
/// another tag is treated as absent; an INTEGER that does not fit is an
/// error.
pub(crate) fn integer_attribute(value: &[u8]) -> Result<Option<i64>, DerError> {
    let mut cursor = DerCursor::new(value);
    match cursor.peek_tag()? {
        Some(Tag::INTEGER) => read_integer(&mut cursor).map(Some),
        _ => Ok(None),
    }
}

/// Interprets an attribute value as an encoded UTF8String or IA5String.
/// Any other tag, malformed framing or invalid text is treated as absent.
pub(crate) fn string_attribute(value: &[u8]) -> Option<String> {
    let object = match DerCursor::new(value).next_object() {
        Ok(object) => object,
        Err(e) => {
            debug!(error = %e, "string attribute is not a well-formed object");
            return None;
        }
    };
    decode_string(&object)
}

pub(crate) fn decode_string(object: &DerObject<'_>) -> Option<String> {
    match object.tag {
        Tag::UTF8_STRING => std::str::from_utf8(object.value).ok().map(str::to_owned),
        Tag::IA5_STRING if object.value.is_ascii() => {
            std::str::from_utf8(object.value).ok().map(str::to_owned)
        }
        _ => None,
    }
}

/// Interprets an attribute value as an IA5String timestamp. Dates are
/// advisory: anything unparsable, including the empty string used for
/// absent cancellation dates, becomes `None`.
pub(crate) fn date_attribute(value: &[u8]) -> Option<DateTime<Utc>> {
    let text = string_attribute(value)?;
    parse_receipt_date(&text)
}

pub(crate) fn parse_receipt_date(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(text, RECEIPT_DATE_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => match DateTime::parse_from_rfc3339(text) {
            Ok(date) => Some(date.with_timezone(&Utc)),
            Err(e) => {
                debug!(date = text, error = %e, "ignoring unparsable receipt date");
                None
            }
        },
    }
}

/// Interprets an attribute value as a flag, encoded either as an INTEGER
/// (non-zero is true) or as the strings "true"/"false".
pub(crate) fn bool_attribute(value: &[u8]) -> Result<Option<bool>, DerError> {
    if let Some(number) = integer_attribute(value)? {
        return Ok(Some(number != 0));
    }
    Ok(
        match string_attribute(value).as_deref().map(str::trim) {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            _ => None,
        },
    )
}

/// Content of an OCTET STRING, reassembling BER constructed segments.
pub(crate) fn octet_string_content<'a>(object: &DerObject<'a>) -> Result<Cow<'a, [u8]>, DerError> {
    match object.tag {
        Tag::OCTET_STRING => Ok(Cow::Borrowed(object.value)),
        Tag::OCTET_STRING_CONSTRUCTED => {
            let mut segments = object.children()?;
            let mut content = Vec::with_capacity(object.len());
            while !segments.is_empty() {
                let segment = segments.next_object()?;
                content.extend_from_slice(&octet_string_content(&segment)?);
            }
            Ok(Cow::Owned(content))
        }
        found => Err(DerError::UnexpectedTag {
            expected: Tag::OCTET_STRING,
            found,
            offset: object.value_offset,
        }),
    }
}
