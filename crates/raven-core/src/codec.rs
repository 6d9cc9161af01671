//! Wire-level primitives of the WAA2WLS response token.
//!
//! Contract:
//! - splitting, percent escapes, signature alphabet and timestamps only
//! - no knowledge of field meaning or protocol versions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{WlsError, WlsResult};

/// Field separator of the response token.
pub const SEPARATOR: char = '!';

/// Length of a `YYYYMMDDThhmmssZ` timestamp.
pub const TIMESTAMP_LEN: usize = 16;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Characters a producer must escape inside a field value.
const FIELD_ESCAPES: &AsciiSet = &CONTROLS.add(b'!').add(b'%');

/// A tokenized response: the raw (still escaped) slices next to their
/// decoded values, index for index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields<'a> {
    raw: Vec<&'a str>,
    decoded: Vec<String>,
}

impl<'a> Fields<'a> {
    /// Number of fields, including the version.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Field as it appeared on the wire.
    pub fn raw(&self, index: usize) -> Option<&'a str> {
        self.raw.get(index).copied()
    }

    /// Field after percent-decoding.
    pub fn decoded(&self, index: usize) -> Option<&str> {
        self.decoded.get(index).map(String::as_str)
    }

    /// Raw slices `0..end`, as needed to rebuild signed bytes.
    pub fn raw_prefix(&self, end: usize) -> &[&'a str] {
        &self.raw[..end.min(self.raw.len())]
    }
}

/// Split a response token on `!` and percent-decode every field.
pub fn tokenize(raw: &str) -> WlsResult<Fields<'_>> {
    let raw: Vec<&str> = raw.split(SEPARATOR).collect();
    let decoded = raw
        .iter()
        .enumerate()
        .map(|(index, field)| {
            percent_decode_field(field).map_err(|e| {
                WlsError::malformed(format!("field {index}: {}", e.detail))
            })
        })
        .collect::<WlsResult<Vec<_>>>()?;

    Ok(Fields { raw, decoded })
}

/// Decode `%XX` escapes in a single field.
///
/// A `%` not followed by two hex digits, or escapes that do not decode to
/// UTF-8, are rejected.
pub fn percent_decode_field(field: &str) -> WlsResult<String> {
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            match escape {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return Err(WlsError::malformed("bad percent escape")),
            }
        } else {
            i += 1;
        }
    }

    percent_decode_str(field)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| WlsError::malformed("percent escapes do not decode to UTF-8"))
}

/// Escape `!`, `%` and control characters so a value survives the join.
pub fn percent_encode_field(value: &str) -> String {
    utf8_percent_encode(value, FIELD_ESCAPES).to_string()
}

/// Decode a signature written in the Raven base64 alphabet
/// (`-` `.` `_` standing for `+` `/` `=`).
pub fn decode_signature(field: &str) -> WlsResult<Vec<u8>> {
    let mut standard = String::with_capacity(field.len());
    for c in field.chars() {
        standard.push(match c {
            '-' => '+',
            '.' => '/',
            '_' => '=',
            '+' | '/' | '=' => {
                return Err(WlsError::malformed(format!(
                    "bad signature encoding: '{c}' is not in the Raven alphabet"
                )))
            }
            other => other,
        });
    }

    BASE64
        .decode(standard)
        .map_err(|e| WlsError::malformed(format!("bad signature encoding: {e}")))
}

/// Encode signature bytes in the Raven base64 alphabet.
pub fn encode_signature(bytes: &[u8]) -> String {
    BASE64
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '.',
            '=' => '_',
            other => other,
        })
        .collect()
}

/// Parse a `YYYYMMDDThhmmssZ` UTC timestamp.
pub fn parse_timestamp(s: &str) -> WlsResult<DateTime<Utc>> {
    let bad = || WlsError::malformed(format!("bad timestamp: {s:?}"));

    let bytes = s.as_bytes();
    if bytes.len() != TIMESTAMP_LEN || bytes[8] != b'T' || bytes[15] != b'Z' {
        return Err(bad());
    }
    let all_digits = bytes[..8]
        .iter()
        .chain(&bytes[9..15])
        .all(u8::is_ascii_digit);
    if !all_digits {
        return Err(bad());
    }

    // Every slice below is ASCII digits, so the parses cannot fail.
    let num = |range: std::ops::Range<usize>| s[range].parse::<u32>().unwrap_or(u32::MAX);
    let year = i32::try_from(num(0..4)).map_err(|_| bad())?;
    let date = NaiveDate::from_ymd_opt(year, num(4..6), num(6..8)).ok_or_else(bad)?;
    let time = NaiveTime::from_hms_opt(num(9..11), num(11..13), num(13..15)).ok_or_else(bad)?;

    Ok(NaiveDateTime::new(date, time).and_utc())
}

/// Format a time as `YYYYMMDDThhmmssZ`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_tokenize_keeps_raw_and_decoded() {
        let fields = tokenize("3!200!a%21b!x%25y").unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields.raw(2), Some("a%21b"));
        assert_eq!(fields.decoded(2), Some("a!b"));
        assert_eq!(fields.raw(3), Some("x%25y"));
        assert_eq!(fields.decoded(3), Some("x%y"));
        assert_eq!(fields.raw_prefix(2), &["3", "200"]);
    }

    #[test]
    fn test_tokenize_empty_fields() {
        let fields = tokenize("1!!").unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.decoded(1), Some(""));
        assert_eq!(fields.decoded(2), Some(""));
    }

    #[test]
    fn test_tokenize_rejects_bad_escape() {
        let err = tokenize("3!200!oops%2").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.detail.contains("field 2"));

        assert!(tokenize("3!%zz").unwrap_err().is_malformed());
        assert!(tokenize("3!%").unwrap_err().is_malformed());
    }

    #[test]
    fn test_tokenize_rejects_non_utf8_escape() {
        assert!(tokenize("3!%ff%fe").unwrap_err().is_malformed());
    }

    #[test]
    fn test_percent_encode_field_escapes_separator() {
        assert_eq!(percent_encode_field("a!b%c"), "a%21b%25c");
        assert_eq!(percent_encode_field("plain text"), "plain text");
        assert_eq!(
            percent_decode_field(&percent_encode_field("50%!")).unwrap(),
            "50%!"
        );
    }

    #[test]
    fn test_decode_signature_translates_alphabet() {
        // 0xfb 0xff 0xbf encodes to "+/+/" in standard base64
        assert_eq!(decode_signature("-.-.").unwrap(), vec![0xfb, 0xff, 0xbf]);
        assert_eq!(decode_signature("YQ__").unwrap(), b"a".to_vec());
    }

    #[test]
    fn test_decode_signature_rejects_standard_alphabet() {
        let err = decode_signature("YQ==").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.detail.contains("bad signature encoding"));
    }

    #[test]
    fn test_decode_signature_rejects_bad_padding() {
        assert!(decode_signature("YQ_").unwrap_err().is_malformed());
        assert!(decode_signature("Y").unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_timestamp() {
        let t = parse_timestamp("20110729T123456Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2011, 7, 29, 12, 34, 56).unwrap());
        assert_eq!(format_timestamp(&t), "20110729T123456Z");
    }

    #[test]
    fn test_parse_timestamp_rejects_wrong_shape() {
        for bad in [
            "",
            "20110729T123456",
            "20110729T123456Z0",
            "20110729 123456Z",
            "20110729T123456z",
            "2011-07-29T12:34Z",
            "2011072xT123456Z",
            "+0110729T123456Z",
        ] {
            let err = parse_timestamp(bad).unwrap_err();
            assert!(err.is_malformed(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_impossible_dates() {
        for bad in [
            "20110230T000000Z",
            "20111301T000000Z",
            "20110729T240000Z",
            "20110729T236000Z",
            "20110729T235960Z",
        ] {
            assert!(parse_timestamp(bad).is_err(), "accepted {bad:?}");
        }
        assert!(parse_timestamp("20120229T000000Z").is_ok());
    }

    proptest! {
        #[test]
        fn test_signature_alphabet_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            let encoded = encode_signature(&bytes);
            prop_assert!(!encoded.contains(['+', '/', '=']));
            prop_assert_eq!(decode_signature(&encoded).unwrap(), bytes);
        }

        #[test]
        fn test_tokenize_never_panics(raw in "\\PC*") {
            let _ = tokenize(&raw);
        }

        #[test]
        fn test_field_escape_roundtrip(value in "\\PC*") {
            let encoded = percent_encode_field(&value);
            prop_assert!(!encoded.contains('!'));
            prop_assert_eq!(percent_decode_field(&encoded).unwrap(), value);
        }
    }
}
