//! Per-field row cleaning and validation
//!
//! Text fields are coerced to UTF-8 through a fixed, ordered encoding
//! candidate list (first successful decode wins, heuristic on purpose,
//! kept reproducible), stripped of Unicode "other" category characters
//! except tab/newline/carriage-return, and trimmed. The price field is
//! reduced to digits, decimal point and minus sign, then normalized to
//! exactly two fractional digits.

use bigdecimal::{BigDecimal, RoundingMode};
use csv_async::ByteRecord;
use encoding_rs::UTF_8;
use regex::Regex;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::LazyLock;

use super::header::ColumnMap;
use crate::models::ProductDraft;

/// Unicode category C (control/format/unassigned/private-use) minus the
/// whitespace characters the cleaner preserves.
static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{C}--[\t\n\r]]").expect("control character class is valid")
});

/// Characters allowed to survive in a raw price value.
fn is_price_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

/// Decode raw field bytes: strict UTF-8 first, then ISO-8859-1.
///
/// Latin-1 maps every byte directly to U+0000..U+00FF, so the chain never
/// fails. Bytes 0x80-0x9F decode to C1 control characters, which the
/// control strip below removes; they are not reinterpreted as Windows-1252
/// punctuation.
pub fn decode_text(raw: &[u8]) -> Cow<'_, str> {
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(raw) {
        return text;
    }
    raw.iter().map(|&b| char::from(b)).collect::<String>().into()
}

/// Clean one text field: decode, strip control/format characters, trim.
///
/// An absent field stays absent; an empty field cleans to an empty string.
pub fn clean_text(raw: Option<&[u8]>) -> Option<String> {
    let raw = raw?;
    let decoded = decode_text(raw);
    let stripped = CONTROL_CHARS.replace_all(&decoded, "");
    Some(stripped.trim().to_string())
}

/// Normalize a raw price value to a two-decimal-place number.
///
/// Currency symbols and thousands separators are discarded without locale
/// awareness; anything that does not parse as a number afterwards becomes
/// null rather than an error. Excess fractional digits truncate toward
/// zero.
pub fn normalize_price(raw: Option<&[u8]>) -> Option<BigDecimal> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    let decoded = decode_text(raw);
    let filtered: String = decoded.chars().filter(|&c| is_price_char(c)).collect();
    let value = BigDecimal::from_str(&filtered).ok()?;
    Some(value.with_scale_round(2, RoundingMode::Down))
}

fn cell<'r>(record: &'r ByteRecord, index: Option<usize>) -> Option<&'r [u8]> {
    index.and_then(|i| record.get(i))
}

/// Clean one raw row against the resolved column map.
///
/// Returns `None` when the cleaned business key is absent or empty; the
/// row is then counted as failed and excluded from the batch. Missing
/// trailing fields (short rows) are treated as absent.
pub fn clean_row(record: &ByteRecord, map: &ColumnMap) -> Option<ProductDraft> {
    let unique_key = clean_text(cell(record, map.unique_key)).filter(|k| !k.is_empty())?;

    Some(ProductDraft {
        unique_key,
        product_title: clean_text(cell(record, map.product_title)),
        product_description: clean_text(cell(record, map.product_description)),
        style_no: clean_text(cell(record, map.style_no)),
        mainframe_color: clean_text(cell(record, map.mainframe_color)),
        size: clean_text(cell(record, map.size)),
        color_name: clean_text(cell(record, map.color_name)),
        piece_price: normalize_price(cell(record, map.piece_price)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(raw: &str) -> Option<String> {
        normalize_price(Some(raw.as_bytes())).map(|d| d.to_string())
    }

    #[test]
    fn test_price_discards_currency_and_separators() {
        assert_eq!(price("$1,234.5").as_deref(), Some("1234.50"));
    }

    #[test]
    fn test_price_non_numeric_is_null_not_error() {
        assert_eq!(price("N/A"), None);
        assert_eq!(price("free"), None);
        assert_eq!(price("1.2.3"), None);
    }

    #[test]
    fn test_price_excess_digits_truncate() {
        assert_eq!(price("19.999").as_deref(), Some("19.99"));
        assert_eq!(price("-19.999").as_deref(), Some("-19.99"));
    }

    #[test]
    fn test_price_pads_to_two_decimals() {
        assert_eq!(price("5").as_deref(), Some("5.00"));
        assert_eq!(price("7.5").as_deref(), Some("7.50"));
    }

    #[test]
    fn test_price_absent_or_empty_is_null() {
        assert_eq!(normalize_price(None), None);
        assert_eq!(normalize_price(Some(b"")), None);
        assert_eq!(price("   "), None);
    }

    #[test]
    fn test_clean_text_strips_control_characters() {
        assert_eq!(
            clean_text(Some(b"Shi\x00rt\x07")).as_deref(),
            Some("Shirt")
        );
        // Zero-width space is a format character (Cf) and is removed.
        assert_eq!(
            clean_text(Some("Ha\u{200B}t".as_bytes())).as_deref(),
            Some("Hat")
        );
    }

    #[test]
    fn test_clean_text_keeps_interior_whitespace() {
        assert_eq!(
            clean_text(Some(b"  Classic\tTee \r\n")).as_deref(),
            Some("Classic\tTee")
        );
    }

    #[test]
    fn test_clean_text_decodes_latin1_fallback() {
        // 0xE9 is not valid UTF-8; Latin-1 maps it to e-acute.
        assert_eq!(clean_text(Some(&[0x43, 0x61, 0x66, 0xE9])).as_deref(), Some("Caf\u{e9}"));
    }

    #[test]
    fn test_clean_text_strips_c1_range_bytes() {
        // 0x93/0x94 are invalid UTF-8; Latin-1 decodes them to C1 control
        // characters, which the control strip removes. They must not
        // survive as Windows-1252 curly quotes.
        assert_eq!(
            clean_text(Some(&[0x93, b'H', b'i', 0x94])).as_deref(),
            Some("Hi")
        );
        // Same for the 0x80 (euro in Windows-1252) and 0x97 (em-dash) slots.
        assert_eq!(
            clean_text(Some(&[b'a', 0x80, 0x97, b'b'])).as_deref(),
            Some("ab")
        );
    }

    #[test]
    fn test_clean_text_utf8_first() {
        assert_eq!(
            clean_text(Some("Café".as_bytes())).as_deref(),
            Some("Café")
        );
    }

    #[test]
    fn test_clean_row_missing_key_is_invalid() {
        let map = ColumnMap {
            unique_key: Some(0),
            product_title: Some(1),
            ..Default::default()
        };

        let record = ByteRecord::from(vec!["", "Hat"]);
        assert!(clean_row(&record, &map).is_none());

        let record = ByteRecord::from(vec!["   ", "Hat"]);
        assert!(clean_row(&record, &map).is_none());
    }

    #[test]
    fn test_clean_row_short_row_treats_missing_fields_as_absent() {
        let map = ColumnMap {
            unique_key: Some(0),
            product_title: Some(1),
            piece_price: Some(2),
            ..Default::default()
        };

        let record = ByteRecord::from(vec!["A1"]);
        let draft = clean_row(&record, &map).unwrap();
        assert_eq!(draft.unique_key, "A1");
        assert_eq!(draft.product_title, None);
        assert_eq!(draft.piece_price, None);
    }

    #[test]
    fn test_clean_row_full() {
        let map = ColumnMap {
            unique_key: Some(0),
            product_title: Some(1),
            piece_price: Some(2),
            ..Default::default()
        };

        let record = ByteRecord::from(vec![" A1 ", "Shirt", "19.999"]);
        let draft = clean_row(&record, &map).unwrap();
        assert_eq!(draft.unique_key, "A1");
        assert_eq!(draft.product_title.as_deref(), Some("Shirt"));
        assert_eq!(draft.piece_price.unwrap().to_string(), "19.99");
    }
}
