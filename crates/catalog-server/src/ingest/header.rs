//! Header-alias resolution
//!
//! Raw header tokens are normalized (BOM strip, whitespace collapse, trim,
//! uppercase) and matched against a static alias table. Matching is exact
//! string equality on the canonical form; no fuzzy matching.

use serde::{Deserialize, Serialize};

const ALIASES_UNIQUE_KEY: &[&str] = &["UNIQUE_KEY"];
const ALIASES_PRODUCT_TITLE: &[&str] = &["PRODUCT_TITLE", "TITLE"];
const ALIASES_PRODUCT_DESCRIPTION: &[&str] = &["PRODUCT_DESCRIPTION", "DESCRIPTION", "DESC"];
const ALIASES_STYLE_NO: &[&str] = &["STYLE#", "STYLE #", "STYLE"];
const ALIASES_MAINFRAME_COLOR: &[&str] =
    &["SANMAR_MAINFRAME_COLOR", "MAINFRAME_COLOR", "SANMAR_COLOR"];
const ALIASES_SIZE: &[&str] = &["SIZE"];
const ALIASES_COLOR_NAME: &[&str] = &["COLOR_NAME", "COLOR"];
const ALIASES_PIECE_PRICE: &[&str] = &["PIECE_PRICE", "PRICE"];

/// Mapping from canonical field name to zero-based column position.
///
/// Serializes to the `header_map` metadata shape, with `null` for
/// unmatched fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub unique_key: Option<usize>,
    pub product_title: Option<usize>,
    pub product_description: Option<usize>,
    pub style_no: Option<usize>,
    pub mainframe_color: Option<usize>,
    pub size: Option<usize>,
    pub color_name: Option<usize>,
    pub piece_price: Option<usize>,
}

/// Canonical form used for matching: whitespace runs collapsed to a single
/// space, trimmed, upper-cased.
fn canonicalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// First-alias-wins lookup over the normalized header tokens.
fn find(normalized: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(pos) = normalized.iter().position(|h| h == alias) {
            return Some(pos);
        }
    }
    None
}

/// Resolve raw header tokens to a column map.
///
/// A leading byte-order-mark on the first token is stripped before
/// normalization. The caller checks `unique_key` for the mandatory-column
/// rule.
pub fn resolve_columns(headers: &[String]) -> ColumnMap {
    let normalized: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let token = if i == 0 {
                h.strip_prefix('\u{feff}').unwrap_or(h)
            } else {
                h.as_str()
            };
            canonicalize(token)
        })
        .collect();

    ColumnMap {
        unique_key: find(&normalized, ALIASES_UNIQUE_KEY),
        product_title: find(&normalized, ALIASES_PRODUCT_TITLE),
        product_description: find(&normalized, ALIASES_PRODUCT_DESCRIPTION),
        style_no: find(&normalized, ALIASES_STYLE_NO),
        mainframe_color: find(&normalized, ALIASES_MAINFRAME_COLOR),
        size: find(&normalized, ALIASES_SIZE),
        color_name: find(&normalized, ALIASES_COLOR_NAME),
        piece_price: find(&normalized, ALIASES_PIECE_PRICE),
    }
}
