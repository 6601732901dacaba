//! Cleaned product row, ready for upsert

use bigdecimal::BigDecimal;

/// One validated, cleaned CSV row keyed on the business identifier.
///
/// `unique_key` is immutable in the products table; all other fields are
/// overwritten on conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub unique_key: String,
    pub product_title: Option<String>,
    pub product_description: Option<String>,
    pub style_no: Option<String>,
    pub mainframe_color: Option<String>,
    pub size: Option<String>,
    pub color_name: Option<String>,
    pub piece_price: Option<BigDecimal>,
}

impl ProductDraft {
    /// Convenience constructor used in tests and fixtures.
    pub fn keyed(unique_key: impl Into<String>) -> Self {
        Self {
            unique_key: unique_key.into(),
            product_title: None,
            product_description: None,
            style_no: None,
            mainframe_color: None,
            size: None,
            color_name: None,
            piece_price: None,
        }
    }
}
