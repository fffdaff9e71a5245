//! Product records and the field parsers that build them.
//!
//! Every parser is total over its expected input shape and fails fast with a
//! [`FieldParseError`] naming the field and the raw text it rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest rating a product can carry.
pub const MAX_RATING: u8 = 5;

/// One scraped item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub rating: u8,
    pub num_of_reviews: u32,
}

impl Product {
    /// Column order used for persisted rows.
    pub const FIELDS: [&'static str; 5] =
        ["title", "description", "price", "rating", "num_of_reviews"];
}

/// Fields of a [`Product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Price,
    Rating,
    NumOfReviews,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Price => "price",
            Self::Rating => "rating",
            Self::NumOfReviews => "num_of_reviews",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card field that could not be turned into a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldParseError {
    #[error("{field}: nothing matched `{selector}`")]
    Missing { field: Field, selector: String },

    #[error("{field}: cannot parse {raw:?}")]
    Malformed { field: Field, raw: String },

    #[error("{field}: {value} is outside 0..={max}")]
    OutOfRange { field: Field, value: u64, max: u64 },
}

impl FieldParseError {
    pub fn field(&self) -> Field {
        match self {
            Self::Missing { field, .. }
            | Self::Malformed { field, .. }
            | Self::OutOfRange { field, .. } => *field,
        }
    }

    fn malformed(field: Field, raw: &str) -> Self {
        Self::Malformed {
            field,
            raw: raw.to_string(),
        }
    }
}

/// Title text, trimmed. Empty titles are rejected.
pub fn parse_title(raw: &str) -> Result<String, FieldParseError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(FieldParseError::malformed(Field::Title, raw));
    }
    Ok(title.to_string())
}

/// Description text with non-breaking spaces replaced and the ends trimmed.
pub fn parse_description(raw: &str) -> String {
    raw.replace('\u{a0}', " ").trim().to_string()
}

/// Price from currency text such as `$1139.54`.
///
/// A single leading currency symbol is stripped; whatever remains must be a
/// finite, non-negative decimal.
pub fn parse_price(raw: &str) -> Result<f64, FieldParseError> {
    let trimmed = raw.trim();
    let amount = match trimmed.chars().next() {
        Some(c) if !c.is_ascii_digit() && !matches!(c, '.' | '-' | '+') => {
            &trimmed[c.len_utf8()..]
        }
        _ => trimmed,
    };

    let price: f64 = amount
        .trim()
        .parse()
        .map_err(|_| FieldParseError::malformed(Field::Price, raw))?;

    if !price.is_finite() || price < 0.0 {
        return Err(FieldParseError::malformed(Field::Price, raw));
    }
    Ok(price)
}

/// Rating from an explicit numeric attribute value.
pub fn parse_rating_attribute(raw: &str) -> Result<u8, FieldParseError> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| FieldParseError::malformed(Field::Rating, raw))?;
    check_rating(value)
}

/// Rating from the number of star markers on a card.
///
/// Counts above [`MAX_RATING`] are rejected rather than clamped.
pub fn rating_from_star_count(count: usize) -> Result<u8, FieldParseError> {
    check_rating(count as u64)
}

fn check_rating(value: u64) -> Result<u8, FieldParseError> {
    if value > u64::from(MAX_RATING) {
        return Err(FieldParseError::OutOfRange {
            field: Field::Rating,
            value,
            max: u64::from(MAX_RATING),
        });
    }
    Ok(value as u8)
}

/// Review count from text like `"3 reviews"`; only the first token counts.
pub fn parse_num_of_reviews(raw: &str) -> Result<u32, FieldParseError> {
    raw.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| FieldParseError::malformed(Field::NumOfReviews, raw))
}
