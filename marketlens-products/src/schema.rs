//! Validation and normalization of raw listing payloads.
//!
//! The wire format is a loosely-typed JSON object; nothing about field
//! presence or type is trusted. [`validate_item`] is the single place a raw
//! item becomes a [`ProductRecord`] or a [`RejectReason`]. Rejections are
//! data for the fetch report, not errors that propagate.

use serde_json::Value;
use thiserror::Error;

use crate::brand;
use crate::record::ProductRecord;

/// Why a raw item was dropped at validation.
///
/// Ordering exists so per-reason counts can live in a `BTreeMap` with a
/// stable display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
pub enum RejectReason {
    /// `asin` missing, empty, or not a string.
    #[error("missing identifier")]
    MissingIdentifier,
    /// `title` missing or empty after whitespace normalization.
    #[error("missing title")]
    MissingTitle,
    /// Numeric `rating` outside [0, 5].
    #[error("rating out of range")]
    OutOfRangeRating,
    /// Numeric `discount_percent` outside [0, 100].
    #[error("discount out of range")]
    OutOfRangeDiscount,
    /// Review count numeric but not representable as a `u32`.
    #[error("review count out of range")]
    OutOfRangeReviewCount,
    /// A price field carries a structurally impossible JSON type
    /// (array, object, boolean).
    #[error("malformed price")]
    MalformedPrice,
}

/// Validate and normalize one raw item into a [`ProductRecord`].
///
/// `fallback_position` (1-based index within the page) stands in when the
/// source omits `position` or supplies an unusable one.
///
/// Domain violations reject the whole item: a rating or discount outside its
/// range signals a data-source error, not a valid edge case. Absences stay
/// recoverable: an unparseable price *string* becomes an absent price, and a
/// non-numeric review count becomes 0.
pub fn validate_item(
    raw: &Value,
    source_page: u32,
    fallback_position: u32,
) -> Result<ProductRecord, RejectReason> {
    let asin = raw
        .get("asin")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RejectReason::MissingIdentifier)?
        .to_string();

    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .ok_or(RejectReason::MissingTitle)?;

    let price = listing_price(raw, "extracted_price", "price")?;
    let old_price = listing_price(raw, "extracted_old_price", "old_price")?;

    let rating = match raw.get("rating").and_then(Value::as_f64) {
        Some(r) if (0.0..=5.0).contains(&r) => Some(r as f32),
        Some(_) => return Err(RejectReason::OutOfRangeRating),
        None => None,
    };

    let discount_percent = match raw.get("discount_percent").and_then(Value::as_f64) {
        Some(d) if (0.0..=100.0).contains(&d) => Some(d as f32),
        Some(_) => return Err(RejectReason::OutOfRangeDiscount),
        None => derive_discount(price, old_price),
    };

    let review_count = match raw.get("reviews") {
        None | Some(Value::Null) => 0,
        Some(v) => coerce_reviews(v)?,
    };

    let brand = raw
        .get("brand")
        .and_then(Value::as_str)
        .filter(|s| !placeholder_brand(s))
        .and_then(brand::tidy)
        .or_else(|| brand::extract(&title));

    let position = raw
        .get("position")
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p > 0)
        .unwrap_or(fallback_position);

    // Passthrough fields; junk shapes degrade to absent, never to a reject.
    let bought_last_month = raw
        .get("bought_last_month")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    let thumbnail = clean_url(raw.get("thumbnail"));
    let link = ["link_clean", "link"]
        .iter()
        .find_map(|key| clean_url(raw.get(*key)));

    Ok(ProductRecord {
        asin,
        title,
        brand,
        price,
        old_price,
        rating,
        review_count,
        bought_last_month,
        is_sponsored: raw.get("sponsored").and_then(Value::as_bool).unwrap_or(false),
        is_prime: raw.get("prime").and_then(Value::as_bool),
        discount_percent,
        position,
        source_page,
        thumbnail,
        link,
    })
}

fn clean_url(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a price from the pre-parsed numeric field when present (non-null),
/// falling back to the display string field. Zero and negative values are
/// treated as absent, not as free products.
fn listing_price(raw: &Value, extracted: &str, display: &str) -> Result<Option<f64>, RejectReason> {
    match raw.get(extracted) {
        None | Some(Value::Null) => {}
        Some(v) => return price_from(v),
    }
    match raw.get(display) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => price_from(v),
    }
}

fn price_from(v: &Value) -> Result<Option<f64>, RejectReason> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64().filter(|p| *p > 0.0)),
        Value::String(s) => Ok(parse_currency(s)),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(RejectReason::MalformedPrice),
    }
}

/// Parse a currency-formatted display string ("$1,299.99", "1.299,99 €").
///
/// Everything but digits and separators is stripped. When both `.` and `,`
/// appear, the right-most one is the decimal mark; a lone comma is a decimal
/// mark only when exactly two digits follow it. Parse failure is an absent
/// price, never a rejection.
fn parse_currency(s: &str) -> Option<f64> {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if kept.is_empty() {
        return None;
    }

    let dot = kept.rfind('.');
    let comma = kept.rfind(',');
    let normalized = match (dot, comma) {
        (Some(d), Some(c)) if d > c => kept.replace(',', ""),
        (Some(_), Some(_)) => kept.replace('.', "").replace(',', "."),
        (None, Some(c)) if kept.len() - c - 1 == 2 => kept.replace(',', "."),
        (None, Some(_)) => kept.replace(',', ""),
        _ => kept,
    };

    let value = normalized.parse::<f64>().ok()?;
    (value > 0.0).then_some(value)
}

fn derive_discount(price: Option<f64>, old_price: Option<f64>) -> Option<f32> {
    let (price, old) = (price?, old_price?);
    if old <= price {
        return None;
    }
    let pct = (old - price) / old * 100.0;
    Some(((pct * 10.0).round() / 10.0) as f32)
}

/// Coerce a present review count. Negatives and non-numeric strings are a
/// recoverable 0; a numeric value beyond `u32` is a data-source error.
fn coerce_reviews(v: &Value) -> Result<u32, RejectReason> {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).map_err(|_| RejectReason::OutOfRangeReviewCount)
            } else if n.as_i64().is_some() {
                Ok(0)
            } else if let Some(f) = n.as_f64() {
                if f < 0.0 {
                    Ok(0)
                } else if f > f64::from(u32::MAX) {
                    Err(RejectReason::OutOfRangeReviewCount)
                } else {
                    Ok(f as u32)
                }
            } else {
                Ok(0)
            }
        }
        Value::String(s) => match s.trim().replace(',', "").parse::<i64>() {
            Ok(n) if n < 0 => Ok(0),
            Ok(n) => u32::try_from(n).map_err(|_| RejectReason::OutOfRangeReviewCount),
            Err(_) => Ok(0),
        },
        _ => Ok(0),
    }
}

fn placeholder_brand(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "" | "unknown" | "n/a" | "none"
    )
}
