//! The validated, normalized representation of one marketplace listing.

use serde::Serialize;

/// One marketplace listing after validation and normalization.
///
/// Records are immutable once built: downstream stages produce new
/// collections instead of mutating in place. Optional numeric fields are
/// either a value inside their domain or absent, never a sentinel; the one
/// exception is `review_count`, where 0 is a legitimate default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    /// Marketplace-unique identifier; the dedup key.
    pub asin: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Current price in the marketplace's currency. Zero or negative source
    /// values arrive here as `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Pre-discount list price, when the listing is on sale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    /// Star rating in [0.0, 5.0].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    pub review_count: u32,
    /// Units bought in the trailing month, when the source reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bought_last_month: Option<u32>,
    pub is_sponsored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_prime: Option<bool>,
    /// Discount in [0, 100], supplied by the source or derived from
    /// `old_price` and `price`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f32>,
    /// 1-based rank within the page it was fetched from. Ordering only,
    /// never identity.
    pub position: u32,
    /// Which requested page produced this record.
    pub source_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ProductRecord {
    /// Fetch order within the whole plan; the dedup tie-break and the final
    /// sort key.
    pub fn fetch_order(&self) -> (u32, u32) {
        (self.source_page, self.position)
    }
}
