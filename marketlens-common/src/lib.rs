//! Common types and utilities shared across MarketLens crates.
//!
//! This crate defines the marketplace vocabulary, the validated fetch plan,
//! the per-page event types exchanged between the search client and the
//! result processor, and observability helpers. It is intentionally
//! lightweight so that all crates can depend on it without heavy transitive
//! costs.
//!
//! # Overview
//!
//! - [`Marketplace`]: closed set of supported Amazon storefronts
//! - [`FetchPlan`]: validated search term + marketplace + page count
//! - [`PageEvent`], [`SearchPage`], [`PageFailure`]: per-page fetch outcomes
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use marketlens_common::{FetchPlan, Marketplace};
//!
//! let plan = FetchPlan::new("wireless earbuds", Marketplace::Us, 2).unwrap();
//! assert_eq!(plan.marketplace.as_domain(), "amazon.com");
//! assert_eq!(plan.pages, 2);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod observability;

/// Hard cap on the number of result pages a single plan may request.
pub const MAX_PAGES: u32 = 5;

/// A supported Amazon storefront.
///
/// The set is closed: requests against any other domain are rejected before
/// a single byte goes over the wire.
///
/// ```rust
/// use marketlens_common::Marketplace;
///
/// let mp: Marketplace = "amazon.de".parse().unwrap();
/// assert_eq!(mp, Marketplace::De);
/// assert_eq!(mp.currency_symbol(), "€");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marketplace {
    #[serde(rename = "amazon.com")]
    Us,
    #[serde(rename = "amazon.co.uk")]
    Uk,
    #[serde(rename = "amazon.de")]
    De,
    #[serde(rename = "amazon.fr")]
    Fr,
    #[serde(rename = "amazon.ca")]
    Ca,
    #[serde(rename = "amazon.es")]
    Es,
    #[serde(rename = "amazon.it")]
    It,
    #[serde(rename = "amazon.co.jp")]
    Jp,
    #[serde(rename = "amazon.com.au")]
    Au,
    #[serde(rename = "amazon.in")]
    In,
    #[serde(rename = "amazon.com.br")]
    Br,
    #[serde(rename = "amazon.com.mx")]
    Mx,
}

impl Marketplace {
    /// Every supported storefront, in display order.
    pub const ALL: [Marketplace; 12] = [
        Marketplace::Us,
        Marketplace::Uk,
        Marketplace::De,
        Marketplace::Fr,
        Marketplace::Ca,
        Marketplace::Es,
        Marketplace::It,
        Marketplace::Jp,
        Marketplace::Au,
        Marketplace::In,
        Marketplace::Br,
        Marketplace::Mx,
    ];

    /// Domain string as the search API expects it (`amazon_domain` parameter).
    pub fn as_domain(&self) -> &'static str {
        match self {
            Marketplace::Us => "amazon.com",
            Marketplace::Uk => "amazon.co.uk",
            Marketplace::De => "amazon.de",
            Marketplace::Fr => "amazon.fr",
            Marketplace::Ca => "amazon.ca",
            Marketplace::Es => "amazon.es",
            Marketplace::It => "amazon.it",
            Marketplace::Jp => "amazon.co.jp",
            Marketplace::Au => "amazon.com.au",
            Marketplace::In => "amazon.in",
            Marketplace::Br => "amazon.com.br",
            Marketplace::Mx => "amazon.com.mx",
        }
    }

    /// Currency symbol for listing prices on this storefront.
    pub fn currency_symbol(&self) -> &'static str {
        match self {
            Marketplace::Us => "$",
            Marketplace::Uk => "£",
            Marketplace::De | Marketplace::Fr | Marketplace::Es | Marketplace::It => "€",
            Marketplace::Ca => "C$",
            Marketplace::Jp => "¥",
            Marketplace::Au => "A$",
            Marketplace::In => "₹",
            Marketplace::Br => "R$",
            Marketplace::Mx => "MX$",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_domain())
    }
}

impl FromStr for Marketplace {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Marketplace::ALL
            .iter()
            .copied()
            .find(|mp| mp.as_domain() == wanted)
            .ok_or_else(|| PlanError::UnknownMarketplace(s.trim().to_string()))
    }
}

/// Errors raised while validating a [`FetchPlan`].
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("search term must not be empty")]
    EmptyTerm,
    #[error("page count must be at least 1")]
    ZeroPages,
    #[error("unknown marketplace '{0}', expected one of the supported amazon domains")]
    UnknownMarketplace(String),
}

/// A validated fetch request: what to search, where, and how many pages.
///
/// Construction is the single place inbound parameters are checked, so the
/// client and processor can trust the plan they are handed.
///
/// ```rust
/// use marketlens_common::{FetchPlan, Marketplace, PlanError};
///
/// let plan = FetchPlan::new("  usb hub  ", Marketplace::Uk, 3).unwrap();
/// assert_eq!(plan.term, "usb hub");
///
/// assert!(matches!(
///     FetchPlan::new("   ", Marketplace::Uk, 3),
///     Err(PlanError::EmptyTerm)
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub term: String,
    pub marketplace: Marketplace,
    pub pages: u32,
}

impl FetchPlan {
    /// Validate and normalize the inbound parameters.
    ///
    /// The term is trimmed and must be non-empty; `pages` must be positive
    /// and is clamped to [`MAX_PAGES`] with a warning when above it.
    pub fn new(
        term: impl Into<String>,
        marketplace: Marketplace,
        pages: u32,
    ) -> Result<Self, PlanError> {
        let term = term.into().trim().to_string();
        if term.is_empty() {
            return Err(PlanError::EmptyTerm);
        }
        if pages == 0 {
            return Err(PlanError::ZeroPages);
        }
        let capped = if pages > MAX_PAGES {
            tracing::warn!(requested = pages, cap = MAX_PAGES, "plan.pages_clamped");
            MAX_PAGES
        } else {
            pages
        };
        Ok(Self {
            term,
            marketplace,
            pages: capped,
        })
    }
}

/// One successfully fetched result page: the raw, still-unvalidated items.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// 1-based page number within the plan.
    pub page: u32,
    /// Raw item payloads exactly as the API returned them.
    pub items: Vec<serde_json::Value>,
}

/// Category of a terminal page failure, used for caller remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retried up to the budget and still failing (timeouts, 5xx).
    Transient,
    /// API usage limits exhausted; retrying now will not help.
    Quota,
    /// Will not resolve on retry (bad credentials, invalid input).
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Transient => "transient",
            FailureKind::Quota => "quota",
            FailureKind::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

/// Terminal failure marker for one page of a plan.
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub page: u32,
    pub kind: FailureKind,
    /// Total request attempts made for this page, retries included.
    pub attempts: u32,
    pub message: String,
}

/// What the search client yields for each page of a plan.
///
/// A `Failed` event is always the last one: the client never continues past
/// a failed page, but everything fetched before it has already been yielded.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Page(SearchPage),
    Failed(PageFailure),
}
