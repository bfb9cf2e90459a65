//! Product validation, deduplication, filtering, and fetch accounting.
//!
//! This crate turns the raw per-page payloads yielded by the search client
//! into the final analysis set:
//!
//! - [`ProductRecord`]: the validated, normalized listing
//! - [`schema`]: raw JSON item → record, or a [`RejectReason`]
//! - [`brand`]: best-effort brand extraction from titles
//! - [`ResultProcessor`]: validate → dedup → filter → sort pipeline
//! - [`FetchReport`]: what was fetched, dropped, and why
//!
//! Everything here is pure over its inputs; the only async surface is
//! [`ResultProcessor::collect`], which consumes the page event stream.

pub mod brand;
pub mod processor;
pub mod record;
pub mod report;
pub mod schema;

pub use processor::{dedup_by_asin, ListingFilter, ResultProcessor, SearchOutcome};
pub use record::ProductRecord;
pub use report::FetchReport;
pub use schema::{validate_item, RejectReason};
