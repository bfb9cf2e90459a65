//! Search client for MarketLens: paginated product searches via SerpAPI.
//!
//! - [`SerpApiClient`]: Amazon-engine searches with per-page retry
//! - [`FetchError`]: transient / quota / permanent failure classification
//! - [`RetryPolicy`]: retry budget and backoff shape
//!
//! Pages are yielded lazily as [`marketlens_common::PageEvent`]s, one request
//! in flight at a time. A failed page ends the stream with a failure marker;
//! pages already yielded are never discarded because of a later failure.

pub mod error;
pub mod retry;
pub mod serpapi;

pub use error::FetchError;
pub use retry::RetryPolicy;
pub use serpapi::client::SerpApiClient;
pub use serpapi::types::AccountInfo;
