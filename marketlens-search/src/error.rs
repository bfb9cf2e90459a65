//! Fetch failure taxonomy.
//!
//! Classification is the load-bearing decision here: transient failures are
//! retried, permanent ones stop the page immediately, and quota exhaustion
//! stops with its own signal because the caller's remediation differs
//! (retry later vs. fix credentials vs. buy credits / reduce pages).

use marketlens_common::FailureKind;
use marketlens_http::HttpError;
use thiserror::Error;

/// Failure of a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Expected to resolve on retry: timeouts, connection errors, 5xx, or a
    /// 2xx body that would not decode.
    #[error("transient failure: {message}")]
    Transient {
        message: String,
        /// Server-suggested wait, forwarded from `Retry-After` when present.
        retry_after_secs: Option<u64>,
    },
    /// API usage limits exhausted. Terminal for the whole plan.
    #[error("quota exhausted: {message}")]
    Quota { message: String },
    /// Will not resolve on retry: bad credentials, invalid parameters.
    #[error("permanent failure: {message}")]
    Permanent { message: String },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transient { .. } => FailureKind::Transient,
            FetchError::Quota { .. } => FailureKind::Quota,
            FetchError::Permanent { .. } => FailureKind::Permanent,
        }
    }

    /// Classify a problem the provider reported inside a 200 envelope
    /// (SerpAPI signals both quota exhaustion and bad parameters this way).
    pub(crate) fn from_envelope(message: String) -> Self {
        if quota_flavored(&message) {
            FetchError::Quota { message }
        } else {
            FetchError::Permanent { message }
        }
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(m) | HttpError::Network(m) => FetchError::Transient {
                message: m,
                retry_after_secs: None,
            },
            HttpError::Decode(m, snippet) => FetchError::Transient {
                message: format!("undecodable response: {m} (body: {snippet})"),
                retry_after_secs: None,
            },
            HttpError::Api {
                status,
                message,
                retry_after_secs,
                ..
            } => {
                if status.as_u16() == 429
                    || (status.is_client_error() && quota_flavored(&message))
                {
                    FetchError::Quota { message }
                } else if status.is_server_error() {
                    FetchError::Transient {
                        message: format!("HTTP {status}: {message}"),
                        retry_after_secs,
                    }
                } else {
                    FetchError::Permanent {
                        message: format!("HTTP {status}: {message}"),
                    }
                }
            }
            HttpError::Url(m) | HttpError::Build(m) => FetchError::Permanent { message: m },
        }
    }
}

/// Quota exhaustion often arrives as prose, not a status code.
fn quota_flavored(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["quota", "credit", "limit"]
        .iter()
        .any(|kw| lower.contains(kw))
}
