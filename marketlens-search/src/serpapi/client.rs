//! SerpAPI Amazon engine client.
//!
//! One HTTP request per attempt, retries scheduled here (the transport is
//! single-attempt on purpose). Failure classification comes from
//! [`FetchError`]; only transient failures are retried.

use std::borrow::Cow;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tokio::time::sleep;
use tracing::{debug, warn};

use marketlens_common::{FetchPlan, PageEvent, PageFailure, SearchPage};
use marketlens_http::{Auth, HttpClient, RequestOpts};

use crate::error::FetchError;
use crate::retry::{PageState, RetryPolicy};

use super::types::{AccountInfo, SearchResponse};

/// Public SerpAPI endpoint. Tests point [`SerpApiClient::with_base_url`] at
/// a local mock server instead.
const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// Client for paginated Amazon product searches.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct SerpApiClient {
    http: HttpClient,
    api_key: String,
    policy: RetryPolicy,
}

impl SerpApiClient {
    /// Client against the public SerpAPI endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_base_url(api_key, SERPAPI_BASE_URL)
    }

    /// Client against an alternate endpoint (mock servers, proxies).
    pub fn with_base_url(api_key: impl Into<String>, base: &str) -> Result<Self, FetchError> {
        let http = HttpClient::new(base)?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            policy: RetryPolicy::default(),
        })
    }

    /// Replace the default [`RetryPolicy`].
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the per-request timeout (default 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    // ==============================
    // Page fetching
    // ==============================

    /// Fetch every page of `plan` lazily, one request in flight at a time.
    ///
    /// Yields [`PageEvent::Page`] per fetched page. The first page that fails
    /// terminally yields [`PageEvent::Failed`] and ends the stream; pages
    /// already yielded stand.
    pub fn fetch_pages<'a>(&'a self, plan: &'a FetchPlan) -> impl Stream<Item = PageEvent> + 'a {
        stream! {
            for page in 1..=plan.pages {
                match self.fetch_page(plan, page).await {
                    Ok(found) => yield PageEvent::Page(found),
                    Err(failure) => {
                        yield PageEvent::Failed(failure);
                        break;
                    }
                }
            }
        }
    }

    /// Fetch a single page, retrying transient failures up to the policy
    /// budget. Quota and permanent failures return after the attempt that
    /// classified them.
    pub async fn fetch_page(
        &self,
        plan: &FetchPlan,
        page: u32,
    ) -> Result<SearchPage, PageFailure> {
        let mut state = PageState::Pending;
        loop {
            state = match state {
                PageState::Pending => PageState::Requesting { attempt: 1 },
                PageState::Requesting { attempt } => {
                    debug!(page, attempt, term = %plan.term, "search.page.start");
                    match self.request_page(plan, page).await {
                        Ok(found) => return Ok(found),
                        Err(FetchError::Transient {
                            message,
                            retry_after_secs,
                        }) if attempt <= self.policy.max_retries => {
                            let delay = self.policy.backoff_delay(attempt, retry_after_secs);
                            warn!(
                                page,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                message = %message,
                                "search.page.retrying"
                            );
                            PageState::Retrying { attempt, delay }
                        }
                        Err(err) => {
                            let failure = PageFailure {
                                page,
                                kind: err.kind(),
                                attempts: attempt,
                                message: err.to_string(),
                            };
                            warn!(
                                page,
                                attempts = failure.attempts,
                                kind = %failure.kind,
                                message = %failure.message,
                                "search.page.failed"
                            );
                            return Err(failure);
                        }
                    }
                }
                PageState::Retrying { attempt, delay } => {
                    sleep(delay).await;
                    PageState::Requesting {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }

    /// One request for one page. No retry here.
    async fn request_page(&self, plan: &FetchPlan, page: u32) -> Result<SearchPage, FetchError> {
        let page_param = page.to_string();
        let query: Vec<(&str, Cow<'_, str>)> = vec![
            ("engine", Cow::Borrowed("amazon")),
            ("amazon_domain", Cow::Borrowed(plan.marketplace.as_domain())),
            ("k", Cow::Borrowed(plan.term.as_str())),
            ("page", Cow::Owned(page_param)),
        ];
        let opts = RequestOpts {
            auth: Some(Auth::Query {
                name: "api_key",
                value: Cow::Borrowed(&self.api_key),
            }),
            query: Some(query),
            ..Default::default()
        };
        let resp: SearchResponse = self.http.get_json("search.json", opts).await?;

        // The provider reports some problems inside a 200 envelope.
        if let Some(problem) = resp.error {
            return Err(FetchError::from_envelope(problem));
        }

        let search_id = resp
            .search_metadata
            .as_ref()
            .and_then(|m| m.id.as_deref())
            .unwrap_or("-");
        debug!(
            page,
            items = resp.organic_results.len(),
            total_results = ?resp
                .search_information
                .as_ref()
                .and_then(|i| i.total_results),
            search_id,
            "serpapi.page.ok"
        );

        Ok(SearchPage {
            page,
            items: resp.organic_results,
        })
    }

    // ==============================
    // Account standing
    // ==============================

    /// Current account standing (searches left this month, plan size).
    ///
    /// Useful after a quota failure to report how bad things are.
    pub async fn account(&self) -> Result<AccountInfo, FetchError> {
        let opts = RequestOpts {
            auth: Some(Auth::Query {
                name: "api_key",
                value: Cow::Borrowed(&self.api_key),
            }),
            ..Default::default()
        };
        let info: AccountInfo = self.http.get_json("account.json", opts).await?;
        debug!(
            plan_searches_left = ?info.plan_searches_left,
            this_month_usage = ?info.this_month_usage,
            "serpapi.account.ok"
        );
        Ok(info)
    }
}
