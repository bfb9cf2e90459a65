//! Wire types for the SerpAPI Amazon engine.
//!
//! Only the envelope is typed. Per-item payloads stay loose
//! (`serde_json::Value`) because field presence and types are never trusted
//! from the wire; validation happens downstream in `marketlens-products`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search_metadata: Option<SearchMetadata>,
    #[serde(default)]
    pub search_information: Option<SearchInformation>,
    #[serde(default)]
    pub organic_results: Vec<Value>,
    #[serde(default)]
    pub pagination: Option<SerpPagination>,
    /// Present when the provider reports a problem inside a 200 envelope.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchInformation {
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerpPagination {
    #[serde(default)]
    pub current: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Account standing from the provider's `account` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub account_email: Option<String>,
    #[serde(default)]
    pub plan_searches_left: Option<i64>,
    #[serde(default)]
    pub searches_per_month: Option<i64>,
    #[serde(default)]
    pub this_month_usage: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_typical_page() {
        let body = r#"{
            "search_metadata": {"id": "abc123", "status": "Success"},
            "search_information": {"total_results": 3812},
            "organic_results": [
                {"position": 1, "asin": "B0TEST0001", "title": "Something"},
                {"position": 2, "asin": "B0TEST0002", "title": "Else", "sponsored": true}
            ],
            "pagination": {"current": 1, "next": "https://serpapi.com/search?page=2"},
            "unknown_field": {"ignored": true}
        }"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.organic_results.len(), 2);
        assert_eq!(
            resp.search_information.unwrap().total_results,
            Some(3812)
        );
        assert_eq!(resp.pagination.unwrap().current, Some(1));
        assert!(resp.error.is_none());
    }

    #[test]
    fn decodes_an_error_envelope_without_results() {
        let body = r#"{"error": "Your account has run out of searches."}"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(resp.organic_results.is_empty());
        assert_eq!(
            resp.error.as_deref(),
            Some("Your account has run out of searches.")
        );
    }

    #[test]
    fn decodes_account_info_with_missing_fields() {
        let body = r#"{"plan_searches_left": 12}"#;
        let info: AccountInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.plan_searches_left, Some(12));
        assert!(info.account_email.is_none());
    }
}
