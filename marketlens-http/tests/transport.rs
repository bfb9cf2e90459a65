use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use marketlens_http::{Auth, HttpClient, HttpError, RequestOpts};

#[derive(Debug, Deserialize)]
struct Greeting {
    message: String,
}

fn ok_body() -> serde_json::Value {
    serde_json::json!({ "message": "hi" })
}

#[tokio::test]
async fn bearer_auth_travels_as_a_sanitized_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/hello"))
        .and(header("authorization", "Bearer k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        // Quotes and whitespace are stripped before the token is sent.
        auth: Some(Auth::Bearer("  \"k-123\"  ")),
        ..Default::default()
    };
    let got: Greeting = client.get_json("v1/hello", opts).await.unwrap();
    assert_eq!(got.message, "hi");
}

#[tokio::test]
async fn custom_header_auth_is_sent_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/hello"))
        .and(header("x-api-key", "k-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        auth: Some(Auth::Header {
            name: HeaderName::from_static("x-api-key"),
            value: HeaderValue::from_static("k-456"),
        }),
        ..Default::default()
    };
    let got: Greeting = client.get_json("v1/hello", opts).await.unwrap();
    assert_eq!(got.message, "hi");
}

#[tokio::test]
async fn query_auth_folds_into_the_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(query_param("api_key", "secret-1"))
        .and(query_param("q", "earbuds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        auth: Some(Auth::Query {
            name: "api_key",
            value: "secret-1".into(),
        }),
        query: Some(vec![("q", "earbuds".into())]),
        ..Default::default()
    };
    let got: Greeting = client.get_json("v1/items", opts).await.unwrap();
    assert_eq!(got.message, "hi");
}

#[tokio::test]
async fn non_success_maps_to_api_error_in_a_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("retry-after", "7")
                .set_body_json(serde_json::json!({ "error": "overloaded" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<serde_json::Value>("v1/items", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status,
            message,
            retry_after_secs,
            ..
        } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "overloaded");
            assert_eq!(retry_after_secs, Some(7));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<Greeting>("v1/items", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Decode(_, snippet) => assert!(snippet.contains("not json")),
        other => panic!("expected Decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn per_request_timeout_overrides_the_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(ok_body()),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let opts = RequestOpts {
        timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let err = client
        .get_json::<Greeting>("v1/slow", opts)
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Timeout(_)));
}
