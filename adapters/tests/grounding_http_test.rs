use adapters::HttpGroundingClient;
use errors::GroundingError;
use lex_core::{GroundingRetriever, Locale, SourceTrust};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> HttpGroundingClient {
    HttpGroundingClient::new(reqwest::Client::new(), &server.uri(), timeout)
}

#[tokio::test]
async fn test_retrieve_posts_query_and_parses_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/retrieve"))
        .and(body_partial_json(json!({ "query": "Mietmangel", "k": 2, "locale": "de" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                {
                    "source_id": "fedlex",
                    "title": "OR Art. 259a",
                    "url": "https://www.fedlex.admin.ch/eli/cc/27/317_321_377/de",
                    "pin": "OR 259a",
                    "snippet": "Mängel an der Mietsache",
                    "trust": "official"
                },
                {
                    "source_id": "blog",
                    "title": "Tenant tips",
                    "snippet": "Unverified commentary"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server, Duration::from_secs(1))
        .retrieve("Mietmangel", Locale::De, 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].trust, SourceTrust::Official);
    assert_eq!(results[1].trust, SourceTrust::Unverified);
    assert!(results[1].url.is_none());
}

#[tokio::test]
async fn test_retrieve_truncates_to_k() {
    let server = MockServer::start().await;
    let candidate = json!({ "source_id": "fedlex", "title": "t", "snippet": "s" });
    Mock::given(method("POST"))
        .and(path("/v1/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [candidate.clone(), candidate.clone(), candidate]
        })))
        .mount(&server)
        .await;

    let results = client(&server, Duration::from_secs(1))
        .retrieve("q", Locale::En, 1)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_retrieve_error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/retrieve"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_secs(1))
        .retrieve("q", Locale::En, 3)
        .await;
    assert!(matches!(result, Err(GroundingError::Unavailable { .. })));
}

#[tokio::test]
async fn test_retrieve_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/retrieve"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "candidates": [] }))
                .set_delay(Duration::from_millis(500))
        )
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_millis(100))
        .retrieve("q", Locale::En, 3)
        .await;
    assert_eq!(result, Err(GroundingError::Timeout { timeout_ms: 100 }));
}

#[tokio::test]
async fn test_retrieve_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/retrieve"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_secs(1))
        .retrieve("q", Locale::En, 3)
        .await;
    assert!(matches!(result, Err(GroundingError::InvalidResponse { .. })));
}
