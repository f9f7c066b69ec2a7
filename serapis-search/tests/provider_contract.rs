//! Provider Contract Tests
//!
//! These tests verify exact HTTP request formats for each search provider
//! against a wiremock server, and check how responses and error statuses are
//! mapped. Each mock only matches a correctly formed request, so a malformed
//! request shows up as an HTTP 404 error.

use serapis_search::engines::{BingProvider, DiffbotProvider, DuckDuckGoProvider, GoogleProvider};
use serapis_search::{Provider, Qualifier, SearchConfig, SearchError, SearchProvider};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SearchConfig {
    let mut config = SearchConfig {
        user_agent: Some("SerapisTest/1.0".into()),
        google_cse: "cse-id".into(),
        ..Default::default()
    };
    config.credentials.google = Some("g-key".into());
    config.credentials.bing = Some("b-key".into());
    config.credentials.diffbot = Some("d-token".into());
    config.endpoints.duckduckgo = format!("{}/ddg/", server.uri());
    config.endpoints.google = format!("{}/customsearch/v1", server.uri());
    config.endpoints.bing = format!("{}/Bing/Search/Web", server.uri());
    config.endpoints.diffbot = format!("{}/v3/search", server.uri());
    config
}

// ────────────────────────────────────────────────────────────────────────────
// DuckDuckGo
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duckduckgo_requests_json_format() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ddg/"))
        .and(query_param("q", "serendipity"))
        .and(query_param("format", "json"))
        .and(header("user-agent", "SerapisTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Serendipity",
            "Abstract": "Serendipity is an unplanned fortunate discovery.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Serendipity",
            "AbstractSource": "Wikipedia",
            "Definition": "",
            "RelatedTopics": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = DuckDuckGoProvider::new(&config_for(&server)).expect("provider");
    let results = provider.search("serendipity").await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].candidate.title, "Serendipity");
    assert_eq!(results[0].candidate.source.as_deref(), Some("Wikipedia"));
    assert_eq!(results[0].sentences.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn duckduckgo_server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = DuckDuckGoProvider::new(&config_for(&server)).expect("provider");
    let err = provider.search("x").await.unwrap_err();
    assert!(matches!(err, SearchError::Http(_)));
    assert!(err.to_string().contains("503"));
}

// ────────────────────────────────────────────────────────────────────────────
// Google
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn google_sends_key_cse_and_language() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "g-key"))
        .and(query_param("cx", "cse-id"))
        .and(query_param("q", "petrichor"))
        .and(query_param("lr", "lang_en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "customsearch#search",
            "items": [
                {"link": "https://example.com/petrichor",
                 "title": "Petrichor",
                 "snippet": "The smell of the earth after rain."}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let provider = GoogleProvider::new(&config, Qualifier::from_config(&config)).expect("provider");
    let results = provider.search("petrichor").await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].candidate.search_provider, Provider::Google);
    assert_eq!(
        results[0].candidate.summary.as_deref(),
        Some("The smell of the earth after rain.")
    );
}

#[tokio::test]
async fn google_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>quota</html>"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let provider = GoogleProvider::new(&config, Qualifier::from_config(&config)).expect("provider");
    let err = provider.search("petrichor").await.unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// Bing
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bing_posts_with_basic_auth_and_quoted_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Bing/Search/Web"))
        // base64("b-key:b-key")
        .and(header("authorization", "Basic Yi1rZXk6Yi1rZXk="))
        .and(query_param("Query", "'sonder'"))
        .and(query_param("$format", "JSON"))
        .and(query_param("Market", "'en-US'"))
        .and(query_param("Options", "'DisableLocationDetection'"))
        .and(query_param("Adult", "'Moderate'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": {"results": [
                {"Url": "https://example.com/sonder", "Title": "Sonder",
                 "Description": "The realization that each passerby has a life."},
                {"Url": "https://example.com/sonder.pdf", "Title": "Sonder PDF",
                 "Description": "A paper about the word."}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let provider = BingProvider::new(&config, Qualifier::from_config(&config)).expect("provider");
    let results = provider.search("sonder").await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url(), "https://example.com/sonder");
    assert_eq!(results[0].candidate.search_provider, Provider::Bing);
}

#[tokio::test]
async fn bing_unauthorized_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let provider = BingProvider::new(&config, Qualifier::from_config(&config)).expect("provider");
    let err = provider.search("sonder").await.unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(!err.to_string().contains("b-key"));
}

// ────────────────────────────────────────────────────────────────────────────
// Diffbot
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn diffbot_quotes_phrase_and_uses_global_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/search"))
        .and(query_param("token", "d-token"))
        .and(query_param("query", "\"hygge\""))
        .and(query_param("col", "GLOBAL-INDEX"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [
                {"title": "What is hygge?",
                 "pageUrl": "https://example.com/hygge",
                 "author": "A. Writer",
                 "date": "Mon, 04 Jan 2016 08:00:00 GMT",
                 "text": "Hygge is a Danish word. It means coziness."}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = DiffbotProvider::new(&config_for(&server)).expect("provider");
    let results = provider.search("hygge").await.expect("search");

    assert_eq!(results.len(), 1);
    let doc = &results[0];
    assert_eq!(doc.candidate.search_provider, Provider::Diffbot);
    assert_eq!(doc.candidate.date.as_deref(), Some("2016-01-04T08:00:00+00:00"));
    assert_eq!(doc.sentences.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn diffbot_error_payload_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": 401,
            "error": "Not authorized API token."
        })))
        .mount(&server)
        .await;

    let provider = DiffbotProvider::new(&config_for(&server)).expect("provider");
    let err = provider.search("hygge").await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));
}
