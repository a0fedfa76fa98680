//! Integration tests for the HTTP client wrapper

mod common;

use vigil::error::{ProbeError, VigilError};
use vigil::http::HttpClient;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_returns_status_headers_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Test", "yes")
                .set_body_string("hello"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&common::test_config()).expect("client");
    let page = client
        .fetch(&format!("{}/", mock_server.uri()))
        .await
        .expect("fetch");

    assert_eq!(page.status, 200);
    assert_eq!(page.body, "hello");
    assert!(page.headers.contains_key("x-test"));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_client_error_status_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&common::test_config()).expect("client");
    let result = client.fetch(&mock_server.uri()).await;

    match result {
        Err(ProbeError::FetchFailure(message)) => assert!(message.contains("404")),
        other => panic!("expected a fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&common::test_config()).expect("client");
    let page = client
        .fetch(&format!("{}/old", mock_server.uri()))
        .await
        .expect("fetch");

    assert_eq!(page.final_url.path(), "/new");
    assert_eq!(page.body, "moved");
}

#[tokio::test]
async fn test_configured_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", common::TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&common::test_config()).expect("client");
    client.fetch(&mock_server.uri()).await.expect("fetch");
}

#[tokio::test]
async fn test_refused_connection_is_a_failure() {
    let mut config = common::test_config();
    config.retries = 1;
    let client = HttpClient::from_config(&config).expect("client");

    let result = client
        .fetch(&format!("http://127.0.0.1:{}/", common::closed_port()))
        .await;

    assert!(matches!(result, Err(ProbeError::FetchFailure(_))));
    assert_eq!(client.request_count(), 2);
}

#[test]
fn test_invalid_proxy_is_a_config_error() {
    let mut config = common::test_config();
    config.proxy = Some("not a proxy url".to_string());

    assert!(matches!(
        HttpClient::from_config(&config),
        Err(VigilError::ConfigError(_))
    ));
}
