//! Integration tests for the reflected script probe

mod common;

use vigil::models::ReflectionContext;
use vigil::scanner::reflection::{ReflectionProbe, MARKER};
use vigil::scanner::Probe;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Echoes query values into the page. Parameters listed in `raw` are echoed
/// unescaped, everything else is HTML-escaped.
struct EchoResponder {
    raw: Vec<&'static str>,
}

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body = String::from("<html><body>");
        for (name, value) in request.url.query_pairs() {
            let echoed = if self.raw.iter().any(|raw| *raw == name) {
                value.into_owned()
            } else {
                value.replace('<', "&lt;").replace('>', "&gt;")
            };
            body.push_str(&format!("<div>{name}: {echoed}</div>"));
        }
        body.push_str("</body></html>");
        ResponseTemplate::new(200)
            .insert_header("Content-Type", "text/html")
            .set_body_string(body)
    }
}

#[tokio::test]
async fn test_unescaped_echo_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(EchoResponder { raw: vec!["q"] })
        .mount(&mock_server)
        .await;

    let target = format!("{}/search?q=shoes", mock_server.uri());
    let ctx = common::probe_context(&target, common::test_config());
    let findings = ReflectionProbe.run(&ctx).await.expect("Probe failed");

    let finding = findings.reflection.expect("expected a reflection");
    assert_eq!(finding.parameter, "q");
    assert_eq!(finding.method, "GET");
    assert_eq!(finding.context, ReflectionContext::ScriptTag);
    assert!(finding.test_url.contains("q="));
    assert!(findings.detail.contains("'q'"));
    assert_eq!(findings.tested_parameters, vec!["q".to_string()]);
}

#[tokio::test]
async fn test_escaped_echo_is_not_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(EchoResponder { raw: Vec::new() })
        .mount(&mock_server)
        .await;

    let target = format!("{}/?q=shoes&page=2", mock_server.uri());
    let ctx = common::probe_context(&target, common::test_config());
    let findings = ReflectionProbe.run(&ctx).await.expect("Probe failed");

    assert!(findings.reflection.is_none());
    assert_eq!(
        findings.detail,
        "No simple reflected XSS found in URL parameters."
    );
    assert_eq!(
        findings.tested_parameters,
        vec!["q".to_string(), "page".to_string()]
    );
}

#[tokio::test]
async fn test_first_reflecting_parameter_in_declaration_order_wins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(EchoResponder {
            raw: vec!["b", "c"],
        })
        .mount(&mock_server)
        .await;

    let target = format!("{}/?a=1&b=2&c=3", mock_server.uri());
    let mut config = common::test_config();
    config.max_reflection_requests = 3;
    let ctx = common::probe_context(&target, config);
    let findings = ReflectionProbe.run(&ctx).await.expect("Probe failed");

    let finding = findings.reflection.expect("expected a reflection");
    assert_eq!(finding.parameter, "b");
    assert_eq!(
        findings.tested_parameters,
        vec!["a".to_string(), "b".to_string()]
    );
}

#[tokio::test]
async fn test_no_parameters_sends_no_payload_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ctx = common::probe_context(&mock_server.uri(), common::test_config());
    let findings = ReflectionProbe.run(&ctx).await.expect("Probe failed");

    assert!(findings.reflection.is_none());
    assert!(findings.tested_parameters.is_empty());
    assert_eq!(
        findings.detail,
        "No URL parameters found to test for reflected XSS."
    );
    assert_eq!(ctx.client.request_count(), 1);
}

#[tokio::test]
async fn test_payload_in_textarea_is_plain_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(|request: &Request| {
            let value = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "msg")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            ResponseTemplate::new(200).set_body_string(format!(
                "<html><body><textarea>{value}</textarea></body></html>"
            ))
        })
        .mount(&mock_server)
        .await;

    let target = format!("{}/?msg=hi", mock_server.uri());
    let ctx = common::probe_context(&target, common::test_config());
    let findings = ReflectionProbe.run(&ctx).await.expect("Probe failed");

    let finding = findings.reflection.expect("expected a reflection");
    assert_eq!(finding.context, ReflectionContext::PlainText);
    assert!(finding.detail.contains("plain text"));
    assert!(!finding.detail.contains(MARKER));
}
