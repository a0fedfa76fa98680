//! Reflected script detection (XSS surface)
//!
//! Each query parameter in turn is replaced by a marked `<script>` payload and
//! the page is re-fetched. A verbatim, unescaped echo of the payload is a
//! reflection; where it lands in the parsed document decides its strength.
//! Form fields are not exercised.

use crate::error::ProbeError;
use crate::models::{ReflectionContext, ReflectionFinding, ReflectionFindings};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::ProbeContext;

/// Identifies our payload inside a response
pub const MARKER: &str = "VigilReflectionProbe";

/// Tests query parameters for unescaped reflection of a script payload
pub struct ReflectionProbe;

/// The script payload carrying [`MARKER`]
pub fn payload() -> String {
    format!("<script>alert('{MARKER}')</script>")
}

/// Copies `url` with every value of `param` replaced by `value`.
///
/// Other parameters keep their order and values. The value is
/// form-urlencoded in the resulting query string.
pub fn build_test_url(url: &Url, param: &str, value: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == param {
                (k.into_owned(), value.to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    let mut test_url = url.clone();
    test_url.query_pairs_mut().clear().extend_pairs(pairs);
    test_url
}

/// Decides whether `body` reflects `payload`, and in which context.
///
/// Returns `None` unless the payload appears verbatim. A reflection counts as
/// [`ReflectionContext::ScriptTag`] when the marker sits inside a parsed
/// script element, and [`ReflectionContext::PlainText`] otherwise (inside a
/// textarea, a comment, a title and so on).
pub fn classify_reflection(
    body: &str,
    payload: &str,
) -> Result<Option<ReflectionContext>, ProbeError> {
    if !body.contains(payload) {
        return Ok(None);
    }

    let document = Html::parse_document(body);
    let scripts = Selector::parse("script")
        .map_err(|e| ProbeError::ParseFailure(format!("selector 'script': {e}")))?;
    let in_script = document
        .select(&scripts)
        .any(|script| script.inner_html().contains(MARKER));

    Ok(Some(if in_script {
        ReflectionContext::ScriptTag
    } else {
        ReflectionContext::PlainText
    }))
}

fn describe(param: &str, context: ReflectionContext) -> String {
    match context {
        ReflectionContext::ScriptTag => format!(
            "Potential reflected XSS in parameter '{param}': payload reflected inside a script element."
        ),
        ReflectionContext::PlainText => format!(
            "Potential reflected XSS in parameter '{param}': payload reflected as plain text in the response."
        ),
    }
}

#[async_trait]
impl super::Probe for ReflectionProbe {
    type Findings = ReflectionFindings;

    fn name(&self) -> &'static str {
        "reflection"
    }

    fn description(&self) -> &'static str {
        "Injects a marked script payload into each query parameter and looks for unescaped echoes"
    }

    async fn run(&self, ctx: &ProbeContext) -> Result<ReflectionFindings, ProbeError> {
        // The target itself must answer before its parameters are worth testing
        ctx.page().await?;

        let params = ctx.target.query_params();
        if params.is_empty() {
            debug!("No query parameters on {}", ctx.target);
            return Ok(ReflectionFindings {
                tested_parameters: Vec::new(),
                reflection: None,
                detail: "No URL parameters found to test for reflected XSS.".to_string(),
            });
        }

        let payload = payload();
        let base = ctx.target.url();

        // Fetches overlap, but results come back in declaration order so the
        // first reflecting parameter is always the earliest declared one.
        let mut responses = stream::iter(params)
            .map(|param| {
                let test_url = build_test_url(base, &param, &payload);
                let client = ctx.client.clone();
                async move {
                    debug!("Testing reflection with URL: {test_url}");
                    let fetched = client.fetch(test_url.as_str()).await;
                    (param, test_url, fetched)
                }
            })
            .buffered(ctx.config.max_reflection_requests.max(1));

        let mut tested_parameters = Vec::new();

        while let Some((param, test_url, fetched)) = responses.next().await {
            tested_parameters.push(param.clone());

            let page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    debug!("Reflection test for '{param}' got no response: {e}");
                    continue;
                }
            };

            match classify_reflection(&page.body, &payload) {
                Ok(Some(context)) => {
                    let detail = describe(&param, context);
                    info!("{detail}");
                    return Ok(ReflectionFindings {
                        tested_parameters,
                        reflection: Some(ReflectionFinding {
                            parameter: param,
                            method: "GET".to_string(),
                            context,
                            test_url: test_url.to_string(),
                            detail: detail.clone(),
                        }),
                        detail,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Could not inspect response for '{param}': {e}"),
            }
        }

        Ok(ReflectionFindings {
            tested_parameters,
            reflection: None,
            detail: "No simple reflected XSS found in URL parameters.".to_string(),
        })
    }
}
