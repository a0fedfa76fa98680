//! Form discovery probe (SQL injection surface)
//!
//! Enumerates the forms on the target page along with their submission
//! target and fields. Nothing is submitted: a form is only a place where
//! injection could be attempted.

use crate::error::ProbeError;
use crate::models::{FormFinding, InputDescriptor};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::ProbeContext;

/// Placeholder for fields without a `name` attribute
pub const UNNAMED_INPUT: &str = "(no name)";

/// Lists the HTML forms on the target page
pub struct FormProbe;

fn selector(css: &str) -> Result<Selector, ProbeError> {
    Selector::parse(css).map_err(|e| ProbeError::ParseFailure(format!("selector '{css}': {e}")))
}

/// Extracts every form in `html`, resolving actions against `page_url`
pub fn extract_forms(page_url: &Url, html: &str) -> Result<Vec<FormFinding>, ProbeError> {
    let document = Html::parse_document(html);
    let form_selector = selector("form")?;
    let field_selector = selector("input, textarea, select")?;

    let forms = document
        .select(&form_selector)
        .map(|form| {
            let action = resolve_action(page_url, form.value().attr("action"));
            let method = form
                .value()
                .attr("method")
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("get")
                .to_uppercase();
            let inputs = form.select(&field_selector).map(describe_field).collect();

            FormFinding {
                action,
                method,
                inputs,
            }
        })
        .collect();

    Ok(forms)
}

/// Missing or unresolvable actions submit to the page itself
fn resolve_action(page_url: &Url, action: Option<&str>) -> String {
    match action {
        Some(raw) => match page_url.join(raw.trim()) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                debug!("Could not resolve form action '{raw}': {e}");
                page_url.to_string()
            }
        },
        None => page_url.to_string(),
    }
}

fn describe_field(field: ElementRef<'_>) -> InputDescriptor {
    let element = field.value();
    let name = element
        .attr("name")
        .filter(|n| !n.is_empty())
        .unwrap_or(UNNAMED_INPUT)
        .to_string();
    let kind = match element.name() {
        "textarea" => "textarea".to_string(),
        "select" => "select".to_string(),
        _ => element.attr("type").unwrap_or("text").to_string(),
    };

    InputDescriptor { name, kind }
}

#[async_trait]
impl super::Probe for FormProbe {
    type Findings = Vec<FormFinding>;

    fn name(&self) -> &'static str {
        "forms"
    }

    fn description(&self) -> &'static str {
        "Lists HTML forms as potential SQL injection entry points (no payloads are sent)"
    }

    async fn run(&self, ctx: &ProbeContext) -> Result<Vec<FormFinding>, ProbeError> {
        let page = ctx.page().await?;
        if page.body.trim().is_empty() {
            return Err(ProbeError::FetchFailure("empty response body".to_string()));
        }

        let forms = extract_forms(ctx.target.url(), &page.body)?;
        info!("Found {} form(s) on {}", forms.len(), ctx.target);
        Ok(forms)
    }
}
