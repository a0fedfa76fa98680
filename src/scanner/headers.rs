//! Security headers probe

use crate::error::ProbeError;
use crate::models::{HeaderFindings, HeaderStatus};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::debug;

use super::ProbeContext;

/// Checks the target response for five hardening headers
pub struct HeaderProbe;

/// Reads the five hardening headers out of a response header map.
///
/// Lookups are case-insensitive. `X-Content-Type-Options` only counts when
/// its value contains `nosniff`.
pub fn inspect_headers(headers: &HeaderMap) -> HeaderFindings {
    let present = |name: &str| {
        let found = headers.contains_key(name);
        debug!("Checking header '{name}': {found}");
        HeaderStatus::from_present(found)
    };

    let nosniff = headers
        .get_all("x-content-type-options")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_lowercase().contains("nosniff"));

    HeaderFindings {
        x_frame_options: present("x-frame-options"),
        strict_transport_security: present("strict-transport-security"),
        content_security_policy: present("content-security-policy"),
        x_xss_protection: present("x-xss-protection"),
        x_content_type_nosniff: HeaderStatus::from_present(nosniff),
    }
}

#[async_trait]
impl super::Probe for HeaderProbe {
    type Findings = HeaderFindings;

    fn name(&self) -> &'static str {
        "headers"
    }

    fn description(&self) -> &'static str {
        "Checks for X-Frame-Options, HSTS, CSP, X-XSS-Protection and X-Content-Type-Options: nosniff"
    }

    async fn run(&self, ctx: &ProbeContext) -> Result<HeaderFindings, ProbeError> {
        let page = ctx.page().await?;
        Ok(inspect_headers(&page.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).expect("valid header name"),
                HeaderValue::from_str(value).expect("valid header value"),
            );
        }
        map
    }

    #[test]
    fn test_all_headers_absent() {
        let findings = inspect_headers(&HeaderMap::new());
        for (label, status) in findings.entries() {
            assert_eq!(status, HeaderStatus::Absent, "{label}");
        }
    }

    #[test]
    fn test_all_headers_present() {
        let findings = inspect_headers(&header_map(&[
            ("X-Frame-Options", "DENY"),
            ("Strict-Transport-Security", "max-age=31536000"),
            ("Content-Security-Policy", "default-src 'self'"),
            ("X-XSS-Protection", "1; mode=block"),
            ("X-Content-Type-Options", "nosniff"),
        ]));
        for (label, status) in findings.entries() {
            assert_eq!(status, HeaderStatus::Present, "{label}");
        }
    }

    #[test]
    fn test_nosniff_value_is_case_insensitive() {
        let findings = inspect_headers(&header_map(&[("x-content-type-options", "NOSNIFF")]));
        assert_eq!(findings.x_content_type_nosniff, HeaderStatus::Present);
    }

    #[test]
    fn test_content_type_options_without_nosniff() {
        let findings = inspect_headers(&header_map(&[("X-Content-Type-Options", "no-sniff")]));
        assert_eq!(findings.x_content_type_nosniff, HeaderStatus::Absent);
    }

    #[test]
    fn test_value_is_irrelevant_for_presence_headers() {
        let findings = inspect_headers(&header_map(&[("x-frame-options", "ALLOWALL")]));
        assert_eq!(findings.x_frame_options, HeaderStatus::Present);
        assert_eq!(findings.content_security_policy, HeaderStatus::Absent);
    }
}
