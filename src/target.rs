//! Target normalization
//!
//! Turns arbitrary user input into a canonical absolute http(s) URL. Purely
//! syntactic: no network access happens here.

use crate::error::TargetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A validated, canonical scan target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    url: Url,
}

impl Target {
    /// Validates `raw` and canonicalizes it. Surrounding whitespace is ignored.
    ///
    /// Input without an `http://` or `https://` prefix is treated as plain
    /// HTTP. That silently downgrades targets which only speak TLS, so callers
    /// that care should pass an explicit scheme.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TargetError::InvalidInput);
        }

        let candidate = if has_http_scheme(raw) {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let invalid = |reason: String| TargetError::InvalidUrl {
            input: raw.to_string(),
            reason,
        };

        let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(invalid("missing host".to_string())),
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host without port, brackets stripped for IPv6 literals
    pub fn host(&self) -> String {
        match self.url.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        }
    }

    /// Distinct query parameter names in declaration order
    pub fn query_params(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (name, _) in self.url.query_pairs() {
            if !names.iter().any(|n| n.as_str() == name) {
                names.push(name.into_owned());
            }
        }
        names
    }
}

fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl TryFrom<String> for Target {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.url.into()
    }
}
