//! HTTP client wrapper with timeouts, retries, and request tracking

use crate::error::{ProbeError, Result, VigilError};
use crate::models::ScanConfig;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// HTTP client wrapper with a fixed identity and request counting
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
    request_count: Arc<AtomicU64>,
}

impl HttpClient {
    /// Creates a new HttpClient from scan configuration
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            });

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| VigilError::ConfigError(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            retries: config.retries,
            request_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Fetches `url` and reads the body.
    ///
    /// A 4xx or 5xx terminal status is a failure, as are timeouts and
    /// transport errors.
    pub async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, ProbeError> {
        let response = self.get(url).await?;
        let status = response.status();
        let final_url = response.url().clone();

        if status.is_client_error() || status.is_server_error() {
            return Err(ProbeError::FetchFailure(format!(
                "HTTP {status} from {final_url}"
            )));
        }

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::FetchFailure(format!("failed to read body: {e}")))?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }

    /// Returns the total number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Sends a GET request, retrying transport failures
    async fn get(&self, url: &str) -> std::result::Result<Response, ProbeError> {
        const INITIAL_BACKOFF_MS: u64 = 500;

        let mut last_error = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let factor = 2u64.saturating_pow(attempt - 1);
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor));
                debug!("Retry attempt {attempt}, waiting {backoff:?}");
                sleep(backoff).await;
            }

            self.request_count.fetch_add(1, Ordering::Relaxed);

            match self.client.get(url).send().await {
                Ok(response) => {
                    debug!("Response: {} for {}", response.status(), response.url());
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Request to {url} failed (attempt {attempt}): {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => classify(&e),
            None => ProbeError::FetchFailure(format!("no request sent to {url}")),
        })
    }
}

fn classify(error: &reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::FetchFailure("request timed out".to_string())
    } else if error.is_connect() {
        ProbeError::FetchFailure(format!("connection failed: {error}"))
    } else if error.is_redirect() {
        ProbeError::FetchFailure(format!("redirect limit exceeded: {error}"))
    } else {
        ProbeError::FetchFailure(error.to_string())
    }
}
