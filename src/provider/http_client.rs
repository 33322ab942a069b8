use crate::config::ProviderConfig;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Thin reqwest wrapper: shared cookie jar, per-request timeout, no retries.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Session cookie is required for the crumb handshake
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { inner })
    }

    /// Fire a request only for its cookies; the status is irrelevant.
    pub async fn touch(&self, url: &str) -> Result<()> {
        debug!("GET {} (cookie)", url);
        self.inner
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request error for {}", url))?;
        Ok(())
    }

    pub async fn get_text(&self, url: &Url) -> Result<String> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url.as_str())
            .send()
            .await
            .with_context(|| format!("Request error for {}", url.path()))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} for {}", status, url.path());
        }

        resp.text().await.context("Failed to read response body")
    }
}
