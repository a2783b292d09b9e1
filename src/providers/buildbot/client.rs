use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ReportError, Result};

/// Read-only client for the buildbot REST API (`/api/v2/`).
///
/// Every call is a single anonymous GET. Non-2xx responses are surfaced as
/// [`ReportError::Remote`] and never retried.
pub struct BuildbotClient {
    client: Client,
    api_url: Url,
}

impl BuildbotClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cireport/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| ReportError::Config(format!("Invalid base URL: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join("api/v2/")
            .map_err(|e| ReportError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self { client, api_url })
    }

    /// Permanent URI of a log's raw text.
    pub fn log_uri(&self, log_id: u64) -> String {
        format!("{}{}", self.api_url, raw_log_path(log_id))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ReportError::Config(format!("Invalid API path {path}: {e}")))
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        debug!("GET {url}");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Remote {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Fetches `path` and decodes the body as JSON.
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.get(path).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches `path` as plain text.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        Ok(self.get(path).await?.text().await?)
    }
}

pub fn raw_log_path(log_id: u64) -> String {
    format!("logs/{log_id}/raw_inline")
}
