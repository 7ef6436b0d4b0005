//! HTTP(S) image fetching

use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::config::NetworkConfig;
use crate::errors::{LoaderError, LoaderResult};
use crate::utils::url::UrlUtils;

/// Fetches image bytes over HTTP with bounded connect and read times
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig) -> LoaderResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LoaderError::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET the URL and return the full body. Non-2xx statuses are errors.
    pub async fn fetch(&self, url: &str) -> LoaderResult<Bytes> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching image from: {}", safe_url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoaderError::network(&safe_url, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::network(
                safe_url,
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoaderError::network(&safe_url, describe(&e)))?;
        debug!("Fetched {} bytes from {}", bytes.len(), safe_url);
        Ok(bytes)
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}
