//! Artifact downloads.
//!
//! One GET per artifact, no retries. A non-2xx status becomes
//! [`VertoError::Download`]; anything that fails before a status is known
//! (DNS, connect, timeout, truncated body) becomes [`VertoError::Network`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use verto_core::{Result, VertoError};
use verto_settings::FetchSettings;

/// Source of raw artifact bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `url` into memory.
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Fetcher backed by `reqwest`.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    /// Build a client with the configured timeout and user agent.
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(settings.timeout_ms))
                .user_agent(settings.user_agent.clone())
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpAssetFetcher {
    fn default() -> Self {
        Self::new(&FetchSettings::default())
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let network = |e: reqwest::Error| VertoError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(VertoError::Download {
                url: url.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.bytes().await.map_err(network)?;
        debug!(url, bytes = body.len(), "fetched artifact");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ende/model.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1_u8, 2, 3, 4]))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpAssetFetcher::default();
        let body = fetcher
            .fetch(&format!("{}/ende/model.bin", server.uri()))
            .await
            .unwrap();
        assert_eq!(body.as_ref(), &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn non_success_status_is_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.bin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.bin", server.uri());
        let err = HttpAssetFetcher::default().fetch(&url).await.unwrap_err();
        assert_matches!(
            &err,
            VertoError::Download { url: u, status: 404, status_text }
                if *u == url && status_text == "Not Found"
        );
        assert_eq!(err.to_string(), format!("Downloading {url} failed: HTTP 404 - Not Found"));
    }

    #[tokio::test]
    async fn server_error_is_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpAssetFetcher::default()
            .fetch(&format!("{}/x", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), verto_core::errors::DOWNLOAD_ERROR);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let err = HttpAssetFetcher::default()
            .fetch("http://127.0.0.1:9/registry.json")
            .await
            .unwrap_err();
        assert_matches!(err, VertoError::Network { .. });
    }
}
