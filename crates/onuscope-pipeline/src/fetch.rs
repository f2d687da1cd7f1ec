// Byte-fetch collaborator
//
// The pipeline never talks HTTP directly; it goes through the
// `ImageFetcher` trait so tests (and non-HTTP sources) can stand in.
// `HttpImageFetcher` is the production implementation over reqwest.
//
// A fetcher reports the upstream status code as data rather than as an
// error -- classification into domain outcomes happens in the
// orchestrator, which owns the closed failure set.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::PipelineError;

/// One fetched HTTP response, status and all.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedImage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Collaborator that retrieves raw image bytes for a resolved URL.
///
/// Transport-level failures (DNS, connection refused, timeout) surface
/// as errors; HTTP-level failures come back as a `FetchedImage` with a
/// non-2xx status.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, PipelineError>;
}

// ── Transport configuration ──────────────────────────────────────────

/// Transport settings for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("onuscope/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, PipelineError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| PipelineError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })
    }
}

// ── HTTP implementation ──────────────────────────────────────────────

/// Production fetcher over a shared `reqwest::Client`.
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    /// Create a fetcher from a `FetchConfig`.
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// Create a fetcher with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, PipelineError> {
        debug!("GET {}", url);

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let body = resp.bytes().await?;

        debug!(status, size = body.len(), "fetched image bytes");
        Ok(FetchedImage {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_is_2xx() {
        let img = |status| FetchedImage {
            status,
            content_type: None,
            body: Bytes::new(),
        };
        assert!(img(200).is_success());
        assert!(img(204).is_success());
        assert!(!img(199).is_success());
        assert!(!img(301).is_success());
        assert!(!img(404).is_success());
    }
}
