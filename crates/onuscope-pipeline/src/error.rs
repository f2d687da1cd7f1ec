use thiserror::Error;

/// Top-level error type for the pipeline crate.
///
/// Fetch failures are classified into a small closed set of domain
/// outcomes (not-found, unauthorized, rate-limited, malformed content,
/// other) and always cross the crate boundary as values. Decoding never
/// errors at all -- a successfully fetched image always yields a result,
/// however degraded.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input validation ────────────────────────────────────────────
    /// Rejected before any byte or OCR work.
    #[error("Invalid image reference: {reason}")]
    Validation { reason: String },

    // ── Classified fetch failures ───────────────────────────────────
    /// Upstream returned 404.
    #[error("Image not found: {url}")]
    NotFound { url: String },

    /// Upstream returned 401 or 403.
    #[error("Not authorized to fetch image: {url}")]
    Unauthorized { url: String },

    /// Upstream returned 429.
    #[error("Rate limited by image source")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The response body is not an image.
    #[error("Fetched content is not an image: {content_type}")]
    MalformedContent { content_type: String },

    /// Any other upstream failure (5xx, connection refused, timeout, ...).
    #[error("Image fetch failed: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    // ── OCR ─────────────────────────────────────────────────────────
    /// The OCR collaborator failed. The orchestrator degrades this to
    /// omitted telemetry; it only escapes when OCR is called directly.
    #[error("OCR failed: {message}")]
    Ocr { message: String },
}

impl PipelineError {
    /// Returns `true` if this is a transient failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Upstream { .. })
    }

    /// Returns `true` if this is a "not found" failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        match err.status().map(|s| s.as_u16()) {
            Some(404) => Self::NotFound {
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            },
            Some(401 | 403) => Self::Unauthorized {
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            },
            Some(429) => Self::RateLimited {
                retry_after_secs: None,
            },
            status => Self::Upstream {
                message: err.to_string(),
                status,
            },
        }
    }
}

impl From<url::ParseError> for PipelineError {
    fn from(err: url::ParseError) -> Self {
        Self::Validation {
            reason: format!("invalid URL: {err}"),
        }
    }
}
