// Photo-conversion orchestrator
//
// Sequences the byte fetch, header sniffing, OCR, and graph-text
// parsing into one request-scoped result. Failure handling is layered:
// fetch failures are classified into a closed set and returned as
// errors; everything after a successful fetch only degrades -- a
// fetched image always yields a Base64 payload, even when both
// metadata and telemetry extraction come up empty.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use onuscope_decode::{GraphTelemetry, GraphType, ImageMetadata, parse_graph_text, sniff_metadata};

use crate::error::PipelineError;
use crate::fetch::{FetchedImage, ImageFetcher};
use crate::ocr::OcrPool;

/// Composite output of one pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    /// `data:<content_type>;base64,<payload>` data URI.
    pub image_base64: String,
    pub content_type: String,
    /// Sniffed format name ("png", "jpeg", "gif", "webp", "unknown").
    pub format: String,
    pub size_bytes: usize,
    pub base64_length: usize,
    /// Body size in KiB, rounded to two decimals.
    pub size_kb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(rename = "graphData", skip_serializing_if = "Option::is_none")]
    pub graph_data: Option<GraphTelemetry>,
}

/// Request-scoped conversion pipeline.
///
/// Stateless between runs: every invocation fetches, decodes, and
/// discards. Arbitrarily many conversions may run concurrently; the
/// only shared resource is the OCR pool, which bounds itself.
pub struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    ocr: Option<OcrPool>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher, ocr: None }
    }

    /// Attach an OCR pool, enabling telemetry extraction.
    pub fn with_ocr(mut self, pool: OcrPool) -> Self {
        self.ocr = Some(pool);
        self
    }

    /// Convert one graph image: fetch, wrap in Base64, sniff structural
    /// metadata, and (when `extract_telemetry` is set) OCR the image and
    /// parse the text into telemetry.
    ///
    /// Metadata sniffing is cheap and always attempted. Telemetry
    /// extraction failures never invalidate the image payload -- the
    /// `graph_data` field is simply omitted.
    pub async fn convert(
        &self,
        image_url: &str,
        graph_type: GraphType,
        extract_telemetry: bool,
    ) -> Result<PipelineResult, PipelineError> {
        let url = validate_url(image_url)?;
        debug!(%url, %graph_type, extract_telemetry, "starting image conversion");

        let fetched = self.fetcher.fetch(&url).await?;
        classify_response(&url, &fetched)?;

        let metadata = sniff_metadata(&fetched.body);
        let content_type = resolve_content_type(&fetched, &metadata);

        let payload = STANDARD.encode(&fetched.body);
        let size_bytes = fetched.body.len();
        let base64_length = payload.len();

        let graph_data = if extract_telemetry {
            self.extract_telemetry(&fetched, graph_type).await
        } else {
            None
        };

        Ok(PipelineResult {
            image_base64: format!("data:{content_type};base64,{payload}"),
            content_type,
            format: metadata.format.as_str().to_owned(),
            size_bytes,
            base64_length,
            size_kb: round_kb(size_bytes),
            metadata: Some(metadata),
            graph_data,
        })
    }

    /// Run OCR + parsing, degrading every failure to `None`.
    async fn extract_telemetry(
        &self,
        fetched: &FetchedImage,
        graph_type: GraphType,
    ) -> Option<GraphTelemetry> {
        let Some(pool) = &self.ocr else {
            warn!("telemetry requested but no OCR engine is configured");
            return None;
        };

        match pool.recognize(&fetched.body).await {
            Ok(text) => Some(parse_graph_text(&text, graph_type)),
            Err(e) => {
                warn!(error = %e, "telemetry extraction failed; omitting graph data");
                None
            }
        }
    }
}

// ── Steps ────────────────────────────────────────────────────────────

/// Reject empty or unparseable references before any byte work.
fn validate_url(raw: &str) -> Result<Url, PipelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation {
            reason: "empty image reference".to_owned(),
        });
    }
    let url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::Validation {
            reason: format!("unsupported URL scheme: {}", url.scheme()),
        });
    }
    Ok(url)
}

/// Map a non-2xx status or a non-image body onto the closed failure set.
fn classify_response(url: &Url, fetched: &FetchedImage) -> Result<(), PipelineError> {
    match fetched.status {
        200..=299 => {}
        404 => {
            return Err(PipelineError::NotFound {
                url: url.to_string(),
            });
        }
        401 | 403 => {
            return Err(PipelineError::Unauthorized {
                url: url.to_string(),
            });
        }
        429 => {
            return Err(PipelineError::RateLimited {
                retry_after_secs: None,
            });
        }
        status => {
            return Err(PipelineError::Upstream {
                message: format!("unexpected status {status} from {url}"),
                status: Some(status),
            });
        }
    }

    if let Some(ct) = &fetched.content_type {
        if !ct.starts_with("image/") {
            return Err(PipelineError::MalformedContent {
                content_type: ct.clone(),
            });
        }
    }
    Ok(())
}

/// Prefer the upstream header; fall back to the sniffed format, then to
/// a generic octet stream.
fn resolve_content_type(fetched: &FetchedImage, metadata: &ImageMetadata) -> String {
    fetched
        .content_type
        .clone()
        .or_else(|| metadata.format.mime_type().map(ToOwned::to_owned))
        .unwrap_or_else(|| "application/octet-stream".to_owned())
}

fn round_kb(size_bytes: usize) -> f64 {
    let kb = size_bytes as f64 / 1024.0;
    (kb * 100.0).round() / 100.0
}

// ── Tests ────────────────────────────────────────────────────────────
