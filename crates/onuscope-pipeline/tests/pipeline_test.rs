// Integration tests for the HTTP fetch path using wiremock.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onuscope_decode::GraphType;
use onuscope_pipeline::{
    FetchConfig, HttpImageFetcher, OcrConfig, OcrEngine, OcrError, OcrPool, Pipeline,
    PipelineError,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct CannedOcr {
    text: &'static str,
}

#[async_trait]
impl OcrEngine for CannedOcr {
    async fn recognize(&self, _image: &[u8], _config: &OcrConfig) -> Result<String, OcrError> {
        Ok(self.text.to_owned())
    }
}

fn png_bytes(width: u32, height: u32, depth: u8, color_type: u8) -> Vec<u8> {
    let mut buf = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    buf.extend_from_slice(&13u32.to_be_bytes());
    buf.extend_from_slice(b"IHDR");
    buf.extend_from_slice(&width.to_be_bytes());
    buf.extend_from_slice(&height.to_be_bytes());
    buf.push(depth);
    buf.push(color_type);
    buf.extend_from_slice(&[0, 0, 0]);
    buf
}

async fn setup() -> (MockServer, Pipeline) {
    let server = MockServer::start().await;
    let fetcher = HttpImageFetcher::new(&FetchConfig::default()).expect("fetcher builds");
    (server, Pipeline::new(Arc::new(fetcher)))
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn fetches_and_wraps_png() {
    let (server, pipeline) = setup().await;
    let body = png_bytes(1200, 800, 8, 2);

    Mock::given(method("GET"))
        .and(path("/graphs/onu-42.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(body.clone()),
        )
        .mount(&server)
        .await;

    let result = pipeline
        .convert(
            &format!("{}/graphs/onu-42.png", server.uri()),
            GraphType::Daily,
            false,
        )
        .await
        .expect("conversion succeeds");

    assert_eq!(result.format, "png");
    assert_eq!(result.content_type, "image/png");
    assert_eq!(result.size_bytes, body.len());
    assert!(result.image_base64.starts_with("data:image/png;base64,"));

    let meta = result.metadata.expect("metadata");
    assert_eq!(meta.width, Some(1200));
    assert_eq!(meta.height, Some(800));
    assert_eq!(meta.color_depth, Some(8));
    assert_eq!(meta.has_alpha, Some(false));
}

#[tokio::test]
async fn full_conversion_with_telemetry() {
    let (server, pipeline) = setup().await;
    let pipeline = pipeline.with_ocr(OcrPool::new(
        Arc::new(CannedOcr {
            text: "gpon-onu_1/6/2:2 bits per second \
                   Upload Current: 0.00 Maximum: 0.00 \
                   Download Current: 1.12 Maximum: 1.14 \
                   0.0 0.2k 0.4k 20:20 20:30 21:00",
        }),
        1,
    ));

    Mock::given(method("GET"))
        .and(path("/graphs/onu-42.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(1200, 800, 8, 2)),
        )
        .mount(&server)
        .await;

    let result = pipeline
        .convert(
            &format!("{}/graphs/onu-42.png", server.uri()),
            GraphType::Hourly,
            true,
        )
        .await
        .expect("conversion succeeds");

    let graph = result.graph_data.expect("graph data");
    assert_eq!(graph.graph_type, GraphType::Hourly);
    assert_eq!(graph.onu_identifier.as_deref(), Some("gpon-onu_1/6/2:2"));
    assert_eq!(graph.y_axis_label.as_deref(), Some("bits per second"));

    let download = graph.download.expect("download metric");
    assert_eq!(download.current.as_deref(), Some("1.12"));
    assert_eq!(download.maximum.as_deref(), Some("1.14"));
    assert_eq!(download.unit.as_deref(), Some("bits per second"));

    let ticks = graph.x_axis_timestamps.expect("timestamps");
    for tick in ["20:20", "20:30", "21:00"] {
        assert!(ticks.contains(&tick.to_owned()), "missing tick {tick}");
    }
}

#[tokio::test]
async fn result_serializes_to_wire_shape() {
    let (server, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path("/g.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(640, 480, 8, 6)),
        )
        .mount(&server)
        .await;

    let result = pipeline
        .convert(&format!("{}/g.png", server.uri()), GraphType::Daily, false)
        .await
        .expect("conversion succeeds");

    let json = serde_json::to_value(&result).expect("serializable");
    assert_eq!(json["format"], "png");
    assert_eq!(json["content_type"], "image/png");
    assert_eq!(json["metadata"]["width"], 640);
    assert_eq!(json["metadata"]["hasAlpha"], true);
    assert!(json.get("graphData").is_none());
    assert!(
        json["image_base64"]
            .as_str()
            .expect("string payload")
            .starts_with("data:image/png;base64,")
    );
}

// ── Failure classification ──────────────────────────────────────────

#[tokio::test]
async fn missing_image_classifies_as_not_found() {
    let (server, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = pipeline
        .convert(&format!("{}/gone.png", server.uri()), GraphType::Daily, false)
        .await
        .expect_err("404 classifies");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rate_limit_classifies_as_transient() {
    let (server, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path("/busy.png"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = pipeline
        .convert(&format!("{}/busy.png", server.uri()), GraphType::Daily, false)
        .await
        .expect_err("429 classifies");
    assert!(matches!(err, PipelineError::RateLimited { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn html_error_page_classifies_as_malformed() {
    let (server, pipeline) = setup().await;

    Mock::given(method("GET"))
        .and(path("/login.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>session expired</html>"),
        )
        .mount(&server)
        .await;

    let err = pipeline
        .convert(
            &format!("{}/login.png", server.uri()),
            GraphType::Daily,
            false,
        )
        .await
        .expect_err("non-image body classifies");
    assert!(matches!(err, PipelineError::MalformedContent { .. }));
}

#[tokio::test]
async fn connection_refused_classifies_as_upstream() {
    let fetcher = HttpImageFetcher::new(&FetchConfig::default()).expect("fetcher builds");
    let pipeline = Pipeline::new(Arc::new(fetcher));

    // Port 1 is never listening.
    let err = pipeline
        .convert("http://127.0.0.1:1/g.png", GraphType::Daily, false)
        .await
        .expect_err("connection refused");
    assert!(matches!(err, PipelineError::Upstream { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn invalid_reference_rejected_before_fetch() {
    let (server, pipeline) = setup().await;

    let err = pipeline
        .convert("", GraphType::Daily, false)
        .await
        .expect_err("empty reference");
    assert!(matches!(err, PipelineError::Validation { .. }));

    // Nothing must have reached the server.
    assert!(server.received_requests().await.expect("recorded").is_empty());
}
