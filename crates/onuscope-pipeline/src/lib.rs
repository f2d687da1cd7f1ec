// onuscope-pipeline: request-scoped orchestration around onuscope-decode.
//
// Composes the byte-fetch collaborator, the header sniffer, the OCR
// collaborator, and the graph-text parser into one pipeline producing a
// Base64-wrapped image plus optional metadata and telemetry.

pub mod error;
pub mod fetch;
pub mod ocr;
pub mod pipeline;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::PipelineError;
pub use fetch::{FetchConfig, FetchedImage, HttpImageFetcher, ImageFetcher};
pub use ocr::{OcrConfig, OcrEngine, OcrError, OcrPool};
pub use pipeline::{Pipeline, PipelineResult};
