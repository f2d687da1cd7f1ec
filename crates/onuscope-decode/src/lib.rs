// onuscope-decode: pure decoders for ONU traffic-graph images.
//
// Two independent branches, both total functions over untrusted input:
// raw bytes -> `sniff` -> ImageMetadata, and OCR text -> `graph` ->
// GraphTelemetry. Neither branch returns errors; malformed input degrades
// to absent fields.

pub mod cursor;
pub mod graph;
pub mod sniff;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cursor::ByteCursor;
pub use graph::{BandwidthMetric, GraphTelemetry, GraphType, parse_graph_text};
pub use sniff::{ImageFormat, ImageMetadata, sniff_metadata};
