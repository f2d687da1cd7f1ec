// OCR collaborator & worker capacity
//
// OCR runs out of process (or at least out of crate): the engine is an
// external collaborator behind the `OcrEngine` trait. What this module
// owns is the engine's lifecycle discipline -- a recognition worker is
// a heavyweight resource, so concurrent use is bounded by a semaphore
// whose permit is held for exactly the duration of one recognition and
// released on every exit path, including panics, because release lives
// in the permit's `Drop`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

/// OCR collaborator failure.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine itself failed (bad model data, internal fault, ...).
    #[error("OCR engine error: {message}")]
    Engine { message: String },

    /// The pool has been shut down; no more permits will be issued.
    #[error("OCR worker pool is closed")]
    PoolClosed,
}

/// Keywords the telemetry parser matches on. The recognition whitelist
/// must be able to spell every one of them, in the casing the parser's
/// case-sensitive rules (the bps/Bps distinction) care about.
pub const GRAPH_KEYWORDS: &[&str] = &[
    "Upload", "Download", "Current", "Maximum", "GPON", "HWTC", "ONU", "gpon", "onu", "bits",
    "bytes", "per", "second", "bps", "Bps",
];

/// Recognition settings handed to the engine on every call.
///
/// The default whitelist restricts recognition to the alphabet that
/// actually appears on ONU traffic graphs: digits, time and path
/// punctuation, magnitude suffixes, and the letters of
/// [`GRAPH_KEYWORDS`].
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub language: String,
    pub character_whitelist: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        let mut whitelist = String::from("0123456789:./-_ kMG");
        for ch in GRAPH_KEYWORDS.iter().flat_map(|keyword| keyword.chars()) {
            if !whitelist.contains(ch) {
                whitelist.push(ch);
            }
        }
        Self {
            language: "eng".to_owned(),
            character_whitelist: whitelist,
        }
    }
}

/// External engine that converts image bytes to plain text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8], config: &OcrConfig) -> Result<String, OcrError>;
}

// ── Worker pool ──────────────────────────────────────────────────────

/// Bounds concurrent use of one OCR engine instance.
///
/// Each `recognize` call acquires a permit, runs the engine, and returns
/// the permit when the call frame unwinds. Capacity is whatever the
/// underlying engine can actually serve in parallel; 1 for a single
/// worker.
pub struct OcrPool {
    engine: Arc<dyn OcrEngine>,
    permits: Arc<Semaphore>,
    config: OcrConfig,
}

impl OcrPool {
    pub fn new(engine: Arc<dyn OcrEngine>, capacity: usize) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(capacity)),
            config: OcrConfig::default(),
        }
    }

    /// Replace the recognition settings used for every call.
    pub fn with_config(mut self, config: OcrConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of idle workers right now.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run one recognition under a scoped worker lease.
    pub async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OcrError::PoolClosed)?;

        debug!(size = image.len(), "running OCR recognition");
        self.engine.recognize(image, &self.config).await
        // permit drops here, releasing the worker on success and error alike
    }
}
