// OCR text -> telemetry extraction
//
// Turns the raw text an OCR engine reads off a rendered traffic graph
// into typed telemetry. Extraction is an ordered set of independent
// rules; within each rule the first matching pattern wins, so pattern
// order is part of the contract -- reordering changes which match wins
// on ambiguous text.
//
// The parser is a pure total function: no input makes it fail, every
// rule degrades to an absent field on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Types ────────────────────────────────────────────────────────────

/// Time window of a rendered traffic graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl GraphType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for GraphType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GraphType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown graph type: {other}")),
        }
    }
}

/// One direction's bandwidth reading.
///
/// Values stay as the decimal strings OCR produced -- consumers reparse
/// as needed, so no precision or formatting is lost here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthMetric {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Structured telemetry extracted from one graph image.
///
/// Only `graph_type` and `extracted_text` are guaranteed; everything
/// else is best-effort and absent when its rule found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTelemetry {
    pub graph_type: GraphType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onu_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_timestamps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<BandwidthMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<BandwidthMetric>,
    pub extracted_text: String,
}

// ── Patterns ─────────────────────────────────────────────────────────

/// Axis lists are capped so a pathological OCR result cannot balloon
/// the response.
const MAX_AXIS_ENTRIES: usize = 20;

const UNIT_BITS_PER_SECOND: &str = "bits per second";

fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern compiles")
}

/// ONU identifier candidates, in priority order. First match wins.
static ONU_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // Slash/colon GPON-ONU path, e.g. "gpon-onu_1/6/2:2".
        compiled(r"(?i)gpon[-_ ]?onu[-_ ]?\d+/\d+/\d+:\d+"),
        compiled(r"GPON\d+"),
        compiled(r"HWTC\d+"),
        compiled(r"(?i)ONU[:\s]+([A-Za-z0-9][A-Za-z0-9_/:.-]*)"),
    ]
});

/// `H:MM` / `HH:MM` axis tick. The hour range deliberately reaches 29 to
/// match the source system; minutes are strictly 00-59.
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| compiled(r"\b([0-2]?\d):([0-5]\d)\b"));

/// Decimal number directly followed by a k/M/G magnitude suffix.
static Y_AXIS_VALUE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\b\d+(?:\.\d+)?[kMG]\b"));

/// Unit casing is significant: lowercase "bps" is bits, capital "Bps"
/// is bytes, so only the spelled-out phrases match case-insensitively.
static BITS_LABEL: Lazy<Regex> = Lazy::new(|| compiled(r"(?i:bits\s+per\s+second)|\bbps\b"));
static BYTES_LABEL: Lazy<Regex> = Lazy::new(|| compiled(r"(?i:bytes\s+per\s+second)|\bBps\b"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| compiled(r"\s+"));

const NUMBER: &str = r"(\d+(?:\.\d+)?)";

/// Three-tier fallback patterns for one traffic direction.
struct MetricPatterns {
    /// Tier 1: "direction .. Current: X .. Maximum: Y" in one shot.
    full: Regex,
    /// Tier 2: direction followed by two bare whitespace-separated
    /// numbers, no labels required.
    loose: Regex,
    /// Tier 3: each side located independently.
    current_only: Regex,
    maximum_only: Regex,
}

impl MetricPatterns {
    fn new(direction: &str) -> Self {
        Self {
            full: compiled(&format!(
                r"(?is){direction}\W*?current\s*:?\s*{NUMBER}\W*?maximum\s*:?\s*{NUMBER}"
            )),
            loose: compiled(&format!(r"(?is){direction}\W*([\d.]+)\s+([\d.]+)")),
            current_only: compiled(&format!(r"(?is){direction}.*?current\s*:?\s*{NUMBER}")),
            maximum_only: compiled(&format!(r"(?is){direction}.*?maximum\s*:?\s*{NUMBER}")),
        }
    }
}

static UPLOAD_PATTERNS: Lazy<MetricPatterns> = Lazy::new(|| MetricPatterns::new("upload"));
static DOWNLOAD_PATTERNS: Lazy<MetricPatterns> = Lazy::new(|| MetricPatterns::new("download"));

// ── Parser ───────────────────────────────────────────────────────────

/// Extract structured telemetry from raw OCR text.
///
/// `text` is carried into the result verbatim as `extracted_text`.
pub fn parse_graph_text(text: &str, graph_type: GraphType) -> GraphTelemetry {
    GraphTelemetry {
        graph_type,
        onu_identifier: extract_onu_identifier(text),
        y_axis_values: extract_y_axis_values(text),
        y_axis_label: extract_y_axis_label(text),
        x_axis_timestamps: extract_timestamps(text),
        upload: extract_metric(text, &UPLOAD_PATTERNS),
        download: extract_metric(text, &DOWNLOAD_PATTERNS),
        extracted_text: text.to_owned(),
    }
}

/// Try the identifier patterns in priority order; normalize the winner
/// by trimming and collapsing internal whitespace to hyphens.
fn extract_onu_identifier(text: &str) -> Option<String> {
    for pattern in ONU_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
            return Some(WHITESPACE_RUN.replace_all(raw.trim(), "-").into_owned());
        }
    }
    None
}

/// Collect `HH:MM` ticks: dedup, normalize single-digit hours to two
/// digits, sort lexicographically, cap the list.
fn extract_timestamps(text: &str) -> Option<Vec<String>> {
    let mut ticks = BTreeSet::new();
    for caps in TIMESTAMP.captures_iter(text) {
        let (Some(hour), Some(minute)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        ticks.insert(format!("{:0>2}:{}", hour.as_str(), minute.as_str()));
    }
    if ticks.is_empty() {
        return None;
    }
    Some(ticks.into_iter().take(MAX_AXIS_ENTRIES).collect())
}

/// Collect suffixed axis values, deduplicated in first-occurrence order.
fn extract_y_axis_values(text: &str) -> Option<Vec<String>> {
    let mut values: Vec<String> = Vec::new();
    for m in Y_AXIS_VALUE.find_iter(text) {
        if values.len() == MAX_AXIS_ENTRIES {
            break;
        }
        if !values.iter().any(|v| v == m.as_str()) {
            values.push(m.as_str().to_owned());
        }
    }
    if values.is_empty() { None } else { Some(values) }
}

fn extract_y_axis_label(text: &str) -> Option<String> {
    if BITS_LABEL.is_match(text) {
        Some("bits per second".to_owned())
    } else if BYTES_LABEL.is_match(text) {
        Some("bytes per second".to_owned())
    } else {
        None
    }
}

/// Resolve one direction through the three-tier fallback chain.
///
/// Tiers 1 and 2 capture both sides at once; tier 3 locates each side
/// independently and fills the missing one with "0.00". A direction
/// with no match at any tier stays absent.
fn extract_metric(text: &str, patterns: &MetricPatterns) -> Option<BandwidthMetric> {
    for pattern in [&patterns.full, &patterns.loose] {
        if let Some(caps) = pattern.captures(text) {
            return Some(BandwidthMetric {
                current: caps.get(1).map(|m| m.as_str().to_owned()),
                maximum: caps.get(2).map(|m| m.as_str().to_owned()),
                unit: Some(UNIT_BITS_PER_SECOND.to_owned()),
            });
        }
    }

    let current = patterns
        .current_only
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned());
    let maximum = patterns
        .maximum_only
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned());

    if current.is_none() && maximum.is_none() {
        return None;
    }
    Some(BandwidthMetric {
        current: Some(current.unwrap_or_else(|| "0.00".to_owned())),
        maximum: Some(maximum.unwrap_or_else(|| "0.00".to_owned())),
        unit: Some(UNIT_BITS_PER_SECOND.to_owned()),
    })
}

// ── Tests ────────────────────────────────────────────────────────────
