use crate::parsers::markdown::drop_leading_lines;
use regex::Regex;
use std::sync::LazyLock;

/// First top-level heading of the embedded Markdown payload
static PAYLOAD_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+").expect("valid heading pattern"));

/// Length-prefixed chunk marker of the serialization format, e.g. `T47ac,# `
static CHUNK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"T[0-9a-f]+,#\s+").expect("valid chunk marker pattern"));

/// Anchors that start the trailing data block, applied in order
static TRAILER_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^-\s+Continued improvements",
        r"(?m)^c:null$",
        r#"(?m)^\d+:\[\[""#,
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid trailer pattern"))
    .collect()
});

/// Extracts the Markdown payload from a framework-serialized stream
#[derive(Debug, Clone, Copy)]
pub struct ArtifactCleaner {
    /// Masthead lines dropped after the payload is isolated
    pub masthead_lines: usize,
}

impl Default for ArtifactCleaner {
    fn default() -> Self {
        Self { masthead_lines: 28 }
    }
}

impl ArtifactCleaner {
    pub fn new(masthead_lines: usize) -> Self {
        Self { masthead_lines }
    }

    /// Clean an artifact stream
    ///
    /// Every step is best effort: a missing marker leaves the text as it is.
    pub fn clean(&self, raw: &str) -> String {
        let payload = strip_prefix(raw);
        let payload = strip_trailer(payload);
        drop_leading_lines(payload, self.masthead_lines)
    }
}

/// Drop the script/data chunks in front of the payload
pub fn strip_prefix(raw: &str) -> &str {
    if let Some(m) = PAYLOAD_HEADING.find(raw) {
        ::log::info!("Removed {} bytes before the first heading", m.start());
        return &raw[m.start()..];
    }

    if let Some(m) = CHUNK_MARKER.find(raw) {
        if let Some(offset) = raw[m.start()..].find('#') {
            let start = m.start() + offset;
            ::log::info!("Removed {} bytes before the chunk marker payload", start);
            return &raw[start..];
        }
    }

    ::log::warn!("No Markdown heading found; artifact stream left unmodified");
    raw
}

/// Cut the proprietary data block that trails the payload
pub fn strip_trailer(text: &str) -> &str {
    let mut text = text;
    for anchor in TRAILER_ANCHORS.iter() {
        if let Some(m) = anchor.find(text) {
            let before = text.len();
            text = text[..m.start()].trim_end();
            ::log::info!("Removed {} bytes of trailing data", before - text.len());
        }
    }
    text
}
