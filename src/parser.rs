//! Output classification
//!
//! Turns raw bytes received from the shell into typed [`PsOutput`] records.
//! CLIXML object streams are decoded first; anything that is not well-formed
//! CLIXML degrades to line-by-line plain text with ANSI styling extracted.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use roxmltree::{Document, Node};

use crate::ansi;
use crate::error::Result;
use crate::models::{PsOutput, StreamKind};

/// Marker line PowerShell prefixes serialized output with
const CLIXML_MARKER: &str = "#< CLIXML";

static CLIXML_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_x([0-9A-Fa-f]{4})_").unwrap_or_else(|e| panic!("invalid escape pattern: {e}"))
});

/// Reasons a payload is not usable CLIXML
#[derive(Debug, thiserror::Error)]
pub enum ClixmlError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unexpected root element <{0}>, expected <Objs>")]
    UnexpectedRoot(String),
}

/// Classifies shell output into stream-tagged records
#[derive(Debug, Clone, Default)]
pub struct OutputParser;

impl OutputParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a response payload.
    ///
    /// Never fails on malformed input: payloads that are not CLIXML are
    /// classified as plain `Output` lines.
    pub fn parse(&self, data: &[u8]) -> Result<Vec<PsOutput>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        match self.parse_clixml(data) {
            Ok(records) => {
                debug!("Parsed CLIXML payload into {} records", records.len());
                Ok(records)
            }
            Err(err) => {
                debug!("CLIXML parse failed ({}), falling back to plain text", err);
                let text = String::from_utf8_lossy(data);
                Ok(self.parse_plain_text(&text))
            }
        }
    }

    /// Decode a CLIXML object stream
    pub fn parse_clixml(&self, data: &[u8]) -> std::result::Result<Vec<PsOutput>, ClixmlError> {
        let text = std::str::from_utf8(data).map_err(|_| ClixmlError::InvalidUtf8)?;
        let text = strip_marker(text);

        let doc = Document::parse(text)?;
        let root = doc.root_element();
        if root.tag_name().name() != "Objs" {
            return Err(ClixmlError::UnexpectedRoot(root.tag_name().name().to_string()));
        }

        let records = root
            .children()
            .filter(Node::is_element)
            .filter_map(|node| match node.tag_name().name() {
                "Obj" => Some(self.convert_object(node)),
                "S" => Some(self.convert_string_record(node)),
                _ => None,
            })
            .collect();

        Ok(records)
    }

    fn convert_object(&self, node: Node<'_, '_>) -> PsOutput {
        let stream = StreamKind::from_attribute(node.attribute("S"));
        let content = node
            .children()
            .find(|child| child.is_element() && child.tag_name().name() == "ToString")
            .map(|child| decode_text(&element_text(child)))
            .unwrap_or_default();

        self.build_record(stream, content)
    }

    fn convert_string_record(&self, node: Node<'_, '_>) -> PsOutput {
        let stream = StreamKind::from_attribute(node.attribute("S"));
        let content = decode_text(&element_text(node));
        self.build_record(stream, content)
    }

    fn build_record(&self, stream: StreamKind, content: String) -> PsOutput {
        let is_formatted = ansi::has_ansi_codes(&content);
        let segments = if content.is_empty() {
            Vec::new()
        } else {
            ansi::parse_ansi(&content)
        };
        PsOutput::new(stream, content).with_segments(segments, is_formatted)
    }

    /// Classify every non-empty line as `Output`
    pub fn parse_plain_text(&self, text: &str) -> Vec<PsOutput> {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| self.build_record(StreamKind::Output, line.to_string()))
            .collect()
    }

    /// Styled runs of `text`
    pub fn parse_ansi(&self, text: &str) -> Vec<crate::models::AnsiSegment> {
        ansi::parse_ansi(text)
    }

    /// Visible text of a record
    pub fn format_output(&self, output: &PsOutput) -> String {
        if !output.is_formatted {
            return output.content.clone();
        }
        ansi::plain_text(&output.ansi_segments)
    }

    /// Record text with each segment re-wrapped in its own SGR style
    pub fn format_with_ansi(&self, output: &PsOutput) -> String {
        if !output.is_formatted {
            return output.content.clone();
        }
        ansi::render_segments(&output.ansi_segments)
    }

    pub fn strip_ansi(&self, text: &str) -> String {
        ansi::strip_ansi(text)
    }

    pub fn has_ansi_codes(&self, text: &str) -> bool {
        ansi::has_ansi_codes(text)
    }

    /// Error text of an error-stream record, empty for any other stream
    pub fn extract_error_message(&self, output: &PsOutput) -> String {
        if output.is_error() {
            output.content.clone()
        } else {
            String::new()
        }
    }

    pub fn is_progress_record(&self, output: &PsOutput) -> bool {
        output.stream == StreamKind::Progress
    }

    /// Display colours `(fg, bg)` for a stream
    pub fn stream_color(&self, stream: StreamKind) -> (u8, u8) {
        match stream {
            StreamKind::Error => (91, 40),
            StreamKind::Warning => (93, 40),
            StreamKind::Verbose => (96, 40),
            StreamKind::Debug => (95, 40),
            StreamKind::Information => (92, 40),
            StreamKind::Output | StreamKind::Progress => (97, 40),
        }
    }
}

fn strip_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix(CLIXML_MARKER) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => text,
    }
}

fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Decode `_xHHHH_` escapes and trim trailing line breaks
fn decode_text(raw: &str) -> String {
    let decoded = CLIXML_ESCAPE.replace_all(raw, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    decoded.trim_end_matches(['\r', '\n']).to_string()
}
