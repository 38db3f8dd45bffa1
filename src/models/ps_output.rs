//! PowerShell Output Model
//!
//! Represents one classified unit of shell output: the stream it belongs
//! to, its visible text, and the styled runs extracted from any ANSI
//! escape sequences it carried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default foreground colour code (white)
pub const DEFAULT_FG: u8 = 37;

/// Default background colour code (black)
pub const DEFAULT_BG: u8 = 40;

/// PowerShell's multiplexed output streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StreamKind {
    #[default]
    Output,
    Error,
    Warning,
    Verbose,
    Debug,
    Progress,
    Information,
}

impl StreamKind {
    /// Map a CLIXML stream attribute to a stream kind.
    ///
    /// Matching is case-insensitive; unknown or missing values map to `Output`.
    pub fn from_attribute(attr: Option<&str>) -> Self {
        let Some(attr) = attr else {
            return StreamKind::Output;
        };

        match attr.trim().to_ascii_lowercase().as_str() {
            "error" => StreamKind::Error,
            "warning" => StreamKind::Warning,
            "verbose" => StreamKind::Verbose,
            "debug" => StreamKind::Debug,
            "progress" => StreamKind::Progress,
            "information" => StreamKind::Information,
            _ => StreamKind::Output,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Output => "Output",
            StreamKind::Error => "Error",
            StreamKind::Warning => "Warning",
            StreamKind::Verbose => "Verbose",
            StreamKind::Debug => "Debug",
            StreamKind::Progress => "Progress",
            StreamKind::Information => "Information",
        };
        f.write_str(name)
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsiSegment {
    /// Visible text of the run
    pub text: String,
    /// Foreground colour code (30-37, 90-97)
    pub fg_color: u8,
    /// Background colour code (40-47, 100-107)
    pub bg_color: u8,
    pub bold: bool,
    pub underline: bool,
    pub italic: bool,
}

impl AnsiSegment {
    /// A segment with default colours and no attributes
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the segment carries any non-default styling
    pub fn is_styled(&self) -> bool {
        self.fg_color != DEFAULT_FG
            || self.bg_color != DEFAULT_BG
            || self.bold
            || self.underline
            || self.italic
    }
}

impl Default for AnsiSegment {
    fn default() -> Self {
        Self {
            text: String::new(),
            fg_color: DEFAULT_FG,
            bg_color: DEFAULT_BG,
            bold: false,
            underline: false,
            italic: false,
        }
    }
}

/// One classified unit of program output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsOutput {
    /// Stream the record was emitted on
    pub stream: StreamKind,

    /// Content as received (may still contain escape sequences)
    pub content: String,

    /// Styled runs of the visible text
    pub ansi_segments: Vec<AnsiSegment>,

    /// Whether ANSI formatting was detected in the content
    pub is_formatted: bool,

    /// When the record was produced
    pub timestamp: DateTime<Utc>,
}

impl PsOutput {
    /// Create an output record without segments
    pub fn new(stream: StreamKind, content: impl Into<String>) -> Self {
        Self {
            stream,
            content: content.into(),
            ansi_segments: Vec::new(),
            is_formatted: false,
            timestamp: Utc::now(),
        }
    }

    /// Attach decoded segments
    pub fn with_segments(mut self, segments: Vec<AnsiSegment>, is_formatted: bool) -> Self {
        self.ansi_segments = segments;
        self.is_formatted = is_formatted;
        self
    }

    /// Whether this record came from the error stream
    pub fn is_error(&self) -> bool {
        self.stream == StreamKind::Error
    }
}
