//! Core data models for psbridge
//!
//! Plain data carried between the pipe layer, the parser, the history
//! queue and the GUI.

pub mod command_entry;
pub mod ps_output;

// Re-exports for convenience
pub use command_entry::{CommandEntry, CommandKind};
pub use ps_output::{AnsiSegment, PsOutput, StreamKind, DEFAULT_BG, DEFAULT_FG};
