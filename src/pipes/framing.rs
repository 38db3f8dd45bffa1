//! Command/response framing
//!
//! The child never marks where a response ends, so collection stops on
//! the first of: a bare prompt line, an idle gap after some output, the
//! absolute deadline, or the output stream closing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::{sleep, sleep_until};

use super::queue::LineQueue;

/// Cursor and screen control sequences removed before a line is inspected
static CONTROL_SEQUENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[\?[0-9]+[hl]|\x1b\[H|\x1b\[[0-9;]*J")
        .unwrap_or_else(|e| panic!("invalid control sequence pattern: {e}"))
});

/// Strip cursor/screen control sequences and surrounding whitespace.
/// SGR colour sequences are kept.
pub fn clean_line(line: &str) -> String {
    CONTROL_SEQUENCES.replace_all(line, "").trim().to_string()
}

/// Recognizes prompt and echo lines in the child's output
pub trait PromptDetector: Send + Sync + fmt::Debug {
    /// A bare prompt, meaning the shell is ready for input again
    fn is_prompt(&self, line: &str) -> bool;

    /// The shell's re-print of prompt plus the submitted command
    fn is_echo(&self, line: &str) -> bool;
}

/// PowerShell's `PS <path>> ` prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PsPromptDetector;

impl PromptDetector for PsPromptDetector {
    fn is_prompt(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if !trimmed.ends_with('>') {
            return false;
        }
        trimmed.starts_with("PS ") || !trimmed.contains(char::is_whitespace)
    }

    fn is_echo(&self, line: &str) -> bool {
        let Some(rest) = line.trim_start().strip_prefix("PS ") else {
            return false;
        };
        match rest.find('>') {
            Some(idx) => !rest[idx + 1..].trim().is_empty(),
            None => false,
        }
    }
}

/// Why collection of a response stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A bare prompt line was seen
    Prompt,
    /// No new line arrived within the idle window after output was seen
    Idle,
    /// The absolute ceiling elapsed
    Deadline,
    /// The child's output stream closed
    Exited,
}

impl Termination {
    /// Whether collection ended on a timeout rather than a positive signal
    pub fn is_timeout(&self) -> bool {
        matches!(self, Termination::Idle | Termination::Deadline)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Termination::Prompt => "prompt",
            Termination::Idle => "idle timeout",
            Termination::Deadline => "deadline",
            Termination::Exited => "process exited",
        };
        f.write_str(name)
    }
}

/// Text collected for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Retained lines joined with `\n`, trimmed
    pub output: String,
    pub termination: Termination,
    /// Number of retained lines
    pub lines: usize,
    /// Time from submission to the end of collection
    pub elapsed: Duration,
}

impl CommandResponse {
    /// An empty response, used by transports with nothing to report
    pub fn empty(termination: Termination) -> Self {
        Self {
            output: String::new(),
            termination,
            lines: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Drains a [`LineQueue`] until a termination condition holds
#[derive(Debug)]
pub struct ResponseCollector<'a> {
    detector: &'a dyn PromptDetector,
    idle_timeout: Duration,
    command_timeout: Duration,
}

impl<'a> ResponseCollector<'a> {
    pub fn new(
        detector: &'a dyn PromptDetector,
        idle_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            idle_timeout,
            command_timeout,
        }
    }

    /// Collect one response; the deadline counts from `started`
    pub async fn collect(&self, queue: &LineQueue, started: Instant) -> CommandResponse {
        let deadline = tokio::time::Instant::from_std(started + self.command_timeout);
        let mut retained: Vec<String> = Vec::new();
        let mut echo_skipped = false;

        let termination = loop {
            tokio::select! {
                biased;

                _ = sleep_until(deadline) => break Termination::Deadline,

                line = queue.pop() => {
                    let Some(raw) = line else {
                        break Termination::Exited;
                    };

                    let line = clean_line(&raw);
                    if line.is_empty() {
                        continue;
                    }
                    if !echo_skipped && self.detector.is_echo(&line) {
                        trace!("Skipping echo line: {:?}", line);
                        echo_skipped = true;
                        continue;
                    }
                    if self.detector.is_prompt(&line) {
                        trace!("Prompt detected: {:?}", line);
                        break Termination::Prompt;
                    }

                    trace!("Retained line: {:?}", line);
                    retained.push(line);
                }

                _ = sleep(self.idle_timeout), if !retained.is_empty() => break Termination::Idle,
            }
        };

        let response = CommandResponse {
            output: retained.join("\n").trim().to_string(),
            termination,
            lines: retained.len(),
            elapsed: started.elapsed(),
        };

        debug!(
            "Collected {} lines in {:?} (ended by {})",
            response.lines, response.elapsed, response.termination
        );
        response
    }
}
