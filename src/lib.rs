//! psbridge - a PowerShell translation layer for IDE consoles
//!
//! This library drives a long-lived interactive `pwsh` process over its
//! standard streams and gives a GUI console a request/response API on top
//! of an unstructured line stream.
//!
//! ## Features
//!
//! - **Pipe Protocol:** Child process lifecycle, reader tasks and a bounded line queue
//! - **Response Framing:** Prompt, idle and deadline based command boundaries
//! - **Stream Classification:** CLIXML decoding into PowerShell's seven streams
//! - **ANSI Colors:** SGR parsing into styled segments, re-synthesis and stripping
//! - **History:** Bounded, persisted command history with shell-style navigation
//! - **Prompts:** Default, remote and custom prompt styles
//! - **Configuration:** TOML or JSON configuration files
//!
//! ## Module Organization
//!
//! - [`layer`] - The [`TranslationLayer`] facade and single-flight execution
//! - [`pipes`] - Child process, line queue, framing, signals, transport trait
//! - [`parser`] - Raw output to typed [`PsOutput`] records
//! - [`ansi`] - ANSI escape decoding
//! - [`history`] - Command history queue
//! - [`session`] - Session state tracking and completions
//! - [`prompt`] - Prompt generation
//! - [`config`] - Configuration model and loader
//! - [`logging`] - Subscriber setup
//! - [`models`] - Shared data structures
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use psbridge::{ConfigLoader, TranslationLayer};
//!
//! # async fn run() -> psbridge::Result<()> {
//! let config = ConfigLoader::load()?;
//! let layer = TranslationLayer::new(config).await?;
//!
//! let output = layer.execute_command("Get-ChildItem").await?;
//! for record in layer.parse_output(&output)? {
//!     println!("{}", layer.format_output_with_colors(&record));
//! }
//! print!("{}", layer.prompt());
//!
//! layer.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Reader Tasks:** One tokio task per output stream pushes cleaned lines into a shared queue
//! - **Collector:** `send_command` awaits lines until a prompt, an idle window or a deadline
//! - **Layer:** At most one execution in flight; a second caller gets [`Error::Busy`]

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod ansi;
pub mod config;
pub mod error;
pub mod history;
pub mod layer;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pipes;
pub mod prompt;
pub mod session;

// Re-exports for core functionality
pub use config::loader::ConfigLoader;
pub use config::Config;
pub use error::{Error, Result};
pub use layer::{ExecutionState, TranslationLayer};

// Convenience re-exports for common types
pub use history::CommandHistory;
pub use models::{AnsiSegment, CommandEntry, CommandKind, PsOutput, StreamKind};
pub use parser::OutputParser;
pub use pipes::{CommandResponse, PipeCommunicator, ShellTransport, Termination};
pub use prompt::{PromptGenerator, PromptStyle};
pub use session::{SessionState, SessionStateManager};

// Version information
/// The current version of psbridge from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");
