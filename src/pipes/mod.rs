//! Shell Pipe Communication
//!
//! Drives an interactive shell over its standard streams: process
//! lifecycle, the reader tasks and line queue, response framing, and
//! signal delivery.

pub mod communicator;
pub mod framing;
pub mod queue;
pub mod signals;
pub mod transport;

// Re-exports for convenience
pub use communicator::PipeCommunicator;
pub use framing::{
    clean_line, CommandResponse, PromptDetector, PsPromptDetector, ResponseCollector, Termination,
};
pub use queue::LineQueue;
pub use signals::Signal;
pub use transport::{script_invocation, stage_script, ShellTransport};
