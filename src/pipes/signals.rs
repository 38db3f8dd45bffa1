//! Signal delivery to the shell process

use crate::error::{Error, Result};
use std::fmt;

/// Signals the communicator can send to its child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Interrupt signal (Ctrl+C)
    Interrupt,
    /// Termination signal (graceful shutdown)
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Send `signal` to process `pid`
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    #[cfg(unix)]
    {
        send_unix_signal(pid, signal)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(Error::SignalNotSupported {
            signal: signal.to_string(),
            platform: std::env::consts::OS.to_string(),
        })
    }
}

#[cfg(unix)]
fn send_unix_signal(pid: u32, signal: Signal) -> Result<()> {
    use nix::sys::signal::{kill, Signal as NixSignal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| Error::SignalSendFailed {
        signal: signal.to_string(),
        reason: format!("pid {} out of range", pid),
    })?;

    let nix_signal = match signal {
        Signal::Interrupt => NixSignal::SIGINT,
        Signal::Terminate => NixSignal::SIGTERM,
    };

    kill(Pid::from_raw(raw), nix_signal).map_err(|e| Error::SignalSendFailed {
        signal: signal.to_string(),
        reason: e.to_string(),
    })
}
