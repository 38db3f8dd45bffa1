//! Pipe Communicator
//!
//! Owns the shell child process, its three standard streams and the two
//! reader tasks that feed the line queue. Commands are written to stdin
//! and their responses framed by [`ResponseCollector`].

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::framing::{CommandResponse, PromptDetector, PsPromptDetector, ResponseCollector};
use super::queue::LineQueue;
use super::signals::{self, Signal};
use super::transport::ShellTransport;
use crate::config::{FramingConfig, ShellConfig};
use crate::error::{Error, Result};
use crate::models::CommandKind;

/// Grace period between SIGTERM and a hard kill on stop
const TERMINATE_GRACE: Duration = Duration::from_millis(250);

/// A running child and the tasks reading from it
struct ShellProcess {
    child: Child,
    stdin: ChildStdin,
    readers: Vec<JoinHandle<()>>,
}

impl ShellProcess {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');

        self.stdin
            .write_all(data.as_bytes())
            .await
            .map_err(|e| Error::WriteFailed {
                reason: e.to_string(),
            })?;
        self.stdin.flush().await.map_err(|e| Error::WriteFailed {
            reason: e.to_string(),
        })
    }
}

/// Drives an interactive shell over anonymous pipes
pub struct PipeCommunicator {
    shell: ShellConfig,
    framing: FramingConfig,
    detector: Arc<dyn PromptDetector>,
    running: Arc<AtomicBool>,
    /// 0 when no child is attached
    pid: AtomicU32,
    queue: Mutex<Arc<LineQueue>>,
    process: AsyncMutex<Option<ShellProcess>>,
}

impl PipeCommunicator {
    pub fn new(shell: ShellConfig, framing: FramingConfig) -> Self {
        Self::with_detector(shell, framing, Arc::new(PsPromptDetector))
    }

    /// Use an alternate prompt/echo heuristic
    pub fn with_detector(
        shell: ShellConfig,
        framing: FramingConfig,
        detector: Arc<dyn PromptDetector>,
    ) -> Self {
        let queue = Arc::new(LineQueue::new(framing.queue_capacity));
        Self {
            shell,
            framing,
            detector,
            running: Arc::new(AtomicBool::new(false)),
            pid: AtomicU32::new(0),
            queue: Mutex::new(queue),
            process: AsyncMutex::new(None),
        }
    }

    fn queue(&self) -> Arc<LineQueue> {
        Arc::clone(&self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Spawn the shell, start the readers and run the init sequence
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.process.lock().await;
        if slot.is_some() && self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        if let Some(stale) = slot.take() {
            Self::shutdown_process(stale).await;
        }

        info!(
            "Starting shell: {} {}",
            self.shell.executable,
            self.shell.args.join(" ")
        );

        let mut child = Command::new(&self.shell.executable)
            .args(&self.shell.args)
            .envs(&self.shell.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ProcessSpawnFailed {
                command: self.shell.executable.clone(),
                reason: e.to_string(),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(Error::PipeUnavailable { stream: "stdin" })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(Error::PipeUnavailable { stream: "stdout" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(Error::PipeUnavailable { stream: "stderr" })?;

        let queue = Arc::new(LineQueue::new(self.framing.queue_capacity));
        *self.queue.lock().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&queue);

        self.running.store(true, Ordering::SeqCst);
        self.pid.store(child.id().unwrap_or(0), Ordering::SeqCst);

        let readers = vec![
            spawn_reader(stdout, "stdout", Arc::clone(&queue), Some(Arc::clone(&self.running))),
            spawn_reader(stderr, "stderr", Arc::clone(&queue), None),
        ];

        let mut process = ShellProcess {
            child,
            stdin,
            readers,
        };

        if let Err(e) = self.initialize(&mut process, &queue).await {
            warn!("Shell initialization failed: {}", e);
            self.running.store(false, Ordering::SeqCst);
            self.pid.store(0, Ordering::SeqCst);
            Self::shutdown_process(process).await;
            return Err(e);
        }

        info!("Shell started with pid {}", self.pid());
        *slot = Some(process);
        Ok(())
    }

    /// Discard the banner and run the configured init commands
    async fn initialize(&self, process: &mut ShellProcess, queue: &LineQueue) -> Result<()> {
        tokio::time::sleep(self.shell.settle_delay()).await;
        let banner = queue.flush();
        debug!("Discarded {} banner lines", banner);

        if self.shell.init_commands.is_empty() {
            return Ok(());
        }

        for command in &self.shell.init_commands {
            process.write_line(command).await?;
        }
        tokio::time::sleep(self.shell.init_delay()).await;
        queue.flush();
        Ok(())
    }

    /// Send one command and collect its response
    pub async fn send_command(&self, command: &str, kind: CommandKind) -> Result<CommandResponse> {
        if !self.is_running() {
            return Err(Error::ProcessNotRunning);
        }

        let mut slot = self.process.lock().await;
        let process = slot.as_mut().ok_or(Error::ProcessNotRunning)?;
        let queue = self.queue();

        let stale = queue.flush();
        if stale > 0 {
            debug!("Flushed {} stale lines before command", stale);
        }

        debug!("Sending {} command ({} bytes)", kind, command.len());
        let started = Instant::now();
        process.write_line(command).await?;

        tokio::time::sleep(self.framing.initial_delay()).await;

        let collector = ResponseCollector::new(
            self.detector.as_ref(),
            self.framing.idle_timeout(),
            self.framing.command_timeout(),
        );
        Ok(collector.collect(&queue, started).await)
    }

    /// Send SIGINT to the shell
    pub fn send_interrupt(&self) -> Result<()> {
        let pid = self.pid();
        if !self.is_running() || pid == 0 {
            return Err(Error::ProcessNotRunning);
        }
        debug!("Sending interrupt to pid {}", pid);
        signals::send_signal(pid, Signal::Interrupt)
    }

    /// Terminate the shell and reap it; a no-op when nothing is attached
    pub async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        let process = self.process.lock().await.take();
        self.pid.store(0, Ordering::SeqCst);
        self.queue().close();

        if let Some(process) = process {
            Self::shutdown_process(process).await;
            info!("Shell stopped");
        }
        Ok(())
    }

    async fn shutdown_process(process: ShellProcess) {
        let ShellProcess {
            mut child,
            stdin,
            readers,
        } = process;

        for reader in &readers {
            reader.abort();
        }
        drop(stdin);

        if let Some(pid) = child.id() {
            if let Err(e) = signals::send_signal(pid, Signal::Terminate) {
                debug!("Terminate signal not delivered: {}", e);
            }
        }

        match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("Shell exited with {}", status),
            Ok(Err(e)) => warn!("Failed to reap shell: {}", e),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill shell: {}", e);
                }
            }
        }
    }

    /// Child process id, 0 when not running
    pub fn pid(&self) -> u32 {
        self.pid.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Discard buffered output, returning the number of lines dropped
    pub fn flush_output(&self) -> usize {
        self.queue().flush()
    }

    /// Lines lost to queue overflow since the last start
    pub fn dropped_lines(&self) -> u64 {
        self.queue().dropped()
    }

    pub fn shell_config(&self) -> &ShellConfig {
        &self.shell
    }

    pub fn framing_config(&self) -> &FramingConfig {
        &self.framing
    }
}

impl std::fmt::Debug for PipeCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeCommunicator")
            .field("executable", &self.shell.executable)
            .field("pid", &self.pid())
            .field("running", &self.is_running())
            .field("detector", &self.detector)
            .finish()
    }
}

#[async_trait]
impl ShellTransport for PipeCommunicator {
    async fn send_command(&self, command: &str, kind: CommandKind) -> Result<CommandResponse> {
        PipeCommunicator::send_command(self, command, kind).await
    }

    async fn send_interrupt(&self) -> Result<()> {
        PipeCommunicator::send_interrupt(self)
    }

    async fn stop(&self) -> Result<()> {
        PipeCommunicator::stop(self).await
    }

    fn is_running(&self) -> bool {
        PipeCommunicator::is_running(self)
    }
}

/// Forward lines from one stream into the queue until EOF.
///
/// `running` is cleared at EOF; only the stdout reader carries it.
fn spawn_reader<R>(
    stream: R,
    name: &'static str,
    queue: Arc<LineQueue>,
    running: Option<Arc<AtomicBool>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        debug!("Started {} reader", name);
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']);
                    trace!("[{}] {:?}", name, line);
                    queue.push(line.to_string());
                }
                Err(e) => {
                    warn!("Error reading {}: {}", name, e);
                    break;
                }
            }
        }

        debug!("{} reader reached end of stream", name);
        if let Some(running) = running {
            running.store(false, Ordering::SeqCst);
            queue.close();
        }
    })
}
