//! Translation Layer
//!
//! The facade a console front-end talks to. It owns one shell transport,
//! the command history, session state, prompt generator and output
//! parser, and guarantees that at most one execution is in flight.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::CommandHistory;
use crate::models::{CommandEntry, CommandKind, PsOutput};
use crate::parser::OutputParser;
use crate::pipes::{script_invocation, PipeCommunicator, ShellTransport, Termination};
use crate::prompt::{PromptGenerator, PromptStyle};
use crate::session::{SessionState, SessionStateManager, UpdateKind};

/// Expression reporting the PowerShell version
const VERSION_QUERY: &str = "$PSVersionTable.PSVersion.ToString()";

/// Whether an execution is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Idle,
    Executing,
}

/// Returns the layer to `Idle` when dropped
struct ExecutionGuard<'a> {
    state: &'a Mutex<ExecutionState>,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ExecutionState::Idle;
    }
}

/// What an execution submits to the transport
#[derive(Debug, Clone, Copy)]
enum Invocation<'a> {
    Command(&'a str),
    Script(&'a str),
    Selection(&'a str),
}

impl Invocation<'_> {
    fn kind(&self) -> CommandKind {
        match self {
            Invocation::Command(_) => CommandKind::Interactive,
            Invocation::Script(_) => CommandKind::Script,
            Invocation::Selection(_) => CommandKind::Selection,
        }
    }

    /// Text recorded in history
    fn history_text(&self) -> String {
        match self {
            Invocation::Command(text) | Invocation::Selection(text) => text.to_string(),
            Invocation::Script(path) => script_invocation(path),
        }
    }
}

/// Single entry point for executing commands against the shell
pub struct TranslationLayer {
    transport: Arc<dyn ShellTransport>,
    history: CommandHistory,
    session: Arc<SessionStateManager>,
    prompt: RwLock<PromptGenerator>,
    parser: OutputParser,
    state: Mutex<ExecutionState>,
    last_termination: Mutex<Option<Termination>>,
    init_task: Mutex<Option<JoinHandle<()>>>,
    config: Config,
}

impl TranslationLayer {
    /// Start the configured shell and wire every component around it.
    ///
    /// Version and directory are queried in the background once the shell
    /// has settled; failures there leave the defaults in place.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let communicator = PipeCommunicator::new(config.shell.clone(), config.framing.clone());
        communicator.start().await?;

        let layer = Self::with_transport(Arc::new(communicator), config)?;
        if let Err(e) = layer.history.load() {
            warn!("Failed to load history: {}", e);
        }
        layer.spawn_session_init();

        Ok(layer)
    }

    /// Wire the layer around an already running transport
    pub fn with_transport(transport: Arc<dyn ShellTransport>, config: Config) -> Result<Self> {
        let history = match &config.history.path {
            Some(path) => CommandHistory::with_path(config.history.max_entries, path.clone()),
            None => CommandHistory::new(config.history.max_entries)?,
        };

        let mut prompt = PromptGenerator::new();
        if let Some(host) = &config.prompt.remote_host {
            prompt.set_remote_host(host.clone());
        }
        if let Some(format) = &config.prompt.custom_format {
            prompt.set_custom_format(format.clone());
        }
        // the setters switch style; the configured style wins
        prompt.set_style(config.prompt.style);

        Ok(Self {
            transport,
            history,
            session: Arc::new(SessionStateManager::new()),
            prompt: RwLock::new(prompt),
            parser: OutputParser::new(),
            state: Mutex::new(ExecutionState::Idle),
            last_termination: Mutex::new(None),
            init_task: Mutex::new(None),
            config,
        })
    }

    fn spawn_session_init(&self) {
        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let delay = self.config.session.init_delay();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            initialize_session(transport.as_ref(), &session).await;
        });
        *lock(&self.init_task) = Some(handle);
    }

    /// Query version and directory now
    pub async fn initialize_session(&self) {
        initialize_session(self.transport.as_ref(), &self.session).await;
    }

    fn begin_execution(&self) -> Result<ExecutionGuard<'_>> {
        let mut state = lock(&self.state);
        if *state == ExecutionState::Executing {
            return Err(Error::Busy);
        }
        *state = ExecutionState::Executing;
        Ok(ExecutionGuard { state: &self.state })
    }

    /// Run a command typed at the console
    pub async fn execute_command(&self, command: &str) -> Result<String> {
        self.execute(Invocation::Command(command)).await
    }

    /// Run a script file
    pub async fn execute_script(&self, path: &str) -> Result<String> {
        self.execute(Invocation::Script(path)).await
    }

    /// Run a block of editor text as a script
    pub async fn execute_selection(&self, code: &str) -> Result<String> {
        self.execute(Invocation::Selection(code)).await
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<String> {
        let _guard = self.begin_execution()?;
        let kind = invocation.kind();

        let recorded = self.history.add_in(
            &invocation.history_text(),
            kind,
            self.session.current_directory().into(),
        );

        let started = Instant::now();
        let result = match invocation {
            Invocation::Command(command) => self.transport.send_command(command, kind).await,
            Invocation::Script(path) => self.transport.execute_script(path).await,
            Invocation::Selection(code) => self.transport.execute_script_text(code).await,
        };
        let duration = started.elapsed();

        let exit_code = if result.is_ok() { 0 } else { 1 };
        if recorded {
            self.history
                .update_last_entry(duration, result.is_ok(), exit_code);
        }
        self.session.set_last_exit_code(exit_code);

        self.update_directory().await;

        match result {
            Ok(response) => {
                if response.termination.is_timeout() {
                    debug!("{} execution ended by {}", kind, response.termination);
                }
                *lock(&self.last_termination) = Some(response.termination);
                Ok(response.output)
            }
            Err(e) => {
                warn!("{} execution failed: {}", kind, e);
                Err(Error::execution(kind, e))
            }
        }
    }

    /// Refresh the session directory from the shell
    async fn update_directory(&self) {
        let query = SessionStateManager::query_command(UpdateKind::Directory);
        match self.transport.query_state(query).await {
            Ok(raw) => {
                let dir = clean_query_result(&raw);
                if !dir.is_empty() {
                    self.session.set_current_directory(dir);
                }
            }
            Err(e) => debug!("Directory refresh failed: {}", e),
        }
    }

    /// Refresh directory, functions and modules from the shell
    pub async fn sync_state(&self) -> Result<()> {
        let _guard = self.begin_execution()?;
        self.update_directory().await;

        for kind in [UpdateKind::Functions, UpdateKind::Modules] {
            let query = SessionStateManager::query_command(kind);
            let raw = self.transport.query_state(query).await?;
            if raw.trim().is_empty() {
                continue;
            }
            self.session.sync_from_json(raw.as_bytes(), kind)?;
        }
        Ok(())
    }

    /// Interrupt the running command; the execution ends on its own
    pub async fn stop_execution(&self) -> Result<()> {
        self.transport.send_interrupt().await
    }

    pub fn is_executing(&self) -> bool {
        *lock(&self.state) == ExecutionState::Executing
    }

    pub fn execution_state(&self) -> ExecutionState {
        *lock(&self.state)
    }

    /// How the most recent execution's output collection ended
    pub fn last_termination(&self) -> Option<Termination> {
        *lock(&self.last_termination)
    }

    /// Persist history and stop the shell
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(task) = lock(&self.init_task).take() {
            task.abort();
        }

        if let Err(e) = self.history.save() {
            warn!("Failed to save history: {}", e);
        }

        self.transport.stop().await
    }

    // === Output ===

    pub fn parse_output(&self, raw: &str) -> Result<Vec<PsOutput>> {
        self.parser.parse(raw.as_bytes())
    }

    pub fn format_output(&self, output: &PsOutput) -> String {
        self.parser.format_output(output)
    }

    pub fn format_output_with_colors(&self, output: &PsOutput) -> String {
        self.parser.format_with_ansi(output)
    }

    pub fn parser(&self) -> &OutputParser {
        &self.parser
    }

    // === Prompt ===

    pub fn prompt(&self) -> String {
        self.read_prompt().generate(&self.session.current_directory())
    }

    pub fn prompt_ansi(&self) -> String {
        self.read_prompt()
            .generate_ansi(&self.session.current_directory())
    }

    pub fn set_prompt_style(&self, style: PromptStyle) {
        self.write_prompt().set_style(style);
    }

    pub fn set_remote_host(&self, host: &str) {
        self.write_prompt().set_remote_host(host);
    }

    pub fn set_custom_prompt(&self, format: &str) {
        self.write_prompt().set_custom_format(format);
    }

    fn read_prompt(&self) -> RwLockReadGuard<'_, PromptGenerator> {
        self.prompt.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_prompt(&self) -> RwLockWriteGuard<'_, PromptGenerator> {
        self.prompt.write().unwrap_or_else(|e| e.into_inner())
    }

    // === History ===

    /// Older history entry, or an empty line when history is empty
    pub fn history_up(&self) -> String {
        self.history.previous().unwrap_or_default()
    }

    /// Newer history entry, or an empty line past the newest
    pub fn history_down(&self) -> String {
        self.history.next().unwrap_or_default()
    }

    pub fn reset_history_cursor(&self) {
        self.history.reset_cursor();
    }

    pub fn history(&self) -> Vec<CommandEntry> {
        self.history.entries()
    }

    pub fn recent_history(&self, n: usize) -> Vec<CommandEntry> {
        self.history.recent(n)
    }

    pub fn search_history(&self, query: &str) -> Vec<CommandEntry> {
        self.history.search(query)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.history.clear()
    }

    // === Session ===

    pub fn current_directory(&self) -> String {
        self.session.current_directory()
    }

    pub fn ps_version(&self) -> String {
        self.session.ps_version()
    }

    pub fn completions(&self, prefix: &str) -> Vec<String> {
        self.session.completions(prefix)
    }

    pub fn session_state(&self) -> SessionState {
        self.session.snapshot()
    }

    pub fn session(&self) -> &SessionStateManager {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn initialize_session(transport: &dyn ShellTransport, session: &SessionStateManager) {
    match transport.query_state(VERSION_QUERY).await {
        Ok(version) => session.set_ps_version(version.trim()),
        Err(e) => debug!("Version query failed: {}", e),
    }

    let query = SessionStateManager::query_command(UpdateKind::Directory);
    match transport.query_state(query).await {
        Ok(raw) => {
            let dir = clean_query_result(&raw);
            if !dir.is_empty() {
                session.set_current_directory(dir);
            }
        }
        Err(e) => debug!("Directory query failed: {}", e),
    }
}

/// Trim whitespace and one pair of surrounding double quotes
fn clean_query_result(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    trimmed.strip_suffix('"').unwrap_or(trimmed)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
