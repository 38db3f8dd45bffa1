//! Session state tracking
//!
//! Mirrors what is known about the live PowerShell session (location,
//! version, last exit code, and the variables, functions and modules
//! reported by state queries) so the console can render prompts and
//! completions without round-tripping to the child.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;

/// Default error action preference of a fresh session
pub const DEFAULT_ERROR_ACTION: &str = "Continue";

/// A variable reported by the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VariableInfo {
    pub name: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    pub value: String,
    pub description: String,
}

/// A function reported by the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FunctionInfo {
    pub name: String,
    pub parameters: Vec<String>,
    pub synopsis: String,
}

/// A module loaded in the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub path: String,
}

/// Which part of the session a query refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Directory,
    Variables,
    Functions,
    Modules,
    ExitCode,
}

/// Snapshot of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub current_directory: String,
    pub ps_version: String,
    pub last_exit_code: i32,
    pub error_action_pref: String,
    pub last_sync: DateTime<Utc>,
    pub variables: HashMap<String, VariableInfo>,
    pub functions: HashMap<String, FunctionInfo>,
    pub modules: Vec<ModuleInfo>,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            current_directory: std::env::current_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ps_version: String::new(),
            last_exit_code: 0,
            error_action_pref: DEFAULT_ERROR_ACTION.to_string(),
            last_sync: Utc::now(),
            variables: HashMap::new(),
            functions: HashMap::new(),
            modules: Vec::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::fresh()
    }
}

/// `ConvertTo-Json` emits a bare object for single-element pipelines
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn parse_list<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>> {
    Ok(match serde_json::from_slice::<OneOrMany<T>>(data)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Thread-safe owner of the session snapshot
#[derive(Debug, Default)]
pub struct SessionStateManager {
    state: RwLock<SessionState>,
}

impl SessionStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current_directory(&self) -> String {
        self.read().current_directory.clone()
    }

    /// Set the working directory and mark the session as synced
    pub fn set_current_directory(&self, dir: impl Into<String>) {
        let mut state = self.write();
        state.current_directory = dir.into();
        state.last_sync = Utc::now();
    }

    pub fn ps_version(&self) -> String {
        self.read().ps_version.clone()
    }

    pub fn set_ps_version(&self, version: impl Into<String>) {
        self.write().ps_version = version.into();
    }

    pub fn last_exit_code(&self) -> i32 {
        self.read().last_exit_code
    }

    pub fn set_last_exit_code(&self, code: i32) {
        self.write().last_exit_code = code;
    }

    pub fn error_action_pref(&self) -> String {
        self.read().error_action_pref.clone()
    }

    pub fn set_error_action_pref(&self, pref: impl Into<String>) {
        self.write().error_action_pref = pref.into();
    }

    pub fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.read().variables.get(name).cloned()
    }

    pub fn set_variable(&self, info: VariableInfo) {
        self.write().variables.insert(info.name.clone(), info);
    }

    pub fn variables(&self) -> HashMap<String, VariableInfo> {
        self.read().variables.clone()
    }

    pub fn function(&self, name: &str) -> Option<FunctionInfo> {
        self.read().functions.get(name).cloned()
    }

    pub fn set_function(&self, info: FunctionInfo) {
        self.write().functions.insert(info.name.clone(), info);
    }

    pub fn functions(&self) -> HashMap<String, FunctionInfo> {
        self.read().functions.clone()
    }

    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.read().modules.clone()
    }

    pub fn set_modules(&self, modules: Vec<ModuleInfo>) {
        self.write().modules = modules;
    }

    pub fn clear_variables(&self) {
        self.write().variables.clear();
    }

    pub fn clear_functions(&self) {
        self.write().functions.clear();
    }

    /// Completion candidates for `prefix`, sorted.
    ///
    /// A leading `$` completes variable names; function names are matched
    /// against the prefix as typed. Matching ignores case.
    pub fn completions(&self, prefix: &str) -> Vec<String> {
        let state = self.read();
        let mut out = Vec::new();

        if let Some(var_prefix) = prefix.strip_prefix('$') {
            out.extend(
                state
                    .variables
                    .keys()
                    .filter(|name| starts_with_ignore_case(name, var_prefix))
                    .map(|name| format!("${}", name)),
            );
        }

        out.extend(
            state
                .functions
                .keys()
                .filter(|name| starts_with_ignore_case(name, prefix))
                .cloned(),
        );

        out.sort();
        out
    }

    /// Apply the JSON result of a state query
    pub fn sync_from_json(&self, data: &[u8], kind: UpdateKind) -> Result<()> {
        match kind {
            UpdateKind::Directory => {
                let dir: String = serde_json::from_slice(data)?;
                self.write().current_directory = dir;
            }
            UpdateKind::Variables => {
                let vars: Vec<VariableInfo> = parse_list(data)?;
                let mut state = self.write();
                for var in vars {
                    state.variables.insert(var.name.clone(), var);
                }
            }
            UpdateKind::Functions => {
                let funcs: Vec<FunctionInfo> = parse_list(data)?;
                let mut state = self.write();
                for func in funcs {
                    state.functions.insert(func.name.clone(), func);
                }
            }
            UpdateKind::Modules => {
                let modules: Vec<ModuleInfo> = parse_list(data)?;
                self.write().modules = modules;
            }
            UpdateKind::ExitCode => {
                let code: i32 = serde_json::from_slice(data)?;
                self.write().last_exit_code = code;
            }
        }

        self.write().last_sync = Utc::now();
        debug!("Session state synced: {:?}", kind);
        Ok(())
    }

    /// PowerShell expression whose output refreshes `kind`
    pub fn query_command(kind: UpdateKind) -> &'static str {
        match kind {
            UpdateKind::Directory => "(Get-Location).Path",
            UpdateKind::Variables => {
                "Get-Variable | Select-Object Name, @{Name='Type';Expression={if ($null -ne $_.Value) { $_.Value.GetType().Name } else { '' }}}, @{Name='Value';Expression={\"$($_.Value)\"}} | ConvertTo-Json -Compress"
            }
            UpdateKind::Functions => {
                "Get-Command -CommandType Function | Select-Object Name | ConvertTo-Json -Compress"
            }
            UpdateKind::Modules => {
                "Get-Module | Select-Object Name, @{Name='Version';Expression={$_.Version.ToString()}}, Path | ConvertTo-Json -Compress"
            }
            UpdateKind::ExitCode => "$LASTEXITCODE | ConvertTo-Json",
        }
    }

    pub fn last_sync(&self) -> DateTime<Utc> {
        self.read().last_sync
    }

    /// Whether the snapshot is older than `max_age`
    pub fn needs_sync(&self, max_age: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.read().last_sync);
        age.to_std().map(|age| age > max_age).unwrap_or(false)
    }

    /// Copy of the whole snapshot
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    /// Discard everything known about the session
    pub fn reset(&self) {
        *self.write() = SessionState::fresh();
    }
}

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    name.chars().count() >= prefix.chars().count()
        && name
            .chars()
            .zip(prefix.chars())
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
}
