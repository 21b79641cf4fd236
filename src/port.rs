//! Contracts for the engine's external collaborators: storage, the
//! confirmation prompt, and the remote sync transport. The engine only
//! ever talks to these traits; the CLI wires in real implementations and
//! the tests wire in scripted fakes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{ArchivedTodos, Settings, TodoList};

// ---------------------------------------------------------------------------
// Confirmation port
// ---------------------------------------------------------------------------

/// Outcome of a yes/no prompt. Declining is ordinary control flow — it is
/// never surfaced as an error and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Declined,
    /// The prompt was dismissed without an answer (closed dialog,
    /// end-of-input on a terminal). Treated like a decline everywhere.
    Cancelled,
}

impl Decision {
    pub fn is_confirmed(self) -> bool {
        self == Decision::Confirmed
    }
}

/// Asks the user a yes/no question and waits for the answer.
pub trait Confirmer {
    fn confirm(&mut self, message: &str) -> Decision;
}

// ---------------------------------------------------------------------------
// Persistence port
// ---------------------------------------------------------------------------

/// Error type for persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Other(String),
}

/// Typed document storage for the engine's persisted state.
///
/// `load_todos` must tolerate the legacy bare-array document and
/// normalize it to the current shape; `load_settings` merges partial
/// documents with defaults. On any save failure the caller keeps its
/// in-memory state unchanged.
pub trait TodoStore {
    fn load_todos(&mut self) -> Result<Option<TodoList>, StoreError>;
    fn save_todos(&mut self, todos: &TodoList) -> Result<(), StoreError>;

    fn load_archive(&mut self) -> Result<ArchivedTodos, StoreError>;
    fn save_archive(&mut self, archive: &ArchivedTodos) -> Result<(), StoreError>;
    fn clear_archive(&mut self) -> Result<(), StoreError>;

    fn load_settings(&mut self) -> Result<Settings, StoreError>;
    fn save_settings(&mut self, settings: &Settings) -> Result<(), StoreError>;

    fn load_remote_config(&mut self) -> Result<Option<RemoteConfig>, StoreError>;
    fn save_remote_config(&mut self, config: &RemoteConfig) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Sync transport port
// ---------------------------------------------------------------------------

/// Connection settings for the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Error from the remote transport, carrying the underlying message.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// What a remote sync pass reported back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub synced_items: usize,
}

/// Driver for the remote store. Connection, schema setup, and the sync
/// pass itself (the remote side decides direction by last-writer-wins).
pub trait SyncTransport {
    /// Probe whether the remote is reachable with this configuration.
    fn test_connection(&mut self, config: &RemoteConfig) -> Result<bool, TransportError>;
    /// Establish the connection used by later calls.
    fn connect(&mut self, config: &RemoteConfig) -> Result<(), TransportError>;
    /// Verify or create the remote schema; returns a human-readable summary.
    fn ensure_schema(&mut self) -> Result<String, TransportError>;
    /// Run one sync pass.
    fn run_sync(&mut self) -> Result<SyncReport, TransportError>;
}
