use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::archive::{EXPORT_VERSION, ExportDocument};
use crate::model::todo::{DataSource, Todo, TodoList};
use crate::port::{Confirmer, StoreError};

/// Error type for import/export operations
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid backup format: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of an import request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// This many items replaced the live collection.
    Imported(usize),
    /// The user declined the overwrite; nothing changed.
    Aborted,
}

/// The accepted import shape: a `todos` array. Extra fields (exportedAt,
/// version, anything a future writer adds) are ignored.
#[derive(Deserialize)]
struct ImportDoc {
    todos: Vec<Todo>,
}

/// Parse and validate a backup document.
pub fn parse_import(json: &str) -> Result<Vec<Todo>, TransferError> {
    serde_json::from_str::<ImportDoc>(json)
        .map(|doc| doc.todos)
        .map_err(|e| TransferError::InvalidFormat(e.to_string()))
}

/// Import a backup document, replacing the live collection wholesale
/// after the user confirms the overwrite.
pub fn import_todos(
    list: &mut TodoList,
    json: &str,
    now: DateTime<Utc>,
    confirmer: &mut dyn Confirmer,
) -> Result<ImportOutcome, TransferError> {
    let todos = parse_import(json)?;
    let message = format!(
        "Import {} items? This replaces all current data.",
        todos.len()
    );
    if !confirmer.confirm(&message).is_confirmed() {
        return Ok(ImportOutcome::Aborted);
    }

    let count = todos.len();
    list.data = todos;
    list.touch(now, DataSource::Import);
    Ok(ImportOutcome::Imported(count))
}

/// Build the versioned export document for the current collection.
pub fn export_document(list: &TodoList, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        todos: list.data.clone(),
        exported_at: now,
        version: EXPORT_VERSION.to_string(),
    }
}

/// Serialize the export document as pretty JSON.
pub fn export_json(list: &TodoList, now: DateTime<Utc>) -> String {
    // ExportDocument contains nothing a serializer can reject.
    serde_json::to_string_pretty(&export_document(list, now)).unwrap_or_default()
}

/// Default backup filename: `todos-backup-YYYY-MM-DD-HH-MM-SS.json`.
pub fn default_export_filename(now: DateTime<Utc>) -> String {
    format!("todos-backup-{}.json", now.format("%Y-%m-%d-%H-%M-%S"))
}
