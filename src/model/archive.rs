use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::todo::Todo;

/// Version tag written into export documents.
pub const EXPORT_VERSION: &str = "1.0";

/// Completed items moved out of the live collection, plus the stamp of
/// the most recent archiving operation. `archived_at` stays absent until
/// the first archive write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedTodos {
    #[serde(default)]
    pub todos: Vec<Todo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl ArchivedTodos {
    /// Append newly archived items. Archiving never drops what was
    /// archived before.
    pub fn append(&mut self, items: Vec<Todo>, now: DateTime<Utc>) {
        self.todos.extend(items);
        self.archived_at = Some(now);
    }
}

/// The versioned backup document produced by export and accepted by
/// import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub todos: Vec<Todo>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}
