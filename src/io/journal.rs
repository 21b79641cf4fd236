use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Self-documenting header written at the top of a new journal.
const FILE_HEADER: &str = "\
# sprig failure journal — append-only
# Captures state that sprig could not persist normally.
# If something went missing, check here. Safe to delete when stale.

";

/// Append-only journal of automatic-flow failures.
///
/// When a debounced save, archive sweep, or auto-sync fails, the error —
/// and for saves, the payload that could not be written — lands here so
/// nothing is silently lost. Writes are best-effort: journaling a failure
/// must never itself fail the caller.
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(data_dir: &Path) -> Self {
        Journal {
            path: data_dir.join("journal.log"),
        }
    }

    /// Append one entry. `payload` is the data that failed to persist,
    /// if any.
    pub fn record(&self, category: &str, description: &str, payload: Option<&str>) {
        let _ = self.append(Utc::now(), category, description, payload);
    }

    fn append(
        &self,
        timestamp: DateTime<Utc>,
        category: &str,
        description: &str,
        payload: Option<&str>,
    ) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if is_new {
            file.write_all(FILE_HEADER.as_bytes())?;
        }
        writeln!(
            file,
            "{} [{}] {}",
            timestamp.to_rfc3339(),
            category,
            description
        )?;
        if let Some(body) = payload {
            for line in body.lines() {
                writeln!(file, "    {line}")?;
            }
        }
        Ok(())
    }
}
