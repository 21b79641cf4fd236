use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::model::{ArchivedTodos, Settings, Todo, TodoList};
use crate::port::{RemoteConfig, StoreError, TodoStore};

const TODOS_FILE: &str = "todos.json";
const ARCHIVE_FILE: &str = "archive.json";
const SETTINGS_FILE: &str = "settings.json";
const REMOTE_CONFIG_FILE: &str = "remote.json";

/// JSON document store over a data directory.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

/// Accepted on-disk shapes for the todos document. Older versions wrote
/// a bare array; it is normalized to the current shape at this boundary
/// and never carried further.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TodoDoc {
    Current(TodoList),
    Legacy(Vec<Todo>),
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            data_dir: data_dir.into(),
        }
    }

    /// The platform data directory for sprig.
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        dirs::data_dir()
            .map(|d| d.join("sprig"))
            .ok_or_else(|| StoreError::Other("could not determine a data directory".into()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Read and parse a JSON file; `Ok(None)` when the file is absent.
    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Read { path, source: e }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Parse { path, source: e })
    }

    /// Serialize pretty and write atomically.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path(name);
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::Write {
            path: self.data_dir.clone(),
            source: e,
        })?;
        let content = serde_json::to_string_pretty(value).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?;
        atomic_write(&path, content.as_bytes()).map_err(|e| StoreError::Write { path, source: e })
    }
}

impl TodoStore for JsonFileStore {
    fn load_todos(&mut self) -> Result<Option<TodoList>, StoreError> {
        Ok(self.read_json::<TodoDoc>(TODOS_FILE)?.map(|doc| match doc {
            TodoDoc::Current(list) => list,
            TodoDoc::Legacy(data) => TodoList::from_legacy(data, Utc::now()),
        }))
    }

    fn save_todos(&mut self, todos: &TodoList) -> Result<(), StoreError> {
        self.write_json(TODOS_FILE, todos)
    }

    fn load_archive(&mut self) -> Result<ArchivedTodos, StoreError> {
        Ok(self.read_json(ARCHIVE_FILE)?.unwrap_or_default())
    }

    fn save_archive(&mut self, archive: &ArchivedTodos) -> Result<(), StoreError> {
        self.write_json(ARCHIVE_FILE, archive)
    }

    fn clear_archive(&mut self) -> Result<(), StoreError> {
        let path = self.path(ARCHIVE_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write { path, source: e }),
        }
    }

    fn load_settings(&mut self) -> Result<Settings, StoreError> {
        // A malformed settings file falls back to defaults rather than
        // blocking startup; missing fields merge via serde defaults.
        match self.read_json::<Settings>(SETTINGS_FILE) {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) | Err(StoreError::Parse { .. }) => Ok(Settings::default()),
            Err(e) => Err(e),
        }
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<(), StoreError> {
        self.write_json(SETTINGS_FILE, settings)
    }

    fn load_remote_config(&mut self) -> Result<Option<RemoteConfig>, StoreError> {
        self.read_json(REMOTE_CONFIG_FILE)
    }

    fn save_remote_config(&mut self, config: &RemoteConfig) -> Result<(), StoreError> {
        self.write_json(REMOTE_CONFIG_FILE, config)
    }
}

/// Write via a temp file in the same directory, then rename into place.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataSource;
    use chrono::{DateTime, TimeZone};
    use tempfile::TempDir;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn todos_round_trip() {
        let (_dir, mut store) = store();
        let mut list = TodoList::new(ts());
        list.data.push(Todo::new("a".into(), "one".into(), ts()));
        store.save_todos(&list).unwrap();
        let loaded = store.load_todos().unwrap().unwrap();
        assert_eq!(loaded, list);
    }

    #[test]
    fn missing_todos_file_loads_as_none() {
        let (_dir, mut store) = store();
        assert!(store.load_todos().unwrap().is_none());
    }

    #[test]
    fn legacy_bare_array_is_normalized() {
        let (dir, mut store) = store();
        fs::write(
            dir.path().join(TODOS_FILE),
            r#"[{"id":"a","text":"old","completed":false,"createdAt":"2025-06-01T12:00:00Z"}]"#,
        )
        .unwrap();
        let loaded = store.load_todos().unwrap().unwrap();
        assert_eq!(loaded.data.len(), 1);
        assert_eq!(loaded.data[0].id, "a");
        assert_eq!(loaded.source, DataSource::Manual);
    }

    #[test]
    fn malformed_todos_file_is_an_error() {
        let (dir, mut store) = store();
        fs::write(dir.path().join(TODOS_FILE), "not json {{{").unwrap();
        assert!(matches!(
            store.load_todos(),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn archive_defaults_to_empty_and_round_trips() {
        let (_dir, mut store) = store();
        assert!(store.load_archive().unwrap().todos.is_empty());

        let mut archive = ArchivedTodos::default();
        archive.append(vec![Todo::new("a".into(), "done".into(), ts())], ts());
        store.save_archive(&archive).unwrap();
        assert_eq!(store.load_archive().unwrap(), archive);

        store.clear_archive().unwrap();
        assert!(store.load_archive().unwrap().todos.is_empty());
    }

    #[test]
    fn clear_archive_tolerates_missing_file() {
        let (_dir, mut store) = store();
        store.clear_archive().unwrap();
    }

    #[test]
    fn settings_default_on_missing_or_malformed() {
        let (dir, mut store) = store();
        assert_eq!(store.load_settings().unwrap(), Settings::default());

        fs::write(dir.path().join(SETTINGS_FILE), "{{{").unwrap();
        assert_eq!(store.load_settings().unwrap(), Settings::default());
    }

    #[test]
    fn partial_settings_document_fills_defaults() {
        let (dir, mut store) = store();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{"autoSync":"30m"}"#).unwrap();
        let settings = store.load_settings().unwrap();
        assert_eq!(settings.auto_sync, "30m");
        assert_eq!(settings.archive_days, 30);
    }

    #[test]
    fn remote_config_round_trip() {
        let (_dir, mut store) = store();
        assert!(store.load_remote_config().unwrap().is_none());
        let config = RemoteConfig {
            host: "db.example.com".into(),
            port: 3306,
            username: "todo".into(),
            password: "secret".into(),
            database: "todos".into(),
        };
        store.save_remote_config(&config).unwrap();
        assert_eq!(store.load_remote_config().unwrap(), Some(config));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
