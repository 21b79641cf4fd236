use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted application settings.
///
/// Every field carries a serde default so documents written by older
/// versions merge with the current defaults at the load boundary —
/// a newly introduced field can never surface as an absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Full days a completed item must age before the archive sweep
    /// picks it up.
    pub archive_days: u32,
    /// Auto-sync interval spec: `<N>m` or `<N>h`; anything else disables.
    pub auto_sync: String,
    /// Stamp of the last settings write, for newest-wins loading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            archive_days: 30,
            auto_sync: "0".to_string(),
            last_update: None,
        }
    }
}

impl Settings {
    /// Adopt a loaded document only if it is newer than what is already
    /// in memory (or the in-memory copy was never stamped).
    pub fn merge_loaded(&mut self, loaded: Settings) {
        match (&self.last_update, &loaded.last_update) {
            (_, None) => {}
            (None, Some(_)) => *self = loaded,
            (Some(current), Some(incoming)) => {
                if incoming > current {
                    *self = loaded;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partial_document_merges_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"archiveDays": 7}"#).unwrap();
        assert_eq!(s.archive_days, 7);
        assert_eq!(s.auto_sync, "0");
        assert!(s.last_update.is_none());
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn merge_loaded_prefers_newer_stamp() {
        let older = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        let mut current = Settings {
            archive_days: 10,
            last_update: Some(newer),
            ..Settings::default()
        };
        current.merge_loaded(Settings {
            archive_days: 99,
            last_update: Some(older),
            ..Settings::default()
        });
        assert_eq!(current.archive_days, 10);

        current.merge_loaded(Settings {
            archive_days: 5,
            last_update: Some(newer + chrono::Duration::days(1)),
            ..Settings::default()
        });
        assert_eq!(current.archive_days, 5);
    }

    #[test]
    fn merge_loaded_ignores_unstamped_document() {
        let mut current = Settings::default();
        current.merge_loaded(Settings {
            archive_days: 99,
            ..Settings::default()
        });
        assert_eq!(current.archive_days, 30);
    }
}
