//! Settings stored as a flat JSON object `{ "settings_id": "raw string" }`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{fire, Observers, SettingsObserver, SettingsProvider};
use crate::error::ProviderError;

type SettingsMap = BTreeMap<String, String>;

pub struct JsonFileSettings {
    path: PathBuf,
    // Contents as of the last read, write or poll; poll diffs against it
    last_seen: SettingsMap,
    observers: Observers,
}

impl JsonFileSettings {
    /// Default location under the platform config dir
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::settings::FILENAME);
        path
    }

    /// Open the settings file at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let last_seen = read_map(&path)?;
        info!(path = %path.display(), entries = last_seen.len(), "opened settings file");
        Ok(Self {
            path,
            last_seen,
            observers: Observers::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_map(path: &Path) -> Result<SettingsMap, ProviderError> {
    if !path.exists() {
        return Ok(SettingsMap::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    if contents.trim().is_empty() {
        return Ok(SettingsMap::new());
    }
    serde_json::from_str(&contents).map_err(|source| ProviderError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Write to a sibling temp file and rename it over `path`, so readers
/// never see a partially written file.
fn write_map(path: &Path, map: &SettingsMap) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }
    let json = serde_json::to_string_pretty(map).map_err(|source| ProviderError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, json).map_err(|e| io_error(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_error(path, e))
}

/// Ids whose value differs between `before` and `after`, including removals
fn changed_ids(before: &SettingsMap, after: &SettingsMap) -> Vec<String> {
    after
        .iter()
        .filter(|(id, value)| before.get(*id) != Some(*value))
        .map(|(id, _)| id.clone())
        .chain(before.keys().filter(|id| !after.contains_key(*id)).cloned())
        .collect()
}

impl SettingsProvider for JsonFileSettings {
    fn read_string(&self, settings_id: &str) -> Result<Option<String>, ProviderError> {
        Ok(read_map(&self.path)?.remove(settings_id))
    }

    fn write_string(&mut self, settings_id: &str, value: &str) -> Result<(), ProviderError> {
        // Re-read so entries written by others since our last look survive
        let mut map = read_map(&self.path)?;
        let outside: Vec<String> = changed_ids(&self.last_seen, &map)
            .into_iter()
            .filter(|id| id != settings_id)
            .collect();
        map.insert(settings_id.to_string(), value.to_string());
        write_map(&self.path, &map)?;
        debug!(path = %self.path.display(), settings_id, "settings file written");

        self.last_seen = map;
        fire(self.observers.for_id(settings_id), settings_id);
        // Other ids edited on disk since the last poll must not be marked seen silently
        for id in outside {
            info!(settings_id = %id, "settings changed on disk");
            fire(self.observers.for_id(&id), &id);
        }
        Ok(())
    }

    fn register_observer(&mut self, settings_id: &str, observer: SettingsObserver) {
        self.observers.register(settings_id, observer);
    }

    fn poll(&mut self) -> Result<(), ProviderError> {
        let current = read_map(&self.path)?;
        let changed = changed_ids(&self.last_seen, &current);
        self.last_seen = current;

        for settings_id in changed {
            info!(settings_id = %settings_id, "settings changed on disk");
            fire(self.observers.for_id(&settings_id), &settings_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(settings: &mut JsonFileSettings, id: &str) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        settings.register_observer(
            id,
            Arc::new(move |id: &str| sink.lock().unwrap().push(id.to_string())),
        );
        seen
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonFileSettings::open(dir.path().join("settings.json")).unwrap();
        assert!(settings.read_string("tare_alarm_manager_constants").unwrap().is_none());
    }

    #[test]
    fn test_write_creates_directory_and_preserves_other_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"other":"keep"}"#).unwrap();

        let mut settings = JsonFileSettings::open(&path).unwrap();
        settings.write_string("id", "k1=2A").unwrap();

        assert_eq!(settings.read_string("id").unwrap().as_deref(), Some("k1=2A"));
        assert_eq!(settings.read_string("other").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_write_into_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("settings.json");
        let mut settings = JsonFileSettings::open(&path).unwrap();
        settings.write_string("id", "").unwrap();
        assert!(path.exists());
        assert_eq!(settings.read_string("id").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileSettings::open(&path),
            Err(ProviderError::Json { .. })
        ));
    }

    #[test]
    fn test_poll_fires_only_for_changed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"a":"1","b":"2"}"#).unwrap();
        let mut settings = JsonFileSettings::open(&path).unwrap();
        let seen_a = recorder(&mut settings, "a");
        let seen_b = recorder(&mut settings, "b");

        settings.poll().unwrap();
        assert!(seen_a.lock().unwrap().is_empty());

        fs::write(&path, r#"{"a":"1","b":"3"}"#).unwrap();
        settings.poll().unwrap();
        assert!(seen_a.lock().unwrap().is_empty());
        assert_eq!(*seen_b.lock().unwrap(), vec!["b".to_string()]);

        fs::write(&path, r#"{"b":"3"}"#).unwrap();
        settings.poll().unwrap();
        assert_eq!(*seen_a.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_write_reports_outside_edits_to_other_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = JsonFileSettings::open(&path).unwrap();
        let seen_am = recorder(&mut settings, "am");
        let seen_js = recorder(&mut settings, "js");

        fs::write(&path, r#"{"js":"js_max_satiated_balance=5A"}"#).unwrap();
        settings.write_string("am", "am_max_satiated_balance=1ck").unwrap();

        assert_eq!(*seen_am.lock().unwrap(), vec!["am".to_string()]);
        assert_eq!(*seen_js.lock().unwrap(), vec!["js".to_string()]);

        // Already reported, so the next poll stays quiet
        settings.poll().unwrap();
        assert_eq!(seen_js.lock().unwrap().len(), 1);
        assert_eq!(
            settings.read_string("js").unwrap().as_deref(),
            Some("js_max_satiated_balance=5A")
        );
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = JsonFileSettings::open(&path).unwrap();
        settings.write_string("id", "k1=2A").unwrap();
        settings.write_string("id", "k1=3A").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["settings.json".to_string()]);
        assert_eq!(settings.read_string("id").unwrap().as_deref(), Some("k1=3A"));
    }

    #[test]
    fn test_own_write_fires_observer_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = JsonFileSettings::open(dir.path().join("settings.json")).unwrap();
        let seen = recorder(&mut settings, "id");

        settings.write_string("id", "x").unwrap();
        settings.poll().unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
