use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Opaque string key-value storage, the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// The fixed set of named slots the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    Tasks,
    WeeklyTargets,
    Movies,
    Games,
    Shows,
    Theme,
    ColorMode,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::Tasks,
        Slot::WeeklyTargets,
        Slot::Movies,
        Slot::Games,
        Slot::Shows,
        Slot::Theme,
        Slot::ColorMode,
    ];

    /// Key names are shared with the browser build so a local-storage dump
    /// imports unchanged.
    pub fn key(self) -> &'static str {
        match self {
            Slot::Tasks => "daily_tasks",
            Slot::WeeklyTargets => "weekly_targets",
            Slot::Movies => "cheat_movies",
            Slot::Games => "cheat_games",
            Slot::Shows => "cheat_tv",
            Slot::Theme => "app_theme",
            Slot::ColorMode => "theme",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Slot::ALL.into_iter().find(|slot| slot.key() == key)
    }

    /// Theme and color mode hold a bare string, everything else a JSON array.
    pub fn is_json(self) -> bool {
        !matches!(self, Slot::Theme | Slot::ColorMode)
    }
}

#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "slot file absent");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), "writing slot atomically");

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed creating temp file in {}", dir.display()))?;
        temp.write_all(value.as_bytes())
            .with_context(|| format!("failed writing temp file for {}", path.display()))?;
        temp.flush()
            .with_context(|| format!("failed flushing temp file for {}", path.display()))?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

/// Outcome of reading one slot. `Corrupt` is kept apart from `Missing` so
/// callers can tell a first run from a damaged file.
#[derive(Debug)]
pub enum Loaded<T> {
    Present(T),
    Missing,
    Corrupt,
}

impl<T> Loaded<T> {
    pub fn unwrap_or_else(self, default: impl FnOnce() -> T) -> T {
        match self {
            Loaded::Present(value) => value,
            Loaded::Missing | Loaded::Corrupt => default(),
        }
    }
}

/// Reads and decodes a JSON slot. Unreadable or malformed content is logged
/// and reported as `Corrupt`; the slot is rewritten on the next flush.
#[tracing::instrument(skip(store))]
pub fn load_json<S, T>(store: &S, slot: Slot) -> Loaded<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(slot.key()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Loaded::Missing,
        Err(err) => {
            warn!(slot = slot.key(), error = %err, "failed reading slot; reinitializing");
            return Loaded::Corrupt;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Loaded::Present(value),
        Err(err) => {
            warn!(slot = slot.key(), error = %err, "malformed slot content; reinitializing");
            Loaded::Corrupt
        }
    }
}

#[tracing::instrument(skip(store))]
pub fn load_raw<S>(store: &S, slot: Slot) -> Option<String>
where
    S: KeyValueStore + ?Sized,
{
    match store.get(slot.key()) {
        Ok(value) => value.map(|v| v.trim().to_string()),
        Err(err) => {
            warn!(slot = slot.key(), error = %err, "failed reading slot");
            None
        }
    }
}

pub fn save_json<S, T>(store: &mut S, slot: Slot, value: &T) -> anyhow::Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let serialized = serde_json::to_string(value)
        .with_context(|| format!("failed encoding {}", slot.key()))?;
    store
        .set(slot.key(), &serialized)
        .with_context(|| format!("failed saving {}", slot.key()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_round_trip() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_key(slot.key()), Some(slot));
        }
        assert_eq!(Slot::from_key("nope"), None);
    }

    #[test]
    fn malformed_json_is_reported_corrupt() {
        let mut store = MemoryStore::new();
        store.set("daily_tasks", "{not json").unwrap();

        let loaded: Loaded<Vec<serde_json::Value>> = load_json(&store, Slot::Tasks);
        assert!(matches!(loaded, Loaded::Corrupt));

        let missing: Loaded<Vec<serde_json::Value>> = load_json(&store, Slot::Games);
        assert!(matches!(missing, Loaded::Missing));
    }

    #[test]
    fn file_store_get_set_remove() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(temp.path()).expect("open");

        assert_eq!(store.get("app_theme").unwrap(), None);
        store.set("app_theme", "FANTASY").unwrap();
        assert_eq!(store.get("app_theme").unwrap().as_deref(), Some("FANTASY"));
        assert!(store.path_for("app_theme").exists());

        store.remove("app_theme").unwrap();
        assert_eq!(store.get("app_theme").unwrap(), None);
        store.remove("app_theme").unwrap();
    }

    #[test]
    fn write_into_vanished_dir_names_the_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let data_dir = temp.path().join("data");
        let mut store = FileStore::open(&data_dir).expect("open");
        fs::remove_dir_all(&data_dir).expect("remove data dir");

        let err = store.set("daily_tasks", "[]").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("failed creating temp file in"), "{message}");
        assert!(message.contains(&data_dir.display().to_string()), "{message}");
    }
}
