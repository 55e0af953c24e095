//! Local preference store.
//!
//! A small string-keyed store (the dashboard's equivalent of browser local
//! storage). Values are JSON-encoded strings. Reads never fail: a missing
//! entry yields the caller's default, and a corrupt entry is purged before
//! the default is returned. Writes are best effort and only logged on error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{CharwatchError, Result};
use crate::logging::charwatch_home;

/// Logical preference keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKey {
    /// Ordered selection (JSON array of names)
    Selection,
    /// Roster panel collapsed (boolean)
    PanelCollapsed,
    /// Color theme (`"light"` | `"dark"`)
    Theme,
    /// Info-bar field keys (JSON array of strings)
    InfoBarItems,
}

impl PrefKey {
    /// Storage key.
    pub const fn as_str(self) -> &'static str {
        match self {
            PrefKey::Selection => "characterViewerSelection",
            PrefKey::PanelCollapsed => "characterViewerListCollapsed",
            PrefKey::Theme => "characterViewerTheme",
            PrefKey::InfoBarItems => "characterViewerInfoBarItems",
        }
    }
}

/// Persisted color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }
}

/// Raw string key-value backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// File backend: one JSON object of string values, rewritten on each change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Default location: `~/.charwatch/preferences.json`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(charwatch_home()?.join("preferences.json"))
    }

    /// Open (or start) a store at `path`. An unreadable or malformed file
    /// starts an empty store; it is overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CharwatchError::DirectoryCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "preference file is malformed, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(CharwatchError::io("reading preferences", &path, e)),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CharwatchError::json_parse("encoding preferences", e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| CharwatchError::io("writing preferences", &tmp, e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| CharwatchError::io("replacing preferences", &self.path, e))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Typed, failure-tolerant access to a [`KeyValueStore`].
pub struct PreferenceStore {
    backend: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").finish_non_exhaustive()
    }
}

impl PreferenceStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// In-memory store (tests, or when the file store cannot be opened).
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// File store at the default path, falling back to memory on failure.
    pub fn open_default() -> Self {
        match FileStore::default_path().and_then(FileStore::open) {
            Ok(store) => {
                debug!(path = %store.path().display(), "opened preference store");
                Self::new(store)
            }
            Err(e) => {
                error!(error = %e, "preference file unavailable, preferences will not persist");
                Self::in_memory()
            }
        }
    }

    /// Load a typed value.
    ///
    /// `parse` validates the decoded JSON and returns `None` for a wrong
    /// shape. Decode or shape failure purges the entry and yields `default`.
    pub fn load<T>(&mut self, key: PrefKey, parse: impl FnOnce(Value) -> Option<T>, default: T) -> T {
        let raw = match self.backend.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                error!(key = key.as_str(), error = %e, "failed to read preference");
                return default;
            }
        };

        let parsed = serde_json::from_str::<Value>(&raw).ok().and_then(parse);
        match parsed {
            Some(value) => value,
            None => {
                warn!(key = key.as_str(), "corrupt preference value, removing");
                if let Err(e) = self.backend.remove(key.as_str()) {
                    error!(key = key.as_str(), error = %e, "failed to remove corrupt preference");
                }
                default
            }
        }
    }

    /// JSON-encode and store a value. Failures are logged, never returned.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: PrefKey, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(key = key.as_str(), error = %e, "failed to encode preference");
                return;
            }
        };
        if let Err(e) = self.backend.set(key.as_str(), encoded) {
            error!(key = key.as_str(), error = %e, "failed to save preference");
        }
    }

    /// Load the saved selection: distinct string items, at most `capacity`.
    pub fn load_selection(&mut self, capacity: usize) -> Vec<String> {
        self.load(
            PrefKey::Selection,
            |value| match value {
                Value::Array(items) => {
                    let mut names: Vec<String> = Vec::new();
                    for item in items {
                        if names.len() >= capacity {
                            break;
                        }
                        if let Value::String(name) = item {
                            if !names.contains(&name) {
                                names.push(name);
                            }
                        }
                    }
                    Some(names)
                }
                _ => None,
            },
            Vec::new(),
        )
    }

    pub fn load_panel_collapsed(&mut self) -> bool {
        self.load(PrefKey::PanelCollapsed, parse_bool, false)
    }

    pub fn load_theme(&mut self) -> ThemePreference {
        self.load(PrefKey::Theme, parse_theme, ThemePreference::default())
    }

    pub fn load_info_bar_items(&mut self, default: Vec<String>) -> Vec<String> {
        self.load(PrefKey::InfoBarItems, parse_string_list, default)
    }
}

/// Shape check: boolean.
pub fn parse_bool(value: Value) -> Option<bool> {
    value.as_bool()
}

/// Shape check: array whose items are all strings.
pub fn parse_string_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Shape check: `"light"` or `"dark"`.
pub fn parse_theme(value: Value) -> Option<ThemePreference> {
    match value.as_str()? {
        "light" => Some(ThemePreference::Light),
        "dark" => Some(ThemePreference::Dark),
        _ => None,
    }
}
