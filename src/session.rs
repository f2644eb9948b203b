use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Session key holding the active resource tab token.
pub const TAB_KEY: &str = "ztunnelTab";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SessionFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// String key/value store persisted across runs, so selections like the
/// active tab survive a relaunch. Unrelated keys are left untouched on
/// `set`. Load and persist failures degrade to in-memory operation.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SessionStore {
    pub fn discover() -> Self {
        match discover_session_path() {
            Some(path) => Self::at_path(path),
            None => Self::in_memory(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: BTreeMap::new(),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        let values = match load_values(&path) {
            Ok(values) => values,
            Err(error) => {
                warn!("session state unavailable: {error:#}");
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        if let Err(error) = self.persist() {
            warn!("failed to persist session state: {error:#}");
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory {}", parent.display())
            })?;
        }

        let file = SessionFile {
            values: self.values.clone(),
        };
        let raw = serde_yaml::to_string(&file).context("failed to serialize session state")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write session state {}", path.display()))?;
        Ok(())
    }
}

fn load_values(path: &PathBuf) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read session state {}", path.display()))?;
    let parsed: SessionFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse session state {}", path.display()))?;
    Ok(parsed.values)
}

fn discover_session_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ZLENS_SESSION")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/zlens/session.yaml"))
}

#[cfg(test)]
mod tests {
    use super::{SessionStore, TAB_KEY};
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("zlens-session-{}-{name}.yaml", std::process::id()))
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let store = SessionStore::at_path(scratch_path("missing"));
        assert_eq!(store.get(TAB_KEY), None);
    }

    #[test]
    fn set_round_trips_through_the_file() {
        let path = scratch_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let mut store = SessionStore::at_path(path.clone());
        store.set(TAB_KEY, "workloads");
        store.set("mainTab", "info");

        let reloaded = SessionStore::at_path(path.clone());
        assert_eq!(reloaded.get(TAB_KEY), Some("workloads"));
        assert_eq!(reloaded.get("mainTab"), Some("info"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn set_preserves_unrelated_keys() {
        let mut store = SessionStore::in_memory();
        store.set("mainTab", "info");
        store.set(TAB_KEY, "services");
        assert_eq!(store.get("mainTab"), Some("info"));
        assert_eq!(store.get(TAB_KEY), Some("services"));
    }
}
