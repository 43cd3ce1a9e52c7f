//! The `app.devsuite.foundry.*` settings tree: a small GSettings/dconf-like
//! key-value store backed by a JSON file, organized into dotted schema IDs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::Value;
use tracing::instrument;

use crate::errors::{FoundryError, Result};

/// One schema's worth of settings, e.g. `app.devsuite.foundry.build`.
type Schema = HashMap<String, Value>;

/// A settings tree rooted at a single on-disk JSON document, organized as
/// `{ "<schema-id>": { "<key>": <value>, ... }, ... }`.
pub struct Settings {
    path: Option<PathBuf>,
    schemas: RwLock<HashMap<String, Schema>>,
}

impl Settings {
    pub fn in_memory() -> Self {
        Settings {
            path: None,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let schemas = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };
        Ok(Settings {
            path: Some(path),
            schemas: RwLock::new(schemas),
        })
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let schemas = self.schemas.read().expect("settings lock poisoned");
        let contents = serde_json::to_string_pretty(&*schemas)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn get(&self, schema: &str, key: &str) -> Result<Value> {
        self.schemas
            .read()
            .expect("settings lock poisoned")
            .get(schema)
            .and_then(|s| s.get(key))
            .cloned()
            .ok_or_else(|| FoundryError::NotFound(format!("{schema}.{key}")))
    }

    pub fn get_or(&self, schema: &str, key: &str, default: Value) -> Value {
        self.get(schema, key).unwrap_or(default)
    }

    #[instrument(skip(self, value))]
    pub fn set(&self, schema: &str, key: &str, value: Value) -> Result<()> {
        self.schemas
            .write()
            .expect("settings lock poisoned")
            .entry(schema.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist()
    }

    /// The `build.linked-workspaces` key: an array of `(phase, project
    /// directory, linked phase)` triples persisted so pipeline links
    /// survive across `foundry` invocations.
    pub fn linked_workspaces(&self) -> Vec<LinkedWorkspace> {
        match self.get("build", "linked-workspaces") {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub fn set_linked_workspaces(&self, links: &[LinkedWorkspace]) -> Result<()> {
        let value = serde_json::to_value(links)?;
        self.set("build", "linked-workspaces", value)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct LinkedWorkspace {
    pub phase: String,
    pub project_directory: PathBuf,
    pub linked_phase: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_not_found() {
        let settings = Settings::in_memory();
        assert!(settings.get("build", "missing").is_err());
    }

    #[test]
    fn set_then_get_round_trips() {
        let settings = Settings::in_memory();
        settings.set("build", "jobs", Value::from(4)).unwrap();
        assert_eq!(settings.get("build", "jobs").unwrap(), Value::from(4));
    }

    #[test]
    fn linked_workspaces_round_trip() {
        let settings = Settings::in_memory();
        let links = vec![LinkedWorkspace {
            phase: "build".into(),
            project_directory: PathBuf::from("/home/user/other-project"),
            linked_phase: "install".into(),
        }];
        settings.set_linked_workspaces(&links).unwrap();
        let loaded = settings.linked_workspaces();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].phase, "build");
    }

    #[test]
    fn persists_to_disk_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        {
            let settings = Settings::open(&path).unwrap();
            settings.set("editor", "tab-width", Value::from(4)).unwrap();
        }
        let reopened = Settings::open(&path).unwrap();
        assert_eq!(reopened.get("editor", "tab-width").unwrap(), Value::from(4));
    }
}
