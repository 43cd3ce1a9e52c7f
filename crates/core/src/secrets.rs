//! API-key style secret storage, rotation, and expiry tracking.
//!
//! This crate's in-core store keeps secrets on disk under the context's
//! state directory (mode `0600` on unix), keyed by `(host, service)`. A real
//! deployment is expected to swap this for an OS keyring-backed
//! implementation — that binding is out of scope here, exactly as the
//! original leaves concrete secret-storage backends as a loadable provider
//! rather than baking one into the library.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::{FoundryError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
struct SecretId {
    host: String,
    service: String,
}

#[derive(Default, Serialize, Deserialize)]
struct SecretFile {
    #[serde(flatten)]
    entries: HashMap<String, SecretRecord>,
}

fn secret_key(host: &str, service: &str) -> String {
    format!("{host}\u{1}{service}")
}

/// An on-disk secret store scoped to one path (typically
/// `$XDG_STATE_HOME/foundry/secrets.json`).
pub struct SecretStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, SecretRecord>>,
}

impl SecretStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: SecretFile = serde_json::from_str(&contents)?;
            file.entries
        } else {
            HashMap::new()
        };
        Ok(SecretStore {
            path,
            cache: RwLock::new(entries),
        })
    }

    fn persist(&self) -> Result<()> {
        let entries = self.cache.read().expect("secret store lock poisoned").clone();
        let file = SecretFile { entries };
        let contents = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }
        Ok(())
    }

    #[instrument(skip(self, key), fields(host, service))]
    pub fn set_api_key(&self, host: &str, service: &str, key: impl Into<String>) -> Result<()> {
        let record = SecretRecord {
            key: key.into(),
            created_at: Utc::now(),
            expires_at: None,
        };
        self.cache
            .write()
            .expect("secret store lock poisoned")
            .insert(secret_key(host, service), record);
        self.persist()
    }

    pub fn get_api_key(&self, host: &str, service: &str) -> Result<String> {
        self.cache
            .read()
            .expect("secret store lock poisoned")
            .get(&secret_key(host, service))
            .map(|r| r.key.clone())
            .ok_or_else(|| FoundryError::NotFound(format!("{host}/{service}")))
    }

    /// Replace the stored key for `(host, service)`, optionally setting a
    /// new expiry, keeping `created_at` fresh — "rotation" is just "set
    /// again," but this entry point exists separately so CLI/audit code can
    /// distinguish an intentional rotation from an initial key set.
    #[instrument(skip(self, key))]
    pub fn rotate(
        &self,
        host: &str,
        service: &str,
        key: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let record = SecretRecord {
            key: key.into(),
            created_at: Utc::now(),
            expires_at,
        };
        self.cache
            .write()
            .expect("secret store lock poisoned")
            .insert(secret_key(host, service), record);
        self.persist()
    }

    /// Returns the configured expiry, `None` if the secret never expires.
    pub fn check_expires_at(&self, host: &str, service: &str) -> Result<Option<DateTime<Utc>>> {
        self.cache
            .read()
            .expect("secret store lock poisoned")
            .get(&secret_key(host, service))
            .map(|r| r.expires_at)
            .ok_or_else(|| FoundryError::NotFound(format!("{host}/{service}")))
    }

    pub fn is_expired(&self, host: &str, service: &str) -> Result<bool> {
        Ok(self
            .check_expires_at(host, service)?
            .map(|expiry| expiry <= Utc::now())
            .unwrap_or(false))
    }

    pub fn remove(&self, host: &str, service: &str) -> Result<()> {
        self.cache
            .write()
            .expect("secret store lock poisoned")
            .remove(&secret_key(host, service));
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> (tempfile::TempDir, SecretStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        let store = SecretStore::open(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, store) = store();
        store.set_api_key("api.example.com", "chat", "sk-123").unwrap();
        assert_eq!(store.get_api_key("api.example.com", "chat").unwrap(), "sk-123");
    }

    #[test]
    fn missing_secret_is_not_found() {
        let (_dir, store) = store();
        assert!(store.get_api_key("nowhere", "svc").is_err());
    }

    #[test]
    fn rotate_replaces_key_and_sets_expiry() {
        let (_dir, store) = store();
        store.set_api_key("h", "s", "old-key").unwrap();
        let expiry = Utc::now() + Duration::days(30);
        store.rotate("h", "s", "new-key", Some(expiry)).unwrap();
        assert_eq!(store.get_api_key("h", "s").unwrap(), "new-key");
        assert_eq!(store.check_expires_at("h", "s").unwrap(), Some(expiry));
    }

    #[test]
    fn is_expired_reflects_past_expiry() {
        let (_dir, store) = store();
        let past = Utc::now() - Duration::days(1);
        store.rotate("h", "s", "k", Some(past)).unwrap();
        assert!(store.is_expired("h", "s").unwrap());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        {
            let store = SecretStore::open(&path).unwrap();
            store.set_api_key("h", "s", "persisted").unwrap();
        }
        let reopened = SecretStore::open(&path).unwrap();
        assert_eq!(reopened.get_api_key("h", "s").unwrap(), "persisted");
    }
}
