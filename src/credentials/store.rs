//! Secret persistence.
//!
//! [`SecretStore`] is the seam to the host's secure storage. Two
//! implementations ship with the crate:
//!
//! - [`MemorySecretStore`]: process-local, for tests and embedding.
//! - [`FileSecretStore`]: a flat TOML file of `name = "secret"` pairs.
//!   The file is created with mode 0600 and refused on unix when group or
//!   other permission bits are set.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{AssayError, Result};

/// Named secret storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a secret; `None` when it was never stored.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Store (or overwrite) a secret.
    async fn store(&self, name: &str, value: &str) -> Result<()>;

    /// Delete a secret. Deleting a missing secret is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// In-memory secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one secret.
    pub fn with_secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
        store
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    async fn store(&self, name: &str, value: &str) -> Result<()> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

/// Secrets kept in a TOML file.
///
/// The file is re-read on every access so edits made outside the process
/// are picked up. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
    // Serialises read-modify-write cycles from this process.
    io_lock: Arc<Mutex<()>>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Arc::new(Mutex::new(())),
        }
    }

    /// `~/.assay/secrets.toml`.
    pub fn user_default() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            AssayError::SecretStore("cannot locate home directory for secrets file".to_string())
        })?;
        Ok(Self::new(home.join(".assay").join("secrets.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run file work off the async worker threads.
    async fn on_blocking_pool<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&FileSecretStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = store.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
            work(&store)
        })
            .await
            .map_err(|e| AssayError::SecretStore(format!("secrets file task failed: {e}")))?
    }

    fn read_table(&self) -> Result<toml::Table> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        check_permissions(&self.path)?;
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AssayError::SecretStore(format!("Failed to read secrets file {:?}: {e}", self.path))
        })?;
        toml::from_str(&content).map_err(|e| {
            AssayError::SecretStore(format!("Failed to parse secrets file {:?}: {e}", self.path))
        })
    }

    fn write_table(&self, table: &toml::Table) -> Result<()> {
        let content = toml::to_string(table)
            .map_err(|e| AssayError::SecretStore(format!("Failed to encode secrets: {e}")))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AssayError::SecretStore(format!("Failed to create {parent:?}: {e}"))
            })?;
        }
        write_private(&self.path, content.as_bytes()).map_err(|e| {
            AssayError::SecretStore(format!("Failed to write secrets file {:?}: {e}", self.path))
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let name = name.to_string();
        self.on_blocking_pool(move |store| {
            let table = store.read_table()?;
            Ok(table
                .get(&name)
                .and_then(|v| v.as_str())
                .map(str::to_string))
        })
        .await
    }

    async fn store(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = (name.to_string(), value.to_string());
        self.on_blocking_pool(move |store| {
            let mut table = store.read_table()?;
            table.insert(name, toml::Value::String(value));
            store.write_table(&table)
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.on_blocking_pool(move |store| {
            let mut table = store.read_table()?;
            if table.remove(&name).is_some() {
                store.write_table(&table)?;
            }
            Ok(())
        })
        .await
    }
}

/// Reject secrets files readable by group or other (must be 0600 or 0400).
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| {
        AssayError::SecretStore(format!("Failed to stat secrets file {path:?}: {e}"))
    })?;

    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(AssayError::SecretStore(format!(
            "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
            mode & 0o777
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.store("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_missing_secret_is_ok() {
        let store = MemorySecretStore::new();
        store.delete("absent").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_file_writes_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("secrets.toml"));

        let (a, b, c) = tokio::join!(
            store.store("a", "1"),
            store.store("b", "2"),
            store.store("c", "3")
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        for (name, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
            assert_eq!(store.get(name).await.unwrap().as_deref(), Some(value));
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("secrets.toml"));
        assert_eq!(store.get("assay.apiKey").await.unwrap(), None);
    }
}
