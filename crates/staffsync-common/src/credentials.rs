//! Credential storage for the bearer token and its companion role value.
//!
//! The [`CredentialStore`] trait is the key-value surface the gateway reads
//! the token from and clears it through. Two implementations ship here:
//!
//! - [`MemoryCredentialStore`] keeps values for the lifetime of the process.
//! - [`FileCredentialStore`] persists values to a JSON file, the local
//!   equivalent of browser storage, so a session survives restarts.
//!
//! [`CredentialProvider`] wraps a store behind the `read`/`write`/`clear`
//! operations the gateway needs and swallows store errors after logging them.
//!
//! ## File Layout
//!
//! ```text
//! ~/.local/share/staffsync/
//! └── credentials.json     ({"token": "...", "rol": "..."})
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use log::{debug, warn};
use secrecy::SecretString;
use thiserror::Error;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the role of the signed-in user.
pub const ROLE_KEY: &str = "rol";

/// Errors raised by credential store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file does not contain a JSON object of strings.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type alias using `StoreError`.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Process-wide key-value surface for credentials.
///
/// Implementations provide their own atomicity for single operations.
/// Callers racing to remove the same key is harmless: `remove` succeeds
/// whether or not the key exists.
pub trait CredentialStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory credential store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: DashMap<String, String>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// Values are never printed, only the keys that are present.
impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("MemoryCredentialStore")
            .field("keys", &keys)
            .finish()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Credential store persisted as a JSON object on disk.
///
/// Every operation re-reads the file so several processes sharing the same
/// path observe each other's logins and logouts. Writes go to a temporary
/// file that is renamed over the original.
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl fmt::Debug for FileCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCredentialStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileCredentialStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// The file and its parent directory are created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn open_default() -> StoreResult<Self> {
        Self::default_path().map(Self::new)
    }

    /// Returns `<data_local_dir>/staffsync/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn default_path() -> StoreResult<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| StoreError::Other("Failed to determine data directory".to_string()))?;
        Ok(data_dir.join("staffsync").join("credentials.json"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Other("credential file lock poisoned".to_string()))
    }

    fn read_entries(&self) -> StoreResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads entries ahead of a write. A corrupt file reads as empty, with
    /// the returned flag set, so the next write replaces it.
    fn read_entries_for_update(&self) -> StoreResult<(HashMap<String, String>, bool)> {
        match self.read_entries() {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Json(e)) => {
                warn!(
                    "Credential file {} is corrupt, overwriting: {e}",
                    self.path.display()
                );
                Ok((HashMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Temporary sibling of the backing file, unique per process and write.
    fn temp_path(&self) -> PathBuf {
        static WRITES: AtomicU64 = AtomicU64::new(0);

        let name = self
            .path
            .file_name()
            .map_or_else(|| "credentials".into(), |n| n.to_string_lossy().into_owned());
        let seq = WRITES.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }

    fn write_entries(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_private_dir(parent)?;
        }

        let tmp = self.temp_path();
        let written = open_private(&tmp).and_then(|mut file| {
            file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Wrote {} credential entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.guard()?;
        let (mut entries, _) = self.read_entries_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.guard()?;
        let (mut entries, corrupt) = self.read_entries_for_update()?;
        if entries.remove(key).is_none() && !corrupt {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Injected capability for reading and invalidating the session credential.
///
/// Store calls run on the blocking thread pool, so a file-backed store never
/// stalls the async runtime. Store failures never escape the provider: reads
/// degrade to "absent" and writes report `false`, both after logging the
/// underlying error.
#[derive(Clone)]
pub struct CredentialProvider {
    store: Arc<dyn CredentialStore>,
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CredentialProvider {
    /// Wraps a credential store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Provider over a fresh [`MemoryCredentialStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Runs a synchronous store operation on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking task panics or the operation fails.
    pub async fn run<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn CredentialStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Other(format!("Task join error: {e}")))?
    }

    /// Reads the bearer token, if one is stored.
    pub async fn read(&self) -> Option<SecretString> {
        self.get_logged(TOKEN_KEY)
            .await
            .map(|token| SecretString::new(token.into()))
    }

    /// Returns `true` if a token is currently stored.
    pub async fn has_token(&self) -> bool {
        self.get_logged(TOKEN_KEY).await.is_some()
    }

    /// Reads the role stored alongside the token.
    pub async fn role(&self) -> Option<String> {
        self.get_logged(ROLE_KEY).await
    }

    /// Replaces the stored session with `token` and `role`.
    ///
    /// A `None` role removes any role left by a previous session. Returns
    /// `false` if the store could not be updated.
    pub async fn write(&self, token: &str, role: Option<&str>) -> bool {
        let token = token.to_string();
        let role = role.map(str::to_string);
        self.run(move |store| {
            store.set(TOKEN_KEY, &token)?;
            match role {
                Some(role) => store.set(ROLE_KEY, &role),
                None => store.remove(ROLE_KEY),
            }
        })
        .await
        .inspect_err(|e| warn!("Failed to write session to credential store: {e}"))
        .is_ok()
    }

    /// Removes the token but leaves the role in place.
    pub async fn clear_token(&self) -> bool {
        self.run(|store| store.remove(TOKEN_KEY))
            .await
            .inspect_err(|e| warn!("Failed to remove '{TOKEN_KEY}' from credential store: {e}"))
            .is_ok()
    }

    /// Removes both the token and the role.
    pub async fn clear_all(&self) -> bool {
        self.run(|store| {
            let token = store.remove(TOKEN_KEY);
            store.remove(ROLE_KEY)?;
            token
        })
        .await
        .inspect_err(|e| warn!("Failed to clear credential store: {e}"))
        .is_ok()
    }

    async fn get_logged(&self, key: &'static str) -> Option<String> {
        match self.run(move |store| store.get(key)).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{key}' from credential store: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        // Removing twice is fine
        store.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn memory_store_debug_hides_values() {
        let store = MemoryCredentialStore::new();
        store.set(TOKEN_KEY, "super-secret").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("token"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.remove(ROLE_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let first = FileCredentialStore::new(&path);
        first.set(TOKEN_KEY, "t-1").unwrap();
        first.set(ROLE_KEY, "admin").unwrap();

        let second = FileCredentialStore::new(&path);
        assert_eq!(second.get(TOKEN_KEY).unwrap().as_deref(), Some("t-1"));
        assert_eq!(second.get(ROLE_KEY).unwrap().as_deref(), Some("admin"));

        second.remove(TOKEN_KEY).unwrap();
        assert_eq!(first.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(first.get(ROLE_KEY).unwrap().as_deref(), Some("admin"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);
        store.set(TOKEN_KEY, "t").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_file_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.get(TOKEN_KEY), Err(StoreError::Json(_))));

        // The provider degrades to "absent" instead of failing
        let provider = CredentialProvider::new(Arc::new(store));
        assert!(provider.read().await.is_none());
        assert!(!provider.has_token().await);
    }

    #[tokio::test]
    async fn file_store_recovers_from_corrupt_file_on_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"token": "abc""#).unwrap();

        let provider = CredentialProvider::new(Arc::new(FileCredentialStore::new(&path)));

        assert!(provider.clear_all().await);
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "{}");

        fs::write(&path, r#"{"token": "abc""#).unwrap();
        assert!(provider.write("fresh", Some("admin")).await);
        assert_eq!(provider.read().await.unwrap().expose_secret(), "fresh");
        assert_eq!(provider.role().await.as_deref(), Some("admin"));
    }

    #[test]
    fn file_store_writes_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);

        store.set(TOKEN_KEY, "t").unwrap();
        store.set(ROLE_KEY, "admin").unwrap();
        store.remove(TOKEN_KEY).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[test]
    fn file_store_temp_names_are_unique() {
        let store = FileCredentialStore::new("/tmp/staffsync/credentials.json");
        let first = store.temp_path();
        let second = store.temp_path();

        assert_ne!(first, second);
        assert_eq!(first.parent(), store.path().parent());
        assert!(
            first
                .to_string_lossy()
                .contains(&std::process::id().to_string())
        );
    }

    #[tokio::test]
    async fn provider_clear_token_keeps_role() {
        let provider = CredentialProvider::in_memory();
        assert!(provider.write("abc", Some("admin")).await);

        assert_eq!(provider.read().await.unwrap().expose_secret(), "abc");
        assert!(provider.clear_token().await);

        assert!(provider.read().await.is_none());
        assert_eq!(provider.role().await.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn provider_clear_all_removes_both() {
        let provider = CredentialProvider::in_memory();
        provider.write("abc", Some("employee")).await;

        assert!(provider.clear_all().await);
        assert!(provider.read().await.is_none());
        assert!(provider.role().await.is_none());
    }

    #[tokio::test]
    async fn provider_write_without_role_drops_previous_role() {
        let provider = CredentialProvider::in_memory();
        provider.write("first", Some("admin")).await;
        provider.write("second", None).await;

        assert_eq!(provider.read().await.unwrap().expose_secret(), "second");
        assert!(provider.role().await.is_none());
    }

    #[tokio::test]
    async fn provider_debug_redacts_token() {
        let provider = CredentialProvider::in_memory();
        provider.write("super-secret", None).await;
        assert!(!format!("{provider:?}").contains("super-secret"));
    }
}
