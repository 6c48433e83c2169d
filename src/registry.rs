//! Durable set of users who have ever talked to the bot
//!
//! Stored as a JSON array of chat ids. Reads never fail from the caller's
//! point of view: a missing or corrupt file is an empty registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;

/// Telegram chat id of one end user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed registry file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to replace registry file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Registry write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// File-backed user registry
///
/// The file is read once and then served from memory. Mutations hold the
/// async lock across load-modify-store, and the store itself is a temp-file
/// rename on the blocking pool.
pub struct UserRegistry {
    path: PathBuf,
    /// `None` until the file has been read
    users: Mutex<Option<BTreeSet<UserId>>>,
}

impl UserRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            users: Mutex::new(None),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the registered set from disk; failures degrade to an empty set
    pub async fn load(&self) -> BTreeSet<UserId> {
        match self.try_load().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to load users file");
                BTreeSet::new()
            }
        }
    }

    async fn try_load(&self) -> RegistryResult<BTreeSet<UserId>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => {
                return Err(RegistryError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let ids: Vec<UserId> = serde_json::from_str(&content)?;
        Ok(ids.into_iter().collect())
    }

    /// Write the whole set, sorted, replacing the file atomically
    pub async fn save(&self, users: &BTreeSet<UserId>) -> RegistryResult<()> {
        let path = self.path.clone();
        let users = users.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &users)).await?
    }

    /// Add `user` if it is not registered yet.
    ///
    /// Returns true when the user was newly added. A failed write is logged
    /// and otherwise ignored; the user will be retried on their next message.
    pub async fn register_if_absent(&self, user: UserId) -> bool {
        let mut cache = self.users.lock().await;
        let mut users = match cache.take() {
            Some(users) => users,
            None => self.load().await,
        };

        let added = users.insert(user) && {
            match self.save(&users).await {
                Ok(()) => {
                    tracing::info!(user = %user, total = users.len(), "Registered new user");
                    true
                }
                Err(e) => {
                    tracing::error!(user = %user, error = %e, "Failed to save users file");
                    users.remove(&user);
                    false
                }
            }
        };

        *cache = Some(users);
        added
    }

    /// Every registered user, as currently known
    pub async fn users(&self) -> BTreeSet<UserId> {
        self.with_users(BTreeSet::clone).await
    }

    pub async fn contains(&self, user: UserId) -> bool {
        self.with_users(|users| users.contains(&user)).await
    }

    pub async fn len(&self) -> usize {
        self.with_users(BTreeSet::len).await
    }

    async fn with_users<T>(&self, f: impl FnOnce(&BTreeSet<UserId>) -> T) -> T {
        let mut cache = self.users.lock().await;
        if let Some(users) = cache.as_ref() {
            return f(users);
        }
        let users = self.load().await;
        let result = f(&users);
        *cache = Some(users);
        result
    }
}

fn write_atomically(path: &Path, users: &BTreeSet<UserId>) -> RegistryResult<()> {
    let io_err = |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let temp_file = NamedTempFile::new_in(parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer(&mut writer, users)?;
        writer.flush().map_err(io_err)?;
    }
    temp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> UserRegistry {
        UserRegistry::new(dir.path().join("users.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(registry_in(&dir).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_in_file_collapse() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        fs::write(registry.path(), "[111, 222, 111]").unwrap();

        let users = registry.load().await;
        assert_eq!(users, BTreeSet::from([UserId(111), UserId(222)]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        fs::write(registry.path(), "{not json").unwrap();

        assert!(registry.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        assert!(registry.register_if_absent(UserId(42)).await);
        let once = fs::read_to_string(registry.path()).unwrap();
        assert!(!registry.register_if_absent(UserId(42)).await);
        let twice = fs::read_to_string(registry.path()).unwrap();

        assert_eq!(once, twice);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_writes_sorted_array() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        let users = BTreeSet::from([UserId(30), UserId(-5), UserId(1_000_000_007)]);

        registry.save(&users).await.unwrap();

        assert_eq!(
            fs::read_to_string(registry.path()).unwrap(),
            "[-5,30,1000000007]"
        );
    }

    #[tokio::test]
    async fn test_existing_file_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        fs::write(registry.path(), "[7, 8]").unwrap();

        assert!(registry.contains(UserId(7)).await);
        assert!(registry.register_if_absent(UserId(9)).await);
        assert_eq!(
            registry.users().await,
            BTreeSet::from([UserId(7), UserId(8), UserId(9)])
        );
        assert_eq!(fs::read_to_string(registry.path()).unwrap(), "[7,8,9]");
    }

    #[tokio::test]
    async fn test_register_recovers_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        fs::write(registry.path(), "garbage").unwrap();

        assert!(registry.register_if_absent(UserId(9)).await);
        assert!(registry.contains(UserId(9)).await);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed_and_retried() {
        let dir = TempDir::new().unwrap();
        // Parent is a regular file, so the directory can't be created
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let registry = UserRegistry::new(blocker.join("users.json"));

        assert!(!registry.register_if_absent(UserId(1)).await);
        assert!(!registry.contains(UserId(1)).await);
        assert!(registry.load().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_contacts_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(registry_in(&dir));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.register_if_absent(UserId(i)).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(registry.len().await, 16);
        // A fresh reader sees every write on disk
        assert_eq!(registry_in(&dir).load().await.len(), 16);
    }

    proptest! {
        #[test]
        fn prop_save_then_load_is_identity(ids in prop::collection::btree_set(any::<i64>(), 0..50)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let dir = TempDir::new().unwrap();
            let registry = registry_in(&dir);
            let users: BTreeSet<UserId> = ids.into_iter().map(UserId).collect();

            let loaded = runtime.block_on(async {
                registry.save(&users).await.unwrap();
                registry.load().await
            });

            prop_assert_eq!(loaded, users);
        }
    }
}
