//! File-backed storage: one JSON object holding every key.

use crate::{SecureStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Storage persisted as a single JSON document.
///
/// Every mutation rewrites the document through a temporary file and a
/// rename, so a crash never leaves a half-written session behind.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the document at `path`, creating an empty one lazily on first write.
    ///
    /// An undecodable document is moved aside to `<name>.corrupt` and the
    /// storage starts empty.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(data) => data,
                    Err(e) => {
                        let quarantine = corrupt_path(path);
                        tracing::warn!(
                            path = %path.display(),
                            moved_to = %quarantine.display(),
                            error = %e,
                            "Stored session unreadable, starting signed out"
                        );
                        std::fs::rename(path, &quarantine)?;
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = data.len(), "Opened file storage");

        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        write_private(&tmp_path, json.as_bytes())?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

/// Write `contents` to a fresh file that is owner-only from creation.
fn write_private(path: &Path, contents: &[u8]) -> StorageResult<()> {
    // A leftover temp file may carry wider permissions; never reuse it.
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock();
        data.insert(key.to_string(), value.to_string());
        self.persist(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock();
        let existed = data.remove(key).is_some();
        if existed {
            self.persist(&data)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("auth_session", "{\"access_token\":\"a\"}").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("auth_session").unwrap(),
            Some("{\"access_token\":\"a\"}".to_string())
        );
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("k", "v").unwrap();
        assert!(storage.delete("k").unwrap());
        assert!(!storage.delete("k").unwrap());

        let reopened = FileStorage::open(&path).unwrap();
        assert!(!reopened.has("k").unwrap());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&dir.path().join("nested").join("none.json")).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"auth_session\": trunc").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("auth_session").unwrap(), None);
        assert!(!path.exists());

        let quarantined = dir.path().join("session.json.corrupt");
        assert_eq!(
            std::fs::read_to_string(&quarantined).unwrap(),
            "{\"auth_session\": trunc"
        );

        storage.set("auth_session", "fresh").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("auth_session").unwrap(), Some("fresh".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("k", "v").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_is_not_reused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let tmp_path = dir.path().join("session.json.tmp");
        std::fs::write(&tmp_path, "old").unwrap();
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::open(&path).unwrap();
        storage.set("k", "v").unwrap();

        assert!(!tmp_path.exists());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
