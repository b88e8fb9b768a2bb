//! Local directory storage backend
//!
//! Stores one plaintext JSON file per user under a base directory, with
//! the user identity as the file stem. Intended for deployments that
//! have intentionally opted out of the OS keychain.

use std::io;
use std::path::{Path, PathBuf};
use std::{env, fs};

use directories::BaseDirs;
use tracing::{debug, error, info, warn};

use super::CredentialStore;
use crate::credential::CredentialRecord;
use crate::error::Result;

/// Environment variable overriding the base directory
pub const CREDENTIALS_DIR_ENV: &str = "CREDENTIAL_VAULT_DIR";

/// Suffix of per-user record files
const RECORD_SUFFIX: &str = ".json";

/// Credential store backed by a directory of JSON files
pub struct LocalDirectoryStore {
    base_dir: PathBuf,
}

impl LocalDirectoryStore {
    /// Create a store rooted at `base_dir`.
    ///
    /// When `base_dir` is `None` the directory is resolved from the
    /// `CREDENTIAL_VAULT_DIR` environment variable, then
    /// `~/.credential-vault/credentials`, then `.credentials` under the
    /// current working directory if no home directory resolves.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let base_dir = base_dir.unwrap_or_else(resolve_base_dir);
        info!("Local directory store initialized with base_dir: {:?}", base_dir);
        Self { base_dir }
    }

    /// Path of a user's record file, creating the base directory on demand.
    ///
    /// The identity is used verbatim as the file stem. Identities
    /// containing path separators or other reserved filename characters
    /// are not escaped; callers own that constraint.
    fn record_path(&self, user_id: &str) -> Result<PathBuf> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
            info!("Created credentials directory: {:?}", self.base_dir);
        }
        Ok(self.base_dir.join(format!("{}{}", user_id, RECORD_SUFFIX)))
    }

    /// The directory holding record files
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Resolve the base directory when none is given explicitly
fn resolve_base_dir() -> PathBuf {
    if let Ok(dir) = env::var(CREDENTIALS_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    match BaseDirs::new() {
        Some(dirs) => dirs
            .home_dir()
            .join(".credential-vault")
            .join("credentials"),
        None => env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".credentials"),
    }
}

impl CredentialStore for LocalDirectoryStore {
    fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>> {
        let path = self.record_path(user_id)?;

        if !path.exists() {
            debug!("No credential file for {} at {:?}", user_id, path);
            return Ok(None);
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("Error reading credential file {:?}: {}", path, e);
                return Ok(None);
            }
        };

        match CredentialRecord::from_json(&contents) {
            Ok(record) => {
                debug!("Loaded credentials for {} from {:?}", user_id, path);
                Ok(Some(record))
            }
            Err(e) => {
                warn!(
                    "Unparsable credential file {:?}, treating as absent: {}",
                    path, e
                );
                Ok(None)
            }
        }
    }

    fn store_credential(&self, user_id: &str, record: &CredentialRecord) -> Result<()> {
        let path = self.record_path(user_id)?;
        let payload = record.to_json()?;

        match fs::write(&path, payload) {
            Ok(()) => {
                info!("Stored credentials for {} to {:?}", user_id, path);
                Ok(())
            }
            Err(e) => {
                error!("Error storing credentials for {} to {:?}: {}", user_id, path, e);
                Err(e.into())
            }
        }
    }

    fn delete_credential(&self, user_id: &str) -> Result<()> {
        let path = self.record_path(user_id)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted credentials for {} from {:?}", user_id, path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No credential file to delete for {} at {:?}", user_id, path);
                Ok(())
            }
            Err(e) => {
                error!("Error deleting credentials for {} from {:?}: {}", user_id, path, e);
                Err(e.into())
            }
        }
    }

    fn list_users(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error listing credential files in {:?}: {}", self.base_dir, e);
                return Ok(Vec::new());
            }
        };

        let mut users = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str() {
                if let Some(user_id) = name.strip_suffix(RECORD_SUFFIX) {
                    users.push(user_id.to_string());
                }
            }
        }
        users.sort();

        debug!(
            "Found {} users with credentials in {:?}",
            users.len(),
            self.base_dir
        );
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, LocalDirectoryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDirectoryStore::new(Some(temp_dir.path().to_path_buf()));
        (temp_dir, store)
    }

    fn record_with_token(token: &str) -> CredentialRecord {
        CredentialRecord {
            token: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn get_missing_user_is_none() {
        let (_dir, store) = test_store();
        assert!(store.get_credential("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn store_and_get() {
        let (_dir, store) = test_store();
        store
            .store_credential("a@x.com", &record_with_token("tok"))
            .unwrap();

        let loaded = store.get_credential("a@x.com").unwrap().unwrap();
        assert_eq!(loaded.token.as_deref(), Some("tok"));
    }

    #[test]
    fn record_file_uses_identity_as_stem() {
        let (dir, store) = test_store();
        store
            .store_credential("a@x.com", &record_with_token("tok"))
            .unwrap();
        assert!(dir.path().join("a@x.com.json").exists());
    }

    #[test]
    fn unparsable_file_is_treated_as_absent() {
        let (dir, store) = test_store();
        fs::write(dir.path().join("broken@x.com.json"), "{ nope").unwrap();

        assert!(store.get_credential("broken@x.com").unwrap().is_none());
        // still enumerable by filename
        assert_eq!(store.list_users().unwrap(), vec!["broken@x.com"]);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, store) = test_store();
        store
            .store_credential("a@x.com", &record_with_token("tok"))
            .unwrap();

        store.delete_credential("a@x.com").unwrap();
        store.delete_credential("a@x.com").unwrap();
        store.delete_credential("never-stored@x.com").unwrap();
    }

    #[test]
    fn list_ignores_foreign_files() {
        let (dir, store) = test_store();
        store
            .store_credential("b@x.com", &record_with_token("tok"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a record").unwrap();

        assert_eq!(store.list_users().unwrap(), vec!["b@x.com"]);
    }

    #[test]
    fn base_dir_is_created_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("deeper").join("credentials");
        let store = LocalDirectoryStore::new(Some(nested.clone()));
        assert!(!nested.exists());

        store
            .store_credential("a@x.com", &record_with_token("tok"))
            .unwrap();
        assert!(nested.exists());
    }
}
