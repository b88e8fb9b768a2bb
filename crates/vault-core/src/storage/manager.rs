//! Active backend selection
//!
//! [`StoreManager`] owns the process's active credential store. It is
//! an explicitly constructed service object: create one at startup,
//! share it by reference, and inject it into whatever needs credential
//! access. The keychain backend is constructed lazily on first use and
//! kept until explicitly replaced.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::{CredentialStore, KeychainStore};
use crate::error::Result;

/// Holder of the active credential store
pub struct StoreManager {
    active: RwLock<Option<Arc<dyn CredentialStore>>>,
}

impl StoreManager {
    /// Create a manager with no backend constructed yet
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// The active store, constructing the keychain backend on first call.
    ///
    /// Refuses to run rather than downgrade: when the OS keychain is
    /// unavailable this returns [`StoreError::Unavailable`] on every
    /// call, and no file-based fallback is selected implicitly.
    ///
    /// [`StoreError::Unavailable`]: crate::error::StoreError::Unavailable
    /// Operators who intend to use the local directory store must
    /// install it with [`replace`](Self::replace).
    pub fn active(&self) -> Result<Arc<dyn CredentialStore>> {
        {
            let slot = self.active.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(store) = slot.as_ref() {
                return Ok(store.clone());
            }
        }

        let mut slot = self.active.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race for the write lock
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }

        let store: Arc<dyn CredentialStore> = Arc::new(KeychainStore::new()?);
        info!("Initialized credential store: keychain");
        *slot = Some(store.clone());
        Ok(store)
    }

    /// Replace the active store immediately
    pub fn replace(&self, store: Arc<dyn CredentialStore>) {
        let mut slot = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(store);
        info!("Replaced active credential store");
    }
}

impl Default for StoreManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalDirectoryStore;
    use tempfile::TempDir;

    #[test]
    fn replace_installs_the_given_store() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StoreManager::new();
        let store: Arc<dyn CredentialStore> =
            Arc::new(LocalDirectoryStore::new(Some(temp_dir.path().to_path_buf())));

        manager.replace(store.clone());

        let active = manager.active().unwrap();
        assert!(Arc::ptr_eq(&active, &store));
    }

    #[test]
    fn active_is_idempotent_until_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StoreManager::new();
        manager.replace(Arc::new(LocalDirectoryStore::new(Some(
            temp_dir.path().to_path_buf(),
        ))));

        let first = manager.active().unwrap();
        let second = manager.active().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other_dir = TempDir::new().unwrap();
        let replacement: Arc<dyn CredentialStore> = Arc::new(LocalDirectoryStore::new(Some(
            other_dir.path().to_path_buf(),
        )));
        manager.replace(replacement.clone());

        let third = manager.active().unwrap();
        assert!(Arc::ptr_eq(&third, &replacement));
        assert!(!Arc::ptr_eq(&third, &first));
    }
}
