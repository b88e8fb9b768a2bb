//! OS keychain storage backend
//!
//! Uses the system keychain for credential entries:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! The keychain cannot enumerate its own entries, so the set of
//! registered user identities is kept in a dedicated index entry under
//! a reserved account name.

use std::collections::BTreeSet;

use keyring::Entry;
use tracing::{debug, error, info, warn};

use super::CredentialStore;
use crate::credential::CredentialRecord;
use crate::error::{Result, StoreError};

/// Service scope used for keychain entries
const SERVICE_NAME: &str = "credential-vault";

/// Reserved account name holding the registered-user index.
/// Must never collide with a legitimate user identity.
const USER_INDEX_ACCOUNT: &str = "__registered_users__";

/// Account name used only to probe keychain availability
const PROBE_ACCOUNT: &str = "__probe__";

/// Opaque get/set/delete-by-account secret service
///
/// The boundary behind which the OS keychain (and its encryption and
/// authentication) lives. [`KeychainStore`] is written against this
/// trait so tests can substitute an in-memory service.
pub trait SecretService: Send + Sync {
    /// Read the payload stored under an account, `None` when absent
    fn get(&self, account: &str) -> Result<Option<String>>;

    /// Write the payload stored under an account
    fn set(&self, account: &str, value: &str) -> Result<()>;

    /// Remove an account's payload. Removing an absent account succeeds.
    fn delete(&self, account: &str) -> Result<()>;

    /// Whether the service can store entries on this platform
    fn probe(&self) -> bool;
}

/// Secret service backed by the `keyring` crate
pub struct KeyringSecretService {
    service: String,
}

impl KeyringSecretService {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(&self.service, account).map_err(|e| StoreError::Keychain(e.to_string()))
    }
}

impl Default for KeyringSecretService {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretService for KeyringSecretService {
    fn get(&self, account: &str) -> Result<Option<String>> {
        match self.entry(account)?.get_password() {
            Ok(payload) => Ok(Some(payload)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Keychain(e.to_string())),
        }
    }

    fn set(&self, account: &str, value: &str) -> Result<()> {
        self.entry(account)?
            .set_password(value)
            .map_err(|e| StoreError::Keychain(e.to_string()))
    }

    fn delete(&self, account: &str) -> Result<()> {
        match self.entry(account)?.delete_password() {
            Ok(()) => Ok(()),
            // Entry doesn't exist, that's fine
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Keychain(e.to_string())),
        }
    }

    fn probe(&self) -> bool {
        match Entry::new(&self.service, PROBE_ACCOUNT) {
            Ok(entry) => {
                // Try to set and delete a test value
                if entry.set_password("probe").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }
}

/// Credential store backed by the OS keychain
///
/// The registered-user index is eventually consistent with the
/// credential entries: a store writes the entry first and the index
/// second, a delete removes the entry first and the index second, and
/// there is no transaction across the two steps. `get_credential` and
/// `delete_credential` address entries directly by identity and are
/// unaffected; only `list_users` can lag until the next successful
/// store or delete for that identity.
pub struct KeychainStore {
    service: Box<dyn SecretService>,
}

impl KeychainStore {
    /// Create a store over the system keychain.
    ///
    /// Fails with [`StoreError::Unavailable`] when the keychain cannot
    /// store entries on this platform.
    pub fn new() -> Result<Self> {
        Self::with_service(Box::new(KeyringSecretService::new()))
    }

    /// Create a store over a custom secret service
    pub fn with_service(service: Box<dyn SecretService>) -> Result<Self> {
        if !service.probe() {
            return Err(StoreError::Unavailable(
                "OS keychain cannot store entries on this platform".to_string(),
            ));
        }

        info!("Keychain store initialized (service: {})", SERVICE_NAME);
        Ok(Self { service })
    }

    /// Read the registered-user index, empty on absent or malformed
    fn registered_users(&self) -> BTreeSet<String> {
        match self.service.get(USER_INDEX_ACCOUNT) {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(users) => users,
                Err(e) => {
                    warn!("Malformed user index in keychain, treating as empty: {}", e);
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!("Error reading user index from keychain: {}", e);
                BTreeSet::new()
            }
        }
    }

    /// Persist the registered-user index as a sorted JSON array
    fn save_registered_users(&self, users: &BTreeSet<String>) -> Result<()> {
        let payload = serde_json::to_string(users)?;
        self.service.set(USER_INDEX_ACCOUNT, &payload)
    }
}

impl CredentialStore for KeychainStore {
    fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>> {
        let payload = match self.service.get(user_id)? {
            Some(payload) => payload,
            None => {
                debug!("No credentials found in keychain for {}", user_id);
                return Ok(None);
            }
        };

        match CredentialRecord::from_json(&payload) {
            Ok(record) => {
                debug!("Loaded credentials for {} from keychain", user_id);
                Ok(Some(record))
            }
            Err(e) => {
                warn!(
                    "Unparsable keychain entry for {}, treating as absent: {}",
                    user_id, e
                );
                Ok(None)
            }
        }
    }

    fn store_credential(&self, user_id: &str, record: &CredentialRecord) -> Result<()> {
        let payload = record.to_json()?;
        self.service.set(user_id, &payload)?;

        // Entry first, index second. The index update is best-effort: a
        // failure here leaves the entry reachable by get/delete and
        // invisible to list_users until the next successful store.
        let mut users = self.registered_users();
        if users.insert(user_id.to_string()) {
            if let Err(e) = self.save_registered_users(&users) {
                error!("Error saving user index to keychain: {}", e);
            }
        }

        info!("Stored credentials for {} in keychain", user_id);
        Ok(())
    }

    fn delete_credential(&self, user_id: &str) -> Result<()> {
        self.service.delete(user_id)?;

        let mut users = self.registered_users();
        if users.remove(user_id) {
            if let Err(e) = self.save_registered_users(&users) {
                error!("Error saving user index to keychain: {}", e);
            }
        }

        info!("Deleted credentials for {} from keychain", user_id);
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>> {
        let users = self.registered_users();
        debug!("Found {} users with credentials in keychain", users.len());
        Ok(users.into_iter().collect())
    }
}

/// In-memory secret service for tests
#[cfg(test)]
pub(crate) struct MemorySecretService {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
    available: bool,
}

#[cfg(test)]
impl MemorySecretService {
    pub(crate) fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
            available: true,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }
}

#[cfg(test)]
impl SecretService for MemorySecretService {
    fn get(&self, account: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(account).cloned())
    }

    fn set(&self, account: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(account.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(account);
        Ok(())
    }

    fn probe(&self) -> bool {
        self.available
    }
}
