//! Store trait definitions

use crate::credential::CredentialRecord;
use crate::error::Result;

/// Contract implemented by every credential storage backend
///
/// Not-found is a normal result, never an error: `get_credential`
/// returns `Ok(None)` and `delete_credential` returns `Ok(())` for a
/// user with no stored record. Errors are reserved for the persistence
/// medium itself rejecting an operation.
pub trait CredentialStore: Send + Sync {
    /// Retrieve the stored record for a user
    ///
    /// A record that exists but cannot be decoded is treated as absent;
    /// the decode failure is logged, not surfaced.
    fn get_credential(&self, user_id: &str) -> Result<Option<CredentialRecord>>;

    /// Persist a record for a user, replacing any existing record wholesale
    fn store_credential(&self, user_id: &str, record: &CredentialRecord) -> Result<()>;

    /// Remove a user's record
    ///
    /// Removing an already-absent record succeeds.
    fn delete_credential(&self, user_id: &str) -> Result<()>;

    /// All user identities with stored credentials, sorted
    ///
    /// An empty store yields an empty vec, never an error.
    fn list_users(&self) -> Result<Vec<String>>;
}
