//! Storage backends for credential persistence
//!
//! Two interchangeable backends implement [`CredentialStore`]:
//! 1. OS keychain (encrypted and authenticated by the platform)
//! 2. Local directory of plaintext JSON files, one per user
//!
//! [`StoreManager`] selects and owns the active backend.

mod keychain;
mod local_directory;
mod manager;
mod traits;

pub use keychain::{KeychainStore, KeyringSecretService, SecretService};
pub use local_directory::{LocalDirectoryStore, CREDENTIALS_DIR_ENV};
pub use manager::StoreManager;
pub use traits::CredentialStore;
