//! # vault-core
//!
//! Pluggable credential persistence for OAuth2-style access and refresh
//! tokens keyed by user identity, including:
//! - A uniform store contract (get, store, delete, list)
//! - OS keychain backend with a registered-user index
//! - Local directory backend with one JSON file per user
//! - Explicit selection and replacement of the active backend

pub mod credential;
pub mod error;
pub mod storage;

pub use credential::CredentialRecord;
pub use error::{Result, StoreError};
pub use storage::{
    CredentialStore, KeychainStore, KeyringSecretService, LocalDirectoryStore, SecretService,
    StoreManager,
};
