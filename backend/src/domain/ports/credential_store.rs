//! Driven port for the per-console Credential Store.
//!
//! Storage reads and writes never suspend, so the port is synchronous. The
//! HTTP adapter backs it with the console's private session cookie; tests use
//! [`MemoryCredentialStore`]. Only the identity context writes through this
//! port.

use std::sync::{Mutex, PoisonError};

use crate::domain::{Credential, IdentitySnapshot};

use super::define_port_error;

define_port_error! {
    /// Errors raised by credential store adapters.
    pub enum CredentialStoreError {
        /// The backing store refused the write.
        Write { message: String } => "credential store write failed: {message}",
        /// A stored value could not be decoded.
        Corrupt { message: String } => "credential store holds an unreadable value: {message}",
    }
}

/// Persist, retrieve, and clear one console's credential and snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore {
    /// Stored credential, if any.
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError>;

    /// Replace the stored credential.
    fn save_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError>;

    /// Cached identity snapshot, if any.
    fn load_snapshot(&self) -> Result<Option<IdentitySnapshot>, CredentialStoreError>;

    /// Replace the cached identity snapshot.
    fn save_snapshot(&self, snapshot: &IdentitySnapshot) -> Result<(), CredentialStoreError>;

    /// Remove both the credential and the snapshot. Must be idempotent.
    fn clear(&self);
}

#[derive(Debug, Default)]
struct MemoryEntries {
    credential: Option<Credential>,
    snapshot: Option<IdentitySnapshot>,
}

/// In-memory store used by tests and fixture wiring.
///
/// # Examples
/// ```
/// use console_gateway::domain::Credential;
/// use console_gateway::domain::ports::{CredentialStore, MemoryCredentialStore};
///
/// let store = MemoryCredentialStore::default();
/// store.save_credential(&Credential::new("pk_1").unwrap()).unwrap();
/// assert!(store.load_credential().unwrap().is_some());
/// store.clear();
/// assert!(store.load_credential().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<MemoryEntries>,
}

impl MemoryCredentialStore {
    /// Store pre-populated with a credential, as after a page reload.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            entries: Mutex::new(MemoryEntries {
                credential: Some(credential),
                snapshot: None,
            }),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, MemoryEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self.entries().credential.clone())
    }

    fn save_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        self.entries().credential = Some(credential.clone());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<IdentitySnapshot>, CredentialStoreError> {
        Ok(self.entries().snapshot.clone())
    }

    fn save_snapshot(&self, snapshot: &IdentitySnapshot) -> Result<(), CredentialStoreError> {
        self.entries().snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.entries() = MemoryEntries::default();
    }
}
