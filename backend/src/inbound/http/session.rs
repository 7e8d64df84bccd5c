//! Credential Store backed by the console's private session cookie.
//!
//! The cookie is the server-side mirror of the browser's credential storage.
//! Keys are the console's namespaced storage keys, so a browser signed in to
//! two consoles never mixes their credentials.

use actix_session::Session;
use tracing::debug;

use crate::domain::ports::{CredentialStore, CredentialStoreError};
use crate::domain::{ConsoleProfile, Credential, IdentitySnapshot};

/// [`CredentialStore`] over an Actix session.
#[derive(Clone)]
pub struct SessionCredentialStore {
    session: Session,
    console: &'static ConsoleProfile,
}

impl SessionCredentialStore {
    /// Wrap `session` for `console`.
    pub fn new(session: Session, console: &'static ConsoleProfile) -> Self {
        Self { session, console }
    }

    /// Presence-only check used by the navigation guard.
    pub fn has_credential(&self) -> bool {
        self.session
            .entries()
            .contains_key(self.console.credential_key)
    }
}

impl CredentialStore for SessionCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let raw = self
            .session
            .get::<String>(self.console.credential_key)
            .map_err(|error| CredentialStoreError::corrupt(error.to_string()))?;
        raw.map(Credential::new)
            .transpose()
            .map_err(|error| CredentialStoreError::corrupt(error.to_string()))
    }

    fn save_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        self.session
            .insert(self.console.credential_key, credential.expose())
            .map_err(|error| CredentialStoreError::write(error.to_string()))
    }

    fn load_snapshot(&self) -> Result<Option<IdentitySnapshot>, CredentialStoreError> {
        self.session
            .get::<IdentitySnapshot>(self.console.snapshot_key)
            .map_err(|error| CredentialStoreError::corrupt(error.to_string()))
    }

    fn save_snapshot(&self, snapshot: &IdentitySnapshot) -> Result<(), CredentialStoreError> {
        self.session
            .insert(self.console.snapshot_key, snapshot)
            .map_err(|error| CredentialStoreError::write(error.to_string()))
    }

    fn clear(&self) {
        let had_credential = self
            .session
            .remove(self.console.credential_key)
            .is_some();
        self.session.remove(self.console.snapshot_key);
        if had_credential {
            debug!(console = %self.console.kind, "credential cleared from session");
        }
    }
}
