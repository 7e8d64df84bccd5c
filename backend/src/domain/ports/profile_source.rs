//! Driven port for resolving a credential into an [`Identity`].
//!
//! The orchestrator adapter is bound to one console at construction, so the
//! port only needs the credential. Errors keep rejection separate from
//! transport failure: the first ends a session, the second never does once a
//! session is established.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{AccountMode, Credential, Identity, IdentityStatus};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced while fetching a caller profile.
    pub enum ProfileSourceError {
        /// The orchestrator refused the credential (401 or 403).
        Rejected { status: u16 } =>
            "orchestrator rejected the credential with status {status}",
        /// The orchestrator answered with another non-success status.
        UpstreamStatus { status: u16 } =>
            "orchestrator answered the profile request with status {status}",
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "orchestrator transport failed: {message}",
        /// The profile call exceeded its timeout.
        Timeout { message: String } =>
            "orchestrator timed out: {message}",
        /// The response did not match the identity schema.
        Decode { message: String } =>
            "orchestrator profile could not be decoded: {message}",
    }
}

impl ProfileSourceError {
    /// Whether the orchestrator explicitly refused the credential.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Port exchanging a credential for the caller's profile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile bound to `credential`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use console_gateway::domain::Credential;
    /// use console_gateway::domain::ports::{FixtureProfileSource, ProfileSource};
    ///
    /// let source = FixtureProfileSource::default();
    /// let identity = source
    ///     .fetch_profile(&Credential::new("sk_demo_123")?)
    ///     .await?;
    /// assert_eq!(identity.id(), "client-demo");
    /// ```
    async fn fetch_profile(&self, credential: &Credential) -> Result<Identity, ProfileSourceError>;
}

/// Fixture source resolving a fixed credential table.
///
/// The default table knows `sk_demo_123` (an active demo client); every other
/// credential is rejected with `401`.
#[derive(Debug, Clone)]
pub struct FixtureProfileSource {
    identities: HashMap<String, Identity>,
}

impl FixtureProfileSource {
    /// Empty table: every credential is rejected.
    pub fn empty() -> Self {
        Self {
            identities: HashMap::new(),
        }
    }

    /// Register an identity for a raw credential value.
    pub fn with_identity(mut self, credential: impl Into<String>, identity: Identity) -> Self {
        self.identities.insert(credential.into(), identity);
        self
    }
}

impl Default for FixtureProfileSource {
    fn default() -> Self {
        let demo = Identity::try_new(
            "client-demo",
            "Demo Client",
            "demo@client.test",
            AccountMode::Demo,
            IdentityStatus::Active,
        );
        match demo {
            Ok(identity) => Self::empty().with_identity("sk_demo_123", identity),
            Err(_) => Self::empty(),
        }
    }
}

#[async_trait]
impl ProfileSource for FixtureProfileSource {
    async fn fetch_profile(&self, credential: &Credential) -> Result<Identity, ProfileSourceError> {
        self.identities
            .get(credential.expose())
            .cloned()
            .ok_or_else(|| ProfileSourceError::rejected(401_u16))
    }
}
