//! Driving-side port for password logins.
//!
//! Consoles with a login exchange trade a username/password pair for an
//! orchestrator-issued credential; the identity context then resolves that
//! credential like any other.

use async_trait::async_trait;

use crate::domain::{Credential, LoginCredentials};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the credential exchange.
    pub enum CredentialExchangeError {
        /// This console has no password login.
        Unsupported => "password login is not available for this console",
        /// The orchestrator refused the username/password pair.
        Rejected { status: u16 } => "orchestrator rejected the login with status {status}",
        /// The orchestrator answered with another non-success status.
        UpstreamStatus { status: u16 } => "orchestrator answered the login with status {status}",
        /// Network transport failed before a response arrived.
        Transport { message: String } => "orchestrator transport failed: {message}",
        /// The login call exceeded its timeout.
        Timeout { message: String } => "orchestrator timed out: {message}",
        /// The response carried no usable token.
        Decode { message: String } => "orchestrator login response invalid: {message}",
    }
}

/// Port trading login input for a credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Exchange `credentials` for an orchestrator-issued credential.
    async fn exchange(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Credential, CredentialExchangeError>;
}

/// Development exchange: `admin` / `password` yields a fixed session token.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCredentialExchange;

/// Token issued by [`FixtureCredentialExchange`].
pub const FIXTURE_SESSION_TOKEN: &str = "sess_fixture_admin";

#[async_trait]
impl CredentialExchange for FixtureCredentialExchange {
    async fn exchange(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Credential, CredentialExchangeError> {
        if credentials.username() == "admin" && credentials.password() == "password" {
            Credential::new(FIXTURE_SESSION_TOKEN)
                .map_err(|err| CredentialExchangeError::decode(err.to_string()))
        } else {
            Err(CredentialExchangeError::rejected(401_u16))
        }
    }
}

/// Exchange for consoles without password login.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCredentialExchange;

#[async_trait]
impl CredentialExchange for UnsupportedCredentialExchange {
    async fn exchange(
        &self,
        _credentials: &LoginCredentials,
    ) -> Result<Credential, CredentialExchangeError> {
        Err(CredentialExchangeError::unsupported())
    }
}
