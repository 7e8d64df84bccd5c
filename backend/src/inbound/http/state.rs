//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data` and only depend on domain ports, so
//! tests can swap in fixtures or mocks without any network I/O.

use std::sync::Arc;

use actix_session::Session;

use crate::domain::ports::{CredentialExchange, ProfileSource, RelayTransport};
use crate::domain::{ConsoleProfile, IdentityContext, Relay};
use crate::inbound::http::session::SessionCredentialStore;

/// Port implementations needed by the HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    /// Profile lookup used for identity resolution.
    pub profiles: Arc<dyn ProfileSource>,
    /// Password login exchange.
    pub exchange: Arc<dyn CredentialExchange>,
    /// Outbound relay transport.
    pub transport: Arc<dyn RelayTransport>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Console served by this process.
    pub console: &'static ConsoleProfile,
    /// Profile lookup used for identity resolution.
    pub profiles: Arc<dyn ProfileSource>,
    /// Password login exchange.
    pub exchange: Arc<dyn CredentialExchange>,
    /// Fail-closed relay bound to the console's header policy.
    pub relay: Relay,
}

impl HttpState {
    /// Construct state for `console` from a ports bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use console_gateway::domain::ConsoleKind;
    /// use console_gateway::domain::ports::{FixtureCredentialExchange, FixtureProfileSource};
    /// use console_gateway::inbound::http::state::{HttpState, HttpStatePorts};
    /// use console_gateway::outbound::orchestrator::{OrchestratorClient, OrchestratorConfig};
    ///
    /// let console = ConsoleKind::Client.profile();
    /// let client = OrchestratorClient::new(
    ///     OrchestratorConfig::new("http://orchestrator.invalid".parse().unwrap()),
    ///     console,
    /// )
    /// .unwrap();
    /// let state = HttpState::new(
    ///     console,
    ///     HttpStatePorts {
    ///         profiles: Arc::new(FixtureProfileSource::default()),
    ///         exchange: Arc::new(FixtureCredentialExchange),
    ///         transport: Arc::new(client),
    ///     },
    /// );
    /// assert_eq!(state.console.kind, ConsoleKind::Client);
    /// ```
    pub fn new(console: &'static ConsoleProfile, ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            profiles,
            exchange,
            transport,
        } = ports;
        Self {
            console,
            profiles,
            exchange,
            relay: Relay::new(console, transport),
        }
    }

    /// Identity context for one request, backed by the caller's session cookie.
    pub fn identity_context(&self, session: Session) -> IdentityContext<SessionCredentialStore> {
        IdentityContext::new(
            self.console,
            SessionCredentialStore::new(session, self.console),
            Arc::clone(&self.profiles),
        )
    }
}
