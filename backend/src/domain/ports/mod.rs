//! Domain ports at the gateway's hexagonal boundary.
//!
//! The orchestrator is reached only through these traits. Adapters map their
//! failures into the typed errors declared here so the domain can tell a
//! rejected credential from an unreachable orchestrator.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_exchange;
mod credential_store;
mod profile_source;
mod relay_transport;

#[cfg(test)]
pub use credential_exchange::MockCredentialExchange;
pub use credential_exchange::{
    CredentialExchange, CredentialExchangeError, FIXTURE_SESSION_TOKEN,
    FixtureCredentialExchange, UnsupportedCredentialExchange,
};
#[cfg(test)]
pub use credential_store::MockCredentialStore;
pub use credential_store::{CredentialStore, CredentialStoreError, MemoryCredentialStore};
#[cfg(test)]
pub use profile_source::MockProfileSource;
pub use profile_source::{FixtureProfileSource, ProfileSource, ProfileSourceError};
#[cfg(test)]
pub use relay_transport::MockRelayTransport;
pub use relay_transport::{
    OutboundRelay, RelayMethod, RelayTransport, RelayTransportError, UpstreamResponse,
};
