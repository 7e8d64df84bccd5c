//! Console gateway library.
//!
//! One deployment serves one security console (admin, partner, or client):
//! it guards navigation by credential presence, resolves the stored
//! credential into an orchestrator identity, and relays browser calls to the
//! orchestrator with the credential attached.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
