//! Orchestrator outbound adapter.
//!
//! One reqwest client per process, bound to the console being served, that
//! implements the profile, relay, and login exchange ports.

mod dto;
mod http_client;

pub use http_client::{DEFAULT_REQUEST_TIMEOUT, OrchestratorClient, OrchestratorConfig};
