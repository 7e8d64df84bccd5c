//! HTTP inbound adapter: session endpoints, relays, and probes.

pub mod cache_control;
pub mod error;
pub mod health;
pub mod identity;
pub mod relay;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
