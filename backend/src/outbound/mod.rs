//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **orchestrator**: reqwest-backed profile lookup, relay transport, and
//!   login exchange.
//!
//! Adapters are thin translators between domain types and wire
//! representations. They contain no session policy.

pub mod orchestrator;
