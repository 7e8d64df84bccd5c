//! Shared cache-control policies for HTTP handlers.
//!
//! Session views and relayed orchestrator data are freshness-critical, so
//! both inbound responses and outbound relay requests carry `no-store`.

/// Never store the response in any cache.
pub const NO_STORE: &str = "no-store";

/// Build the standard cache-control header tuple for session and relay
/// responses.
pub const fn no_store_header() -> (&'static str, &'static str) {
    ("Cache-Control", NO_STORE)
}
