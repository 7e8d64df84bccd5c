//! Credential-attaching relay from the browser to the orchestrator.
//!
//! [`Relay::forward`] fails closed: without an accepted credential header it
//! returns `401` before the transport is touched. Otherwise it forwards the
//! credential under the console's canonical header and hands the upstream
//! status and body back unchanged. Transport failures surface as generic
//! `502`/`504` errors that never mention the orchestrator's address.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::ports::{
    OutboundRelay, RelayMethod, RelayTransport, RelayTransportError, UpstreamResponse,
};
use crate::domain::{ConsoleProfile, CredentialHeaders, Error};

/// One inbound relay call, borrowed from the HTTP request.
#[derive(Debug, Clone)]
pub struct RelayRequest<'a> {
    /// Inbound method.
    pub method: RelayMethod,
    /// Orchestrator path relative to the base address.
    pub path: &'a str,
    /// Raw query string without `?`.
    pub query: Option<String>,
    /// Inbound headers as name/value pairs.
    pub headers: Vec<(&'a str, &'a str)>,
    /// Raw inbound body.
    pub body: &'a [u8],
}

/// Relay bound to one console's header policy.
#[derive(Clone)]
pub struct Relay {
    console: &'static ConsoleProfile,
    headers: CredentialHeaders,
    transport: Arc<dyn RelayTransport>,
}

impl Relay {
    /// Create a relay for `console` over `transport`.
    pub fn new(console: &'static ConsoleProfile, transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            console,
            headers: CredentialHeaders::new(console.accepted_headers),
            transport,
        }
    }

    /// Forward `request` to the orchestrator.
    pub async fn forward(&self, request: RelayRequest<'_>) -> Result<UpstreamResponse, Error> {
        let credential = self
            .headers
            .extract(request.headers.iter().copied())
            .ok_or_else(|| Error::unauthorized(self.console.missing_credential_message()))?;
        let path = relay_path(request.path)?;
        let body = request
            .method
            .allows_body()
            .then(|| normalise_body(request.body));

        let outbound = OutboundRelay {
            method: request.method,
            path,
            query: request.query.filter(|query| !query.is_empty()),
            credential_header: self.console.canonical_header,
            credential,
            body,
        };
        let method = outbound.method;
        self.transport.forward(outbound).await.map_err(|error| {
            warn!(console = %self.console.kind, %method, %error, "relay call failed");
            match error {
                RelayTransportError::Timeout { .. } => {
                    Error::gateway_timeout("orchestrator timed out")
                }
                RelayTransportError::Transport { .. } => {
                    Error::bad_gateway("orchestrator unavailable")
                }
                RelayTransportError::InvalidRequest { .. } => {
                    Error::invalid_request("relay request could not be built")
                }
            }
        })
    }
}

/// Validate a relay tail and turn it into an absolute orchestrator path.
///
/// Empty tails and dot segments (including percent-encoded ones) are
/// rejected so a relay can never walk outside the orchestrator's API.
///
/// # Examples
/// ```
/// use console_gateway::domain::relay_path;
///
/// assert_eq!(relay_path("api/partners/me").unwrap(), "/api/partners/me");
/// assert!(relay_path("api/../admin").is_err());
/// assert!(relay_path("").is_err());
/// ```
pub fn relay_path(tail: &str) -> Result<String, Error> {
    let trimmed = tail.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_request("relay path must not be empty"));
    }
    if trimmed.split('/').any(is_dot_segment) || trimmed.contains('\\') {
        return Err(Error::invalid_request("relay path must not contain dot segments"));
    }
    Ok(format!("/{trimmed}"))
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Parse a relay body as JSON, falling back to an empty object.
///
/// The orchestrator owns payload validation, so malformed input is forwarded
/// as `{}` rather than rejected.
pub fn normalise_body(raw: &[u8]) -> Value {
    serde_json::from_slice(raw).unwrap_or_else(|_| Value::Object(Map::new()))
}
