//! Driven port for the outbound half of a relay call.
//!
//! The domain owns the request and response shapes so relay policy (fail
//! closed, body normalisation, error mapping) can be tested against a mock
//! transport with call-count assertions.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Credential;

use super::define_port_error;

/// HTTP method family a relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMethod {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl RelayMethod {
    /// Parse an inbound method name; unsupported methods yield `None`.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Whether requests of this method carry a JSON body.
    pub fn allows_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully prepared outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRelay {
    /// Method forwarded unchanged.
    pub method: RelayMethod,
    /// Orchestrator path, always starting with `/`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Header name the orchestrator expects the credential under.
    pub credential_header: &'static str,
    /// Credential forwarded verbatim.
    pub credential: Credential,
    /// Normalised JSON body for body-carrying methods.
    pub body: Option<Value>,
}

/// Orchestrator response passed back to the browser untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// Status code as returned by the orchestrator.
    pub status: u16,
    /// `Content-Type` header, if the orchestrator sent one.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// JSON response helper used by fixtures and tests.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_owned()),
            body: body.to_string().into_bytes(),
        }
    }
}

define_port_error! {
    /// Errors raised before an orchestrator response was received.
    pub enum RelayTransportError {
        /// Connection or protocol failure.
        Transport { message: String } => "relay transport failed: {message}",
        /// The call exceeded the configured timeout.
        Timeout { message: String } => "relay timed out: {message}",
        /// The adapter could not build a request from the input.
        InvalidRequest { message: String } => "relay request invalid: {message}",
    }
}

/// Port sending one prepared request to the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Forward `request` and return the orchestrator response as-is.
    async fn forward(&self, request: OutboundRelay) -> Result<UpstreamResponse, RelayTransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("get", Some(RelayMethod::Get))]
    #[case("PATCH", Some(RelayMethod::Patch))]
    #[case("OPTIONS", None)]
    #[case("TRACE", None)]
    fn parses_supported_methods(#[case] raw: &str, #[case] expected: Option<RelayMethod>) {
        assert_eq!(RelayMethod::parse(raw), expected);
    }

    #[rstest]
    #[case(RelayMethod::Get, false)]
    #[case(RelayMethod::Delete, false)]
    #[case(RelayMethod::Post, true)]
    #[case(RelayMethod::Put, true)]
    fn body_methods(#[case] method: RelayMethod, #[case] expected: bool) {
        assert_eq!(method.allows_body(), expected);
    }
}
