//! Reqwest-backed orchestrator adapter.
//!
//! This adapter owns transport details only: URL construction, the common
//! outbound headers, timeout and HTTP error mapping, and JSON decoding.
//! Every request carries `Accept: application/json`, `Cache-Control: no-store`,
//! and the current trace id as `X-Request-Id`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use tracing::debug;

use super::dto::{issued_token, login_body};
use crate::domain::ports::{
    CredentialExchange, CredentialExchangeError, OutboundRelay, ProfileSource,
    ProfileSourceError, RelayMethod, RelayTransport, RelayTransportError, UpstreamResponse,
};
use crate::domain::{ConsoleProfile, Credential, Identity, LoginCredentials};
use crate::middleware::trace::{REQUEST_ID_HEADER, TraceId};

/// Timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the orchestrator lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Base address; relay paths are appended to it.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OrchestratorConfig {
    /// Config for `base_url` with [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Orchestrator client bound to one console.
#[derive(Clone)]
pub struct OrchestratorClient {
    client: Client,
    base_url: Url,
    console: &'static ConsoleProfile,
}

impl OrchestratorClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        config: OrchestratorConfig,
        console: &'static ConsoleProfile,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            console,
        })
    }

    fn endpoint(&self, path: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
        join_endpoint(&self.base_url, path, query)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store");
        match TraceId::current() {
            Some(trace_id) => builder.header(REQUEST_ID_HEADER, trace_id.to_string()),
            None => builder,
        }
    }
}

fn join_endpoint(base: &Url, path: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}{path}"))?;
    url.set_query(query);
    Ok(url)
}

fn reqwest_method(method: RelayMethod) -> Method {
    match method {
        RelayMethod::Get => Method::GET,
        RelayMethod::Head => Method::HEAD,
        RelayMethod::Post => Method::POST,
        RelayMethod::Put => Method::PUT,
        RelayMethod::Patch => Method::PATCH,
        RelayMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl ProfileSource for OrchestratorClient {
    async fn fetch_profile(&self, credential: &Credential) -> Result<Identity, ProfileSourceError> {
        let url = self
            .endpoint(self.console.profile_path, None)
            .map_err(|error| ProfileSourceError::transport(error.to_string()))?;
        let response = self
            .request(Method::GET, url)
            .header(self.console.canonical_header, credential.expose())
            .send()
            .await
            .map_err(map_profile_transport_error)?;

        let status = response.status();
        debug!(
            console = %self.console.kind,
            status = status.as_u16(),
            "orchestrator profile lookup"
        );
        if !status.is_success() {
            return Err(map_profile_status(status));
        }
        let body = response
            .bytes()
            .await
            .map_err(map_profile_transport_error)?;
        serde_json::from_slice(&body).map_err(|error| {
            ProfileSourceError::decode(format!("invalid profile payload: {error}"))
        })
    }
}

#[async_trait]
impl RelayTransport for OrchestratorClient {
    async fn forward(&self, outbound: OutboundRelay) -> Result<UpstreamResponse, RelayTransportError> {
        let url = self
            .endpoint(&outbound.path, outbound.query.as_deref())
            .map_err(|error| RelayTransportError::invalid_request(error.to_string()))?;
        let mut builder = self
            .request(reqwest_method(outbound.method), url)
            .header(outbound.credential_header, outbound.credential.expose());
        if let Some(body) = &outbound.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(map_relay_transport_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(map_relay_transport_error)?;
        debug!(
            console = %self.console.kind,
            method = %outbound.method,
            path = %outbound.path,
            status,
            "orchestrator relay call"
        );
        Ok(UpstreamResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl CredentialExchange for OrchestratorClient {
    async fn exchange(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Credential, CredentialExchangeError> {
        let exchange = self
            .console
            .login_exchange
            .ok_or_else(CredentialExchangeError::unsupported)?;
        let url = self
            .endpoint(exchange.path, None)
            .map_err(|error| CredentialExchangeError::transport(error.to_string()))?;
        let response = self
            .request(Method::POST, url)
            .json(&login_body(&exchange, credentials))
            .send()
            .await
            .map_err(map_exchange_transport_error)?;

        let status = response.status();
        debug!(
            console = %self.console.kind,
            status = status.as_u16(),
            "orchestrator login exchange"
        );
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(CredentialExchangeError::rejected(status.as_u16()));
        }
        if !status.is_success() {
            return Err(CredentialExchangeError::upstream_status(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(map_exchange_transport_error)?;
        let token = issued_token(&body, exchange.token_field)
            .map_err(CredentialExchangeError::decode)?;
        Credential::new(token).map_err(|error| CredentialExchangeError::decode(error.to_string()))
    }
}

fn map_profile_status(status: StatusCode) -> ProfileSourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProfileSourceError::rejected(status.as_u16())
        }
        _ => ProfileSourceError::upstream_status(status.as_u16()),
    }
}

fn map_profile_transport_error(error: reqwest::Error) -> ProfileSourceError {
    if error.is_timeout() {
        ProfileSourceError::timeout(error.to_string())
    } else if error.is_decode() {
        ProfileSourceError::decode(error.to_string())
    } else {
        ProfileSourceError::transport(error.to_string())
    }
}

fn map_relay_transport_error(error: reqwest::Error) -> RelayTransportError {
    if error.is_timeout() {
        RelayTransportError::timeout(error.to_string())
    } else if error.is_builder() {
        RelayTransportError::invalid_request(error.to_string())
    } else {
        RelayTransportError::transport(error.to_string())
    }
}

fn map_exchange_transport_error(error: reqwest::Error) -> CredentialExchangeError {
    if error.is_timeout() {
        CredentialExchangeError::timeout(error.to_string())
    } else {
        CredentialExchangeError::transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network helpers; wire behaviour is exercised
    //! against a fake orchestrator in the integration tests.

    use super::*;
    use crate::domain::ConsoleKind;
    use rstest::rstest;

    #[rstest]
    #[case("http://orch:8000", "/api/partners/me", None, "http://orch:8000/api/partners/me")]
    #[case("http://orch:8000/", "/api/partners/me", None, "http://orch:8000/api/partners/me")]
    #[case("http://edge/orch/", "/api/clients/me", None, "http://edge/orch/api/clients/me")]
    #[case(
        "http://orch:8000",
        "/api/client/findings",
        Some("asset_id=a+b%26c"),
        "http://orch:8000/api/client/findings?asset_id=a+b%26c"
    )]
    fn joins_paths_onto_the_base_address(
        #[case] base: &str,
        #[case] path: &str,
        #[case] query: Option<&str>,
        #[case] expected: &str,
    ) {
        let base = Url::parse(base).expect("base url");
        let url = join_endpoint(&base, path, query).expect("endpoint");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, true)]
    #[case(StatusCode::FORBIDDEN, true)]
    #[case(StatusCode::NOT_FOUND, false)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case(StatusCode::SERVICE_UNAVAILABLE, false)]
    fn only_authorisation_statuses_reject_the_credential(
        #[case] status: StatusCode,
        #[case] rejected: bool,
    ) {
        assert_eq!(map_profile_status(status).is_rejection(), rejected);
    }

    #[rstest]
    fn maps_every_relay_method() {
        assert_eq!(reqwest_method(RelayMethod::Patch), Method::PATCH);
        assert_eq!(reqwest_method(RelayMethod::Head), Method::HEAD);
        assert_eq!(reqwest_method(RelayMethod::Delete), Method::DELETE);
    }

    #[rstest]
    #[tokio::test]
    async fn consoles_without_login_report_unsupported() {
        let client = OrchestratorClient::new(
            OrchestratorConfig::new(Url::parse("http://orchestrator.invalid").expect("url")),
            ConsoleKind::Client.profile(),
        )
        .expect("client");
        let credentials = LoginCredentials::try_from_parts("u", "p").expect("credentials");
        let err = client.exchange(&credentials).await.expect_err("unsupported");
        assert!(matches!(err, CredentialExchangeError::Unsupported));
    }
}
