//! Gateway settings loaded via OrthoConfig, and the server configuration
//! built from them.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::{ConsoleKind, ConsoleProfile, UnknownConsole};
use crate::inbound::http::session_config::SessionSettings;
use crate::outbound::orchestrator::{DEFAULT_REQUEST_TIMEOUT, OrchestratorConfig};

const DEFAULT_ORCHESTRATOR_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Process-wide gateway settings.
///
/// Read from `CONSOLE_GATEWAY_*` environment variables, CLI flags, or a
/// config file. Values are read once at startup. Every field may be absent,
/// so loading with no sources at all succeeds.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "CONSOLE_GATEWAY")]
pub struct GatewaySettings {
    /// Console served by this process: `admin`, `partner`, or `client`.
    pub console: Option<String>,
    /// Orchestrator base address.
    pub orchestrator_url: Option<String>,
    /// Listen address.
    pub bind_addr: Option<String>,
    /// Outbound request timeout in seconds.
    #[ortho_config(default = 10)]
    pub request_timeout_secs: Option<u64>,
}

/// Invalid gateway settings.
#[derive(Debug, thiserror::Error)]
pub enum GatewayConfigError {
    /// No console was configured.
    #[error("CONSOLE_GATEWAY_CONSOLE must be set to admin, partner, or client")]
    MissingConsole,
    /// The console name is not known.
    #[error(transparent)]
    UnknownConsole(#[from] UnknownConsole),
    /// The orchestrator URL does not parse or is not HTTP(S).
    #[error("invalid orchestrator url '{value}': {reason}")]
    OrchestratorUrl { value: String, reason: String },
    /// The bind address does not parse.
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// A zero timeout would fail every call.
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

impl GatewaySettings {
    /// Console served by this process.
    ///
    /// # Errors
    ///
    /// Returns an error when the console is missing or unknown.
    pub fn console(&self) -> Result<ConsoleKind, GatewayConfigError> {
        let raw = self
            .console
            .as_deref()
            .ok_or(GatewayConfigError::MissingConsole)?;
        Ok(raw.parse()?)
    }

    /// Orchestrator base address, defaulting to a local orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not an absolute HTTP(S) URL.
    pub fn orchestrator_url(&self) -> Result<Url, GatewayConfigError> {
        let raw = self
            .orchestrator_url
            .as_deref()
            .unwrap_or(DEFAULT_ORCHESTRATOR_URL);
        let url = Url::parse(raw).map_err(|error| GatewayConfigError::OrchestratorUrl {
            value: raw.to_owned(),
            reason: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayConfigError::OrchestratorUrl {
                value: raw.to_owned(),
                reason: "scheme must be http or https".to_owned(),
            });
        }
        Ok(url)
    }

    /// Listen address, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, GatewayConfigError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| GatewayConfigError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Outbound request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero timeout.
    pub fn request_timeout(&self) -> Result<Duration, GatewayConfigError> {
        match self.request_timeout_secs {
            None => Ok(DEFAULT_REQUEST_TIMEOUT),
            Some(0) => Err(GatewayConfigError::ZeroTimeout),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }
}

/// Where the server listens.
#[derive(Debug)]
pub enum Listen {
    /// Bind a fresh socket.
    Addr(SocketAddr),
    /// Use an already bound listener.
    Listener(TcpListener),
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) console: &'static ConsoleProfile,
    pub(crate) session: SessionSettings,
    pub(crate) orchestrator: OrchestratorConfig,
    pub(crate) listen: Listen,
}

impl ServerConfig {
    /// Server configuration for `console`.
    #[must_use]
    pub fn new(
        console: &'static ConsoleProfile,
        session: SessionSettings,
        orchestrator: OrchestratorConfig,
        bind_addr: SocketAddr,
    ) -> Self {
        Self {
            console,
            session,
            orchestrator,
            listen: Listen::Addr(bind_addr),
        }
    }

    /// Serve on an already bound listener, e.g. one bound to port 0.
    #[must_use]
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.listen = Listen::Listener(listener);
        self
    }

    /// Build the configuration from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns an error when any setting is invalid.
    pub fn from_settings(
        settings: &GatewaySettings,
        session: SessionSettings,
    ) -> Result<Self, GatewayConfigError> {
        let orchestrator = OrchestratorConfig::new(settings.orchestrator_url()?)
            .with_timeout(settings.request_timeout()?);
        Ok(Self::new(
            settings.console()?.profile(),
            session,
            orchestrator,
            settings.bind_addr()?,
        ))
    }

    /// Console this server will serve.
    #[must_use]
    pub fn console(&self) -> &'static ConsoleProfile {
        self.console
    }
}
