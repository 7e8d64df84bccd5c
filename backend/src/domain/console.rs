//! Console variants and their static session profiles.
//!
//! Each deployment of the gateway serves exactly one console. Everything that
//! differs between the administrator, partner, and client consoles (storage
//! keys, credential headers, orchestrator endpoints, guarded paths) lives in a
//! [`ConsoleProfile`] so the rest of the crate never branches on console names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::CredentialKind;

/// Tenant class served by a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleKind {
    /// Internal administrator console.
    Admin,
    /// Managed-service-partner console.
    Partner,
    /// End-client console.
    Client,
}

/// Error returned when a console name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown console '{0}'; expected admin|partner|client")]
pub struct UnknownConsole(pub String);

impl ConsoleKind {
    /// Every console variant, in a stable order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Partner, Self::Client];

    /// Static profile describing this console's session layer.
    pub fn profile(self) -> &'static ConsoleProfile {
        match self {
            Self::Admin => &ADMIN_PROFILE,
            Self::Partner => &PARTNER_PROFILE,
            Self::Client => &CLIENT_PROFILE,
        }
    }

    /// Lower-case console name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Partner => "partner",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for ConsoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleKind {
    type Err = UnknownConsole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "partner" => Ok(Self::Partner),
            "client" => Ok(Self::Client),
            _ => Err(UnknownConsole(s.to_owned())),
        }
    }
}

/// When a console exchanges its stored credential for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Resolve as soon as a stored credential is rehydrated.
    Eager,
    /// Resolve only when a page explicitly asks for it.
    Lazy,
}

/// Orchestrator endpoint that trades a username/password for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginExchange {
    /// Path of the orchestrator login endpoint.
    pub path: &'static str,
    /// JSON field carrying the username (the partner API calls it `email`).
    pub username_field: &'static str,
    /// JSON field in the response carrying the issued token.
    pub token_field: &'static str,
}

/// Everything the session layer needs to know about one console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleProfile {
    /// Console this profile belongs to.
    pub kind: ConsoleKind,
    /// Shape of the credential the console stores.
    pub credential_kind: CredentialKind,
    /// Namespaced storage key for the credential.
    pub credential_key: &'static str,
    /// Namespaced storage key for the cached identity snapshot.
    pub snapshot_key: &'static str,
    /// Name of the cookie that mirrors the credential store server-side.
    pub session_cookie: &'static str,
    /// Accepted inbound credential headers in priority order.
    pub accepted_headers: &'static [&'static str],
    /// Header name the orchestrator expects the credential under.
    pub canonical_header: &'static str,
    /// Orchestrator profile endpoint used for identity resolution.
    pub profile_path: &'static str,
    /// Optional password login exchange.
    pub login_exchange: Option<LoginExchange>,
    /// Path prefixes that require a credential.
    pub protected_prefixes: &'static [&'static str],
    /// Public entry (login) path.
    pub entry_path: &'static str,
    /// Landing path for authenticated callers.
    pub home_path: &'static str,
    /// Identity resolution policy applied to every protected page.
    pub resolution: ResolutionPolicy,
}

impl ConsoleProfile {
    /// Message used when no accepted credential header is present.
    pub fn missing_credential_message(&self) -> String {
        format!("missing {}", self.canonical_header)
    }
}

static ADMIN_PROFILE: ConsoleProfile = ConsoleProfile {
    kind: ConsoleKind::Admin,
    credential_kind: CredentialKind::CookieSession,
    credential_key: "deco_admin_master_key",
    snapshot_key: "deco_admin_user",
    session_cookie: "deco_admin_session",
    accepted_headers: &["X-Admin-Master-Key"],
    canonical_header: "X-Admin-Master-Key",
    profile_path: "/api/master/auth/me",
    login_exchange: Some(LoginExchange {
        path: "/api/master/auth/login",
        username_field: "username",
        token_field: "token",
    }),
    protected_prefixes: &["/dashboard"],
    entry_path: "/login",
    home_path: "/dashboard/overview",
    resolution: ResolutionPolicy::Eager,
};

static PARTNER_PROFILE: ConsoleProfile = ConsoleProfile {
    kind: ConsoleKind::Partner,
    credential_kind: CredentialKind::ApiKey,
    credential_key: "deco_partner_api_key",
    snapshot_key: "deco_partner_user",
    session_cookie: "deco_partner_session",
    accepted_headers: &["X-Partner-API-Key", "X-Api-Key"],
    canonical_header: "X-Partner-API-Key",
    profile_path: "/api/partners/me",
    login_exchange: Some(LoginExchange {
        path: "/api/partners/login",
        username_field: "email",
        token_field: "access_token",
    }),
    protected_prefixes: &["/dashboard"],
    entry_path: "/login",
    home_path: "/dashboard/overview",
    resolution: ResolutionPolicy::Lazy,
};

static CLIENT_PROFILE: ConsoleProfile = ConsoleProfile {
    kind: ConsoleKind::Client,
    credential_kind: CredentialKind::ApiKey,
    credential_key: "deco_api_key",
    snapshot_key: "deco_client_user",
    session_cookie: "deco_client_session",
    accepted_headers: &["X-Client-API-Key", "X-Api-Key"],
    canonical_header: "X-Client-API-Key",
    profile_path: "/api/clients/me",
    login_exchange: None,
    protected_prefixes: &["/dashboard"],
    entry_path: "/login",
    home_path: "/dashboard/home",
    resolution: ResolutionPolicy::Eager,
};
