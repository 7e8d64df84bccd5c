//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] documents the session endpoints, the relays, and the health
//! probes. The relays authenticate with the console's credential header; the
//! session endpoints with the console's private session cookie. The
//! specification is served by Swagger UI in debug builds and exported via
//! `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{
    ConsoleKind, Error, ErrorCode, Identity, IdentitySnapshot, InvalidationReason, RenderGate,
    SessionStateKind,
};
use crate::inbound::http::identity::{
    AuthorizeRequest, LoginRequest, SeatUsageRequest, SessionView, SetCredentialRequest,
    UpstreamStatusRequest,
};

/// Register the credential header and session cookie security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "CredentialHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-Client-API-Key",
                "Console credential header; partner and admin consoles use \
                 X-Partner-API-Key and X-Admin-Master-Key.",
            ))),
        );
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "deco_client_session",
                "Private session cookie set by POST /api/session.",
            ))),
        );
    }
}

/// OpenAPI document for the gateway.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Console gateway API",
        description = "Session, relay, and health endpoints for one security console."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("CredentialHeader" = [])),
    paths(
        crate::inbound::http::identity::set_credential,
        crate::inbound::http::identity::login,
        crate::inbound::http::identity::current_session,
        crate::inbound::http::identity::resolve_session,
        crate::inbound::http::identity::logout,
        crate::inbound::http::identity::authorize,
        crate::inbound::http::identity::upstream_status,
        crate::inbound::http::relay::proxy,
        crate::inbound::http::relay::client_findings,
        crate::inbound::http::relay::client_report_summary,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        ConsoleKind,
        Identity,
        IdentitySnapshot,
        InvalidationReason,
        RenderGate,
        SessionStateKind,
        SessionView,
        SetCredentialRequest,
        LoginRequest,
        AuthorizeRequest,
        SeatUsageRequest,
        UpstreamStatusRequest,
    )),
    tags(
        (name = "session", description = "Credential and identity lifecycle"),
        (name = "relay", description = "Credential-attaching orchestrator relays"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
