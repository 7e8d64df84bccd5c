//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite};

use crate::domain::ConsoleProfile;
use crate::domain::ports::{FixtureCredentialExchange, FixtureProfileSource, RelayTransport};
use crate::inbound::http::session_config::SessionSettings;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Session middleware for `console` with a fresh key and `Secure` disabled
/// so plain-HTTP test requests keep the cookie.
pub fn test_session_middleware(console: &ConsoleProfile) -> SessionMiddleware<CookieSessionStore> {
    test_session_settings().middleware(console)
}

/// Session settings suitable for plain-HTTP tests.
pub fn test_session_settings() -> SessionSettings {
    SessionSettings {
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    }
}

/// Handler state over in-memory fixtures and the given relay transport.
pub fn fixture_state(
    console: &'static ConsoleProfile,
    transport: impl RelayTransport + 'static,
) -> HttpState {
    HttpState::new(
        console,
        HttpStatePorts {
            profiles: Arc::new(FixtureProfileSource::default()),
            exchange: Arc::new(FixtureCredentialExchange),
            transport: Arc::new(transport),
        },
    )
}
