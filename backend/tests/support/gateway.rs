//! Spawn a real gateway for one console in front of a given orchestrator.

use std::net::TcpListener;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use actix_web::dev::ServerHandle;
use actix_web::web;
use console_gateway::domain::ConsoleKind;
use console_gateway::inbound::http::health::HealthState;
use console_gateway::inbound::http::session_config::SessionSettings;
use console_gateway::outbound::orchestrator::OrchestratorConfig;
use console_gateway::server::{ServerConfig, create_server};
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client, Url, redirect};

/// Running gateway plus a client that never follows redirects.
pub struct Gateway {
    pub base: String,
    pub client: Client,
    handle: ServerHandle,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// Start the gateway for `console` with the given outbound timeout.
pub fn spawn_gateway(console: ConsoleKind, orchestrator: &Url, timeout: Duration) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind gateway");
    let addr = listener.local_addr().expect("gateway addr");
    let session = SessionSettings {
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    };
    let config = ServerConfig::new(
        console.profile(),
        session,
        OrchestratorConfig::new(orchestrator.clone()).with_timeout(timeout),
        addr,
    )
    .with_listener(listener);
    let server = create_server(web::Data::new(HealthState::new()), config).expect("gateway server");
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("reqwest client");
    Gateway {
        base: format!("http://{addr}"),
        client,
        handle,
    }
}

/// `name=value` pair of the session cookie set by a response.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_owned)
}
