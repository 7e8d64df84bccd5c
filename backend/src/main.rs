//! Gateway entry point: load settings, then serve one console.

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use console_gateway::inbound::http::health::HealthState;
use console_gateway::inbound::http::session_config::fingerprint::key_fingerprint;
use console_gateway::inbound::http::session_config::{BuildMode, session_settings_from_env};
use console_gateway::server::{GatewaySettings, ServerConfig, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatewaySettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load gateway settings: {error}"))?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session cookie settings")?;
    info!(
        key_fingerprint = %key_fingerprint(&session.key),
        cookie_secure = session.cookie_secure,
        "session key loaded"
    );
    let config = ServerConfig::from_settings(&settings, session)
        .wrap_err("invalid gateway settings")?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config).wrap_err("failed to start gateway")?;
    server.await.wrap_err("gateway server failed")
}
