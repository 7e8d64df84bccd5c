//! Server construction and middleware wiring.
//!
//! Middleware order, outermost first: [`Trace`], the console's session
//! middleware, then the [`SessionGuardMiddleware`], which needs the session
//! to be loaded before it runs.

mod config;

pub use config::{GatewayConfigError, GatewaySettings, Listen, ServerConfig};

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::{ConsoleProfile, Error};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::session_config::SessionSettings;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::{identity, relay};
use crate::middleware::{SessionGuardMiddleware, Trace};
use crate::outbound::orchestrator::OrchestratorClient;

/// Everything one app instance needs.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub session: SessionSettings,
}

/// Build the gateway app for the console in `deps.http_state`.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        session,
    } = deps;
    let console: &'static ConsoleProfile = http_state.console;

    let api = web::scope("/api").configure(|cfg| {
        identity::configure(cfg);
        relay::configure(cfg, console);
    });

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(SessionGuardMiddleware::new(console))
        .wrap(session.middleware(console))
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.default_service(web::to(|| async {
        Err::<actix_web::HttpResponse, _>(Error::not_found("no such route"))
    }))
}

/// Handler state backed by the orchestrator client.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when the HTTP client cannot be built.
pub fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let client = OrchestratorClient::new(config.orchestrator.clone(), config.console)
        .map_err(|error| std::io::Error::other(format!("orchestrator client: {error}")))?;
    let client = Arc::new(client);
    Ok(HttpState::new(
        config.console,
        HttpStatePorts {
            profiles: client.clone(),
            exchange: client.clone(),
            transport: client,
        },
    ))
}

/// Construct an Actix HTTP server for one console.
///
/// # Parameters
/// - `health_state`: shared readiness state, marked ready once bound.
/// - `config`: console, session, orchestrator, and listen settings.
///
/// # Returns
/// A [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when building the client, binding the socket,
/// or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config)?);
    let server_health_state = health_state.clone();
    let ServerConfig {
        console,
        session,
        orchestrator,
        listen,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            session: session.clone(),
        })
    });
    let server = match listen {
        Listen::Addr(addr) => server.bind(addr)?,
        Listen::Listener(listener) => server.listen(listener)?,
    };
    for addr in server.addrs() {
        info!(
            console = %console.kind,
            orchestrator = %orchestrator.base_url,
            %addr,
            "gateway listening"
        );
    }
    let server = server.run();

    health_state.mark_ready();
    Ok(server)
}
