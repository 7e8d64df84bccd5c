//! Session API handlers driving the identity context.
//!
//! ```text
//! POST   /api/session                  {"credential":"sk_demo_123"}
//! POST   /api/session/login            {"username":"admin","password":"password"}
//! GET    /api/session
//! POST   /api/session/resolve
//! DELETE /api/session
//! POST   /api/session/authorize        {"usage":"multi_seat"}
//! POST   /api/session/upstream-status  {"status":401}
//! ```
//!
//! Each request builds an [`IdentityContext`] over the console's session
//! cookie, so the cookie is the only state shared between requests.
//!
//! Last-write-wins holds only within one request's context. Two concurrent
//! `POST /api/session` calls from the same browser each answer with their own
//! cookie, and the session that survives is whichever response the browser
//! stores last. That is completion order, not submission order.

use actix_session::Session;
use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{CredentialExchangeError, CredentialStore};
use crate::domain::{
    ConsoleKind, Credential, Error, Identity, IdentityContext, IdentitySnapshot,
    InvalidationReason, LoginCredentials, LoginValidationError, RenderGate, ResolutionOutcome,
    ResolutionPolicy, SeatUsage, SessionState, SessionStateKind,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::state::HttpState;

/// Request body for `POST /api/session`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SetCredentialRequest {
    /// Raw API key or session token.
    pub credential: String,
}

/// Request body for `POST /api/session/login`.
///
/// The partner console calls the username `email`; both spellings are
/// accepted.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Seat usage an action implies.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeatUsageRequest {
    SingleSeat,
    MultiSeat,
}

impl From<SeatUsageRequest> for SeatUsage {
    fn from(value: SeatUsageRequest) -> Self {
        match value {
            SeatUsageRequest::SingleSeat => Self::SingleSeat,
            SeatUsageRequest::MultiSeat => Self::MultiSeat,
        }
    }
}

/// Request body for `POST /api/session/authorize`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AuthorizeRequest {
    pub usage: SeatUsageRequest,
}

/// Request body for `POST /api/session/upstream-status`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpstreamStatusRequest {
    /// HTTP status the orchestrator returned on a data call.
    pub status: u16,
}

/// Session state as seen by the console front end.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionStateKind,
    pub console: ConsoleKind,
    /// Confirmed identity; present only when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Cached provisional identity shown while resolution is pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<IdentitySnapshot>,
    pub render: RenderGate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidationReason>,
}

impl SessionView {
    fn of<S: CredentialStore>(context: &IdentityContext<S>) -> Self {
        let state = context.state();
        let identity = state.identity().cloned();
        let snapshot = if identity.is_none() {
            context.snapshot()
        } else {
            None
        };
        let reason = match state {
            SessionState::Invalid { reason } => Some(reason),
            _ => None,
        };
        Self {
            state: state.kind(),
            console: context.console().kind,
            identity,
            snapshot,
            render: state.render_gate(),
            reason,
        }
    }

    fn respond(self) -> HttpResponse {
        HttpResponse::Ok().insert_header(no_store_header()).json(self)
    }
}

fn settle<S: CredentialStore>(
    context: &IdentityContext<S>,
    outcome: ResolutionOutcome,
) -> ApiResult<HttpResponse> {
    match outcome {
        ResolutionOutcome::Authenticated(_) | ResolutionOutcome::Superseded => {
            Ok(SessionView::of(context).respond())
        }
        ResolutionOutcome::Invalidated(reason) => Err(reason.into()),
        ResolutionOutcome::NoCredential => Err(Error::unauthorized("no credential in session")),
    }
}

/// Store a credential and resolve it into an identity.
#[utoipa::path(
    post,
    path = "/api/session",
    request_body = SetCredentialRequest,
    responses(
        (status = 200, description = "Session authenticated", body = SessionView),
        (status = 400, description = "Invalid credential", body = Error),
        (status = 401, description = "Credential rejected", body = Error),
        (status = 403, description = "Account is not active", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["session"],
    operation_id = "setCredential",
    security([])
)]
#[post("/session")]
pub async fn set_credential(
    state: web::Data<HttpState>,
    session: Session,
    payload: web::Json<SetCredentialRequest>,
) -> ApiResult<HttpResponse> {
    let credential = Credential::new(&payload.credential).map_err(|err| {
        Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "credential", "code": "invalid_credential" }))
    })?;
    let context = state.identity_context(session);
    let outcome = context.set_credential(credential).await;
    settle(&context, outcome)
}

/// Exchange a username and password for a credential, then resolve it.
#[utoipa::path(
    post,
    path = "/api/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session authenticated", body = SessionView),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 404, description = "Console has no password login", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["session"],
    operation_id = "login",
    security([])
)]
#[post("/session/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: Session,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    if state.console.login_exchange.is_none() {
        return Err(Error::not_found("password login is not available"));
    }
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let credential = state
        .exchange
        .exchange(&credentials)
        .await
        .map_err(map_exchange_error)?;
    let context = state.identity_context(session);
    let outcome = context.set_credential(credential).await;
    settle(&context, outcome)
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => Error::invalid_request("username must not be empty")
            .with_details(json!({ "field": "username", "code": "empty_username" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

fn map_exchange_error(err: CredentialExchangeError) -> Error {
    match err {
        CredentialExchangeError::Unsupported => Error::not_found("password login is not available"),
        CredentialExchangeError::Rejected { .. } => Error::unauthorized("invalid credentials"),
        CredentialExchangeError::Timeout { .. } => Error::gateway_timeout("orchestrator timed out"),
        CredentialExchangeError::UpstreamStatus { .. }
        | CredentialExchangeError::Transport { .. }
        | CredentialExchangeError::Decode { .. } => Error::bad_gateway("orchestrator unavailable"),
    }
}

/// Rehydrate the session from the cookie.
///
/// Eager consoles resolve the identity before answering; lazy consoles answer
/// `resolving` with the provisional snapshot.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session state", body = SessionView)
    ),
    tags = ["session"],
    operation_id = "getSession",
    security([])
)]
#[get("/session")]
pub async fn current_session(state: web::Data<HttpState>, session: Session) -> HttpResponse {
    let context = state.identity_context(session);
    if context.hydrate() == SessionStateKind::Resolving
        && state.console.resolution == ResolutionPolicy::Eager
    {
        context.resolve().await;
    }
    SessionView::of(&context).respond()
}

/// Resolve the stored credential on demand.
#[utoipa::path(
    post,
    path = "/api/session/resolve",
    responses(
        (status = 200, description = "Session authenticated", body = SessionView),
        (status = 401, description = "No credential, or credential rejected", body = Error),
        (status = 403, description = "Account is not active", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["session"],
    operation_id = "resolveSession",
    security([])
)]
#[post("/session/resolve")]
pub async fn resolve_session(
    state: web::Data<HttpState>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let context = state.identity_context(session);
    context.hydrate();
    let outcome = context.resolve().await;
    settle(&context, outcome)
}

/// Clear the credential and identity. Always succeeds.
#[utoipa::path(
    delete,
    path = "/api/session",
    responses((status = 204, description = "Logged out")),
    tags = ["session"],
    operation_id = "logout",
    security([])
)]
#[delete("/session")]
pub async fn logout(state: web::Data<HttpState>, session: Session) -> HttpResponse {
    state.identity_context(session).logout();
    HttpResponse::NoContent()
        .insert_header(no_store_header())
        .finish()
}

/// Check the seat policy for the authenticated identity.
#[utoipa::path(
    post,
    path = "/api/session/authorize",
    request_body = AuthorizeRequest,
    responses(
        (status = 200, description = "Action permitted", body = Identity),
        (status = 401, description = "No authenticated session", body = Error),
        (status = 403, description = "Not permitted for this account", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["session"],
    operation_id = "authorize",
    security([])
)]
#[post("/session/authorize")]
pub async fn authorize(
    state: web::Data<HttpState>,
    session: Session,
    payload: web::Json<AuthorizeRequest>,
) -> ApiResult<HttpResponse> {
    let context = state.identity_context(session);
    context.hydrate();
    if let ResolutionOutcome::Invalidated(reason) = context.resolve().await {
        return Err(reason.into());
    }
    let identity = context.authorize(payload.usage.into())?;
    Ok(HttpResponse::Ok()
        .insert_header(no_store_header())
        .json(identity))
}

/// Report an orchestrator status seen on a data call.
///
/// `401` and `403` end the session; anything else leaves it intact.
#[utoipa::path(
    post,
    path = "/api/session/upstream-status",
    request_body = UpstreamStatusRequest,
    responses(
        (status = 200, description = "Session state after the report", body = SessionView)
    ),
    tags = ["session"],
    operation_id = "observeUpstreamStatus",
    security([])
)]
#[post("/session/upstream-status")]
pub async fn upstream_status(
    state: web::Data<HttpState>,
    session: Session,
    payload: web::Json<UpstreamStatusRequest>,
) -> HttpResponse {
    let context = state.identity_context(session);
    context.hydrate();
    context.observe_upstream_status(payload.status);
    SessionView::of(&context).respond()
}

/// Register the session handlers on an `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(set_credential)
        .service(login)
        .service(current_session)
        .service(resolve_session)
        .service(logout)
        .service(authorize)
        .service(upstream_status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        FIXTURE_SESSION_TOKEN, FixtureCredentialExchange, FixtureProfileSource,
        MockRelayTransport,
    };
    use crate::domain::{AccountMode, ConsoleProfile, IdentityStatus};
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::{fixture_state, test_session_middleware};
    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    fn profiles_with_fixture_token() -> FixtureProfileSource {
        FixtureProfileSource::default()
            .with_identity(
                FIXTURE_SESSION_TOKEN,
                Identity::try_new(
                    "admin-1",
                    "Operator",
                    "ops@x.test",
                    AccountMode::Full,
                    IdentityStatus::Active,
                )
                .expect("identity"),
            )
            .with_identity(
                "pk_live_1",
                Identity::try_new(
                    "p-1",
                    "Acme MSP",
                    "msp@x.test",
                    AccountMode::Full,
                    IdentityStatus::Active,
                )
                .expect("identity"),
            )
    }

    fn state_for(console: &'static ConsoleProfile) -> HttpState {
        if console.kind == ConsoleKind::Client {
            return fixture_state(console, MockRelayTransport::new());
        }
        HttpState::new(
            console,
            HttpStatePorts {
                profiles: Arc::new(profiles_with_fixture_token()),
                exchange: Arc::new(FixtureCredentialExchange),
                transport: Arc::new(MockRelayTransport::new()),
            },
        )
    }

    async fn session_app(
        kind: ConsoleKind,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
    {
        let console = kind.profile();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state_for(console)))
                .wrap(test_session_middleware(console))
                .service(web::scope("/api").configure(configure)),
        )
        .await
    }

    fn session_cookie(res: &ServiceResponse, kind: ConsoleKind) -> Cookie<'static> {
        res.response()
            .cookies()
            .find(|cookie| cookie.name() == kind.profile().session_cookie)
            .expect("session cookie")
            .into_owned()
    }

    #[rstest]
    #[actix_web::test]
    async fn demo_key_round_trip_on_the_eager_client_console() {
        let app = session_app(ConsoleKind::Client).await;

        let set = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(json!({ "credential": "sk_demo_123" }))
                .to_request(),
        )
        .await;
        assert_eq!(set.status(), StatusCode::OK);
        let cookie = session_cookie(&set, ConsoleKind::Client);
        let body: Value = test::read_body_json(set).await;
        assert_eq!(body["state"], "authenticated");
        assert_eq!(body["render"], "render");
        assert_eq!(body["identity"]["accountMode"], "demo");

        let current = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/session")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(current).await;
        assert_eq!(body["state"], "authenticated");
        assert_eq!(body["render"], "render");
        assert_eq!(body["console"], "client");
        assert_eq!(body["identity"]["id"], "client-demo");
    }

    #[rstest]
    #[actix_web::test]
    async fn lazy_partner_console_answers_with_the_snapshot() {
        let app = session_app(ConsoleKind::Partner).await;
        let set = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(json!({ "credential": "pk_live_1" }))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&set, ConsoleKind::Partner);

        let current = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/session")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(current).await;
        assert_eq!(body["state"], "resolving");
        assert_eq!(body["render"], "loading");
        assert_eq!(body["snapshot"]["name"], "Acme MSP");
        assert_eq!(body["snapshot"]["provisional"], true);
        assert!(body.get("identity").is_none());

        let resolved = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/resolve")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resolved.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resolved).await;
        assert_eq!(body["state"], "authenticated");
        assert_eq!(body["console"], "partner");
        assert_eq!(body["identity"]["id"], "p-1");
    }

    #[rstest]
    #[case(json!({ "credential": "sk_unknown" }), StatusCode::UNAUTHORIZED, "unauthorized")]
    #[case(json!({ "credential": "   " }), StatusCode::BAD_REQUEST, "invalid_request")]
    #[actix_web::test]
    async fn bad_credentials_are_refused(
        #[case] payload: Value,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let app = session_app(ConsoleKind::Client).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(payload)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), status);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], code);
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_session_view_redirects_to_login() {
        let app = session_app(ConsoleKind::Admin).await;
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/api/session").to_request())
                .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["state"], "anonymous");
        assert_eq!(body["render"], "redirect_to_login");
    }

    #[rstest]
    #[actix_web::test]
    async fn logout_clears_the_session() {
        let app = session_app(ConsoleKind::Client).await;
        let set = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(json!({ "credential": "sk_demo_123" }))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&set, ConsoleKind::Client);

        let out = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/api/session")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
        let cleared = session_cookie(&out, ConsoleKind::Client);

        let current = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/session").cookie(cleared).to_request(),
        )
        .await;
        let body: Value = test::read_body_json(current).await;
        assert_eq!(body["state"], "anonymous");
    }

    #[rstest]
    #[actix_web::test]
    async fn logout_without_session_is_no_content() {
        let app = session_app(ConsoleKind::Partner).await;
        let res = test::call_service(
            &app,
            test::TestRequest::delete().uri("/api/session").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[actix_web::test]
    async fn admin_password_login_authenticates() {
        let app = session_app(ConsoleKind::Admin).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/login")
                .set_json(json!({ "username": "admin", "password": "password" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["identity"]["id"], "admin-1");
    }

    #[rstest]
    #[case(ConsoleKind::Admin, json!({ "username": "admin", "password": "wrong" }), StatusCode::UNAUTHORIZED)]
    #[case(ConsoleKind::Partner, json!({ "email": "ops@x.test", "password": "" }), StatusCode::BAD_REQUEST)]
    #[case(ConsoleKind::Client, json!({ "username": "admin", "password": "password" }), StatusCode::NOT_FOUND)]
    #[actix_web::test]
    async fn login_failures(
        #[case] kind: ConsoleKind,
        #[case] payload: Value,
        #[case] status: StatusCode,
    ) {
        let app = session_app(kind).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/login")
                .set_json(payload)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), status);
    }

    #[rstest]
    #[case("single_seat", StatusCode::OK)]
    #[case("multi_seat", StatusCode::FORBIDDEN)]
    #[actix_web::test]
    async fn demo_accounts_are_limited_to_one_seat(
        #[case] usage: &str,
        #[case] status: StatusCode,
    ) {
        let app = session_app(ConsoleKind::Client).await;
        let set = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(json!({ "credential": "sk_demo_123" }))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&set, ConsoleKind::Client);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/authorize")
                .cookie(cookie)
                .set_json(json!({ "usage": usage }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), status);
    }

    #[rstest]
    #[actix_web::test]
    async fn authorize_without_session_is_unauthorised() {
        let app = session_app(ConsoleKind::Client).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/authorize")
                .set_json(json!({ "usage": "single_seat" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case(401, "invalid")]
    #[case(403, "invalid")]
    #[case(500, "resolving")]
    #[case(404, "resolving")]
    #[actix_web::test]
    async fn upstream_status_reports(#[case] status: u16, #[case] expected: &str) {
        let app = session_app(ConsoleKind::Client).await;
        let set = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session")
                .set_json(json!({ "credential": "sk_demo_123" }))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&set, ConsoleKind::Client);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/session/upstream-status")
                .cookie(cookie)
                .set_json(json!({ "status": status }))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["state"], expected);
    }
}
