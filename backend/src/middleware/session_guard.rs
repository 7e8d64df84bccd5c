//! Navigation guard enforcing [`SessionGuard`] decisions.
//!
//! Runs inside the session middleware so it can see the console's cookie.
//! The check is presence-only: the guard never reads or validates the
//! credential, it only redirects.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{CACHE_CONTROL, LOCATION};
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;
use url::form_urlencoded;

use crate::domain::{ConsoleProfile, GuardDecision, SessionGuard, canonical_path};
use crate::inbound::http::cache_control::NO_STORE;
use crate::inbound::http::session::SessionCredentialStore;

/// Middleware redirecting navigations according to the console's guard.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use console_gateway::domain::ConsoleKind;
/// use console_gateway::middleware::SessionGuardMiddleware;
///
/// let app = App::new().wrap(SessionGuardMiddleware::new(ConsoleKind::Client.profile()));
/// ```
#[derive(Clone)]
pub struct SessionGuardMiddleware {
    console: &'static ConsoleProfile,
    guard: Rc<SessionGuard>,
}

impl SessionGuardMiddleware {
    /// Guard for `console`.
    pub fn new(console: &'static ConsoleProfile) -> Self {
        Self {
            console,
            guard: Rc::new(SessionGuard::for_console(console)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuardMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service,
            console: self.console,
            guard: Rc::clone(&self.guard),
        }))
    }
}

/// Service wrapper produced by [`SessionGuardMiddleware`].
pub struct SessionGuardService<S> {
    service: S,
    console: &'static ConsoleProfile,
    guard: Rc<SessionGuard>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let present = SessionCredentialStore::new(req.get_session(), self.console).has_credential();
        let location = match self.guard.decide(req.path(), present) {
            GuardDecision::Allow => {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
            }
            GuardDecision::RedirectToLogin => login_location(&self.guard, &req),
            GuardDecision::RedirectToHome => self.guard.home_path().to_owned(),
        };

        debug!(console = %self.console.kind, path = %req.path(), %location, "guard redirect");
        let response = HttpResponse::TemporaryRedirect()
            .insert_header((LOCATION, location))
            .insert_header((CACHE_CONTROL, NO_STORE))
            .finish();
        Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
    }
}

fn login_location(guard: &SessionGuard, req: &ServiceRequest) -> String {
    let path = canonical_path(req.path());
    let next = match req.query_string() {
        "" => path,
        query => format!("{path}?{query}"),
    };
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", &next)
        .finish();
    format!("{}?{query}", guard.entry_path())
}
