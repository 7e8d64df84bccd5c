//! Relay handlers forwarding browser calls to the orchestrator.
//!
//! ```text
//! ANY  /api/proxy/{tail}              -> {orchestrator}/{tail}?{query}
//! GET  /api/client/findings?asset_id= -> GET  /api/client/findings   (client console)
//! POST /api/client/reports/summary    -> POST /api/client/reports/summary (client console)
//! ```
//!
//! The session cookie is never consulted here: the credential must arrive in
//! one of the console's accepted headers. Upstream status and body come back
//! unchanged, always marked `no-store`.

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use url::form_urlencoded;
use utoipa::IntoParams;

use crate::domain::ports::{RelayMethod, UpstreamResponse};
use crate::domain::{ConsoleKind, ConsoleProfile, Error, RelayRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::state::HttpState;

const FINDINGS_PATH: &str = "api/client/findings";
const REPORT_SUMMARY_PATH: &str = "api/client/reports/summary";

/// Query accepted by the client findings relay.
#[derive(Debug, Deserialize, IntoParams)]
pub struct FindingsQuery {
    /// Restrict findings to one asset.
    pub asset_id: Option<String>,
}

/// Forward any supported method under `/api/proxy/` to the orchestrator.
#[utoipa::path(
    method(get, head, post, put, patch, delete),
    path = "/api/proxy/{tail}",
    params(("tail" = String, Path, description = "Orchestrator path")),
    request_body(
        content = serde_json::Value,
        description = "Forwarded JSON body; malformed JSON is sent as `{}`"
    ),
    responses(
        (status = 200, description = "Orchestrator response, passed through"),
        (status = 400, description = "Relay path rejected", body = Error),
        (status = 401, description = "Missing credential header", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["relay"],
    operation_id = "proxy"
)]
pub async fn proxy(
    state: web::Data<HttpState>,
    req: HttpRequest,
    tail: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let method = RelayMethod::parse(req.method().as_str())
        .ok_or_else(|| Error::invalid_request("method not supported"))?;
    let query = match req.query_string() {
        "" => None,
        raw => Some(raw.to_owned()),
    };
    forward(&state, &req, method, &tail, query, &body).await
}

/// Client findings, optionally filtered by asset.
#[utoipa::path(
    get,
    path = "/api/client/findings",
    params(FindingsQuery),
    responses(
        (status = 200, description = "Orchestrator response, passed through"),
        (status = 401, description = "Missing credential header", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["relay"],
    operation_id = "clientFindings"
)]
pub async fn client_findings(
    state: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<FindingsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner().asset_id.map(|asset_id| {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("asset_id", &asset_id)
            .finish()
    });
    forward(&state, &req, RelayMethod::Get, FINDINGS_PATH, query, &[]).await
}

/// Client report summary.
#[utoipa::path(
    post,
    path = "/api/client/reports/summary",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Orchestrator response, passed through"),
        (status = 401, description = "Missing credential header", body = Error),
        (status = 502, description = "Orchestrator unavailable", body = Error),
        (status = 504, description = "Orchestrator timed out", body = Error)
    ),
    tags = ["relay"],
    operation_id = "clientReportSummary"
)]
pub async fn client_report_summary(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    forward(&state, &req, RelayMethod::Post, REPORT_SUMMARY_PATH, None, &body).await
}

async fn forward(
    state: &HttpState,
    req: &HttpRequest,
    method: RelayMethod,
    path: &str,
    query: Option<String>,
    body: &[u8],
) -> ApiResult<HttpResponse> {
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            std::str::from_utf8(value.as_bytes())
                .ok()
                .map(|value| (name.as_str(), value))
        })
        .collect();
    let upstream = state
        .relay
        .forward(RelayRequest {
            method,
            path,
            query,
            headers,
            body,
        })
        .await?;
    passthrough(upstream)
}

fn passthrough(upstream: UpstreamResponse) -> ApiResult<HttpResponse> {
    let status = StatusCode::from_u16(upstream.status)
        .map_err(|_| Error::bad_gateway("orchestrator returned an invalid status"))?;
    let mut builder = HttpResponse::build(status);
    builder.insert_header(no_store_header());
    if let Some(content_type) = upstream.content_type {
        builder.insert_header((CONTENT_TYPE, content_type));
    }
    Ok(builder.body(upstream.body))
}

/// Register relay routes for `console` on an `/api` scope.
///
/// Unsupported methods on the proxy answer `405`.
pub fn configure(cfg: &mut web::ServiceConfig, console: &ConsoleProfile) {
    cfg.service(
        web::resource("/proxy/{tail:.*}")
            .route(web::get().to(proxy))
            .route(web::head().to(proxy))
            .route(web::post().to(proxy))
            .route(web::put().to(proxy))
            .route(web::patch().to(proxy))
            .route(web::delete().to(proxy)),
    );
    if console.kind == ConsoleKind::Client {
        cfg.route("/client/findings", web::get().to(client_findings))
            .route(
                "/client/reports/summary",
                web::post().to(client_report_summary),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockRelayTransport, RelayTransportError};
    use crate::inbound::http::cache_control::NO_STORE;
    use crate::inbound::http::test_utils::fixture_state;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::header::CACHE_CONTROL;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::{Value, json};

    async fn relay_app(
        kind: ConsoleKind,
        transport: MockRelayTransport,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
    {
        let console = kind.profile();
        test::init_service(
            App::new()
                .app_data(web::Data::new(fixture_state(console, transport)))
                .service(web::scope("/api").configure(|cfg| configure(cfg, console))),
        )
        .await
    }

    fn header(res: &ServiceResponse, name: impl actix_web::http::header::AsHeaderName) -> Option<String> {
        res.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    #[rstest]
    #[actix_web::test]
    async fn forwards_with_canonical_header_and_passes_response_through() {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .withf(|outbound| {
                outbound.method == RelayMethod::Get
                    && outbound.path == "/api/partners/clients"
                    && outbound.query.as_deref() == Some("page=2")
                    && outbound.credential_header == "X-Partner-API-Key"
                    && outbound.credential.expose() == "pk_fallback"
                    && outbound.body.is_none()
            })
            .times(1)
            .returning(|_| Ok(UpstreamResponse::json(200, &json!({ "clients": [] }))));
        let app = relay_app(ConsoleKind::Partner, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/proxy/api/partners/clients?page=2")
                .insert_header(("X-Api-Key", "pk_fallback"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, CACHE_CONTROL).as_deref(), Some(NO_STORE));
        assert_eq!(header(&res, CONTENT_TYPE).as_deref(), Some("application/json"));
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "clients": [] }));
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_credential_fails_closed_without_calling_upstream() {
        let mut transport = MockRelayTransport::new();
        transport.expect_forward().times(0);
        let app = relay_app(ConsoleKind::Partner, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/proxy/api/partners/me")
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(header(&res, CACHE_CONTROL).as_deref(), Some(NO_STORE));
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "missing X-Partner-API-Key");
    }

    #[rstest]
    #[case("/api/proxy/api/../admin")]
    #[case("/api/proxy/api/%2e%2e/admin")]
    #[case("/api/proxy/")]
    #[actix_web::test]
    async fn unsafe_tails_are_rejected_before_forwarding(#[case] uri: &str) {
        let mut transport = MockRelayTransport::new();
        transport.expect_forward().times(0);
        let app = relay_app(ConsoleKind::Admin, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(uri)
                .insert_header(("X-Admin-Master-Key", "sess_1"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[actix_web::test]
    async fn upstream_errors_keep_their_status() {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .returning(|_| Ok(UpstreamResponse::json(404, &json!({ "detail": "no such asset" }))));
        let app = relay_app(ConsoleKind::Client, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/api/proxy/api/client/assets/9")
                .insert_header(("X-Client-API-Key", "sk_demo_123"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "no such asset");
    }

    #[rstest]
    #[case(RelayTransportError::timeout("5s"), StatusCode::GATEWAY_TIMEOUT)]
    #[case(RelayTransportError::transport("connection refused"), StatusCode::BAD_GATEWAY)]
    #[actix_web::test]
    async fn transport_failures_map_to_gateway_errors(
        #[case] error: RelayTransportError,
        #[case] status: StatusCode,
    ) {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .times(1)
            .returning(move |_| Err(error.clone()));
        let app = relay_app(ConsoleKind::Client, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/proxy/api/client/assets")
                .insert_header(("X-Client-API-Key", "sk_demo_123"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), status);
        let body: Value = test::read_body_json(res).await;
        assert!(!body["detail"].as_str().unwrap_or_default().contains("127.0.0.1"));
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_bodies_are_forwarded_as_empty_objects() {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .withf(|outbound| outbound.method == RelayMethod::Put && outbound.body == Some(json!({})))
            .times(1)
            .returning(|_| Ok(UpstreamResponse::json(200, &json!({ "ok": true }))));
        let app = relay_app(ConsoleKind::Admin, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/api/proxy/api/master/partners/3")
                .insert_header(("X-Admin-Master-Key", "sess_1"))
                .set_payload("{not json")
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn unsupported_methods_are_not_allowed() {
        let mut transport = MockRelayTransport::new();
        transport.expect_forward().times(0);
        let app = relay_app(ConsoleKind::Partner, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::default()
                .method(actix_web::http::Method::OPTIONS)
                .uri("/api/proxy/api/partners/me")
                .insert_header(("X-Partner-API-Key", "pk_1"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[rstest]
    #[case(Some("a b&c"), Some("asset_id=a+b%26c"))]
    #[case(None, None)]
    #[actix_web::test]
    async fn findings_relay_encodes_the_asset_filter(
        #[case] asset_id: Option<&str>,
        #[case] expected: Option<&'static str>,
    ) {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .withf(move |outbound| {
                outbound.method == RelayMethod::Get
                    && outbound.path == "/api/client/findings"
                    && outbound.query.as_deref() == expected
                    && outbound.credential_header == "X-Client-API-Key"
            })
            .times(1)
            .returning(|_| Ok(UpstreamResponse::json(200, &json!([]))));
        let app = relay_app(ConsoleKind::Client, transport).await;

        let uri = match asset_id {
            Some(id) => format!(
                "/api/client/findings?{}",
                form_urlencoded::Serializer::new(String::new())
                    .append_pair("asset_id", id)
                    .finish()
            ),
            None => "/api/client/findings".to_owned(),
        };
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(("X-Client-API-Key", "sk_demo_123"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn report_summary_relay_forwards_the_body() {
        let mut transport = MockRelayTransport::new();
        transport
            .expect_forward()
            .withf(|outbound| {
                outbound.method == RelayMethod::Post
                    && outbound.path == "/api/client/reports/summary"
                    && outbound.body == Some(json!({ "period": "30d" }))
            })
            .times(1)
            .returning(|_| Ok(UpstreamResponse::json(201, &json!({ "id": "r-1" }))));
        let app = relay_app(ConsoleKind::Client, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/client/reports/summary")
                .insert_header(("X-Api-Key", "sk_demo_123"))
                .set_json(json!({ "period": "30d" }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[actix_web::test]
    async fn named_client_relays_are_not_mounted_elsewhere() {
        let mut transport = MockRelayTransport::new();
        transport.expect_forward().times(0);
        let app = relay_app(ConsoleKind::Partner, transport).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/client/findings")
                .insert_header(("X-Api-Key", "pk_1"))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
