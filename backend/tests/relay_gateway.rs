//! End-to-end relay behaviour against an in-process orchestrator.

#[path = "support/fake_orchestrator.rs"]
mod fake_orchestrator;
// Shared gateway helpers include cookie handling unused by the relay suite.
#[allow(dead_code)]
#[path = "support/gateway.rs"]
mod gateway_support;

use std::net::TcpListener;
use std::time::Duration;

use console_gateway::domain::ConsoleKind;
use fake_orchestrator::{CLIENT_KEY, PARTNER_KEY, spawn_fake_orchestrator};
use gateway_support::spawn_gateway;
use reqwest::header::CACHE_CONTROL;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};

const TIMEOUT: Duration = Duration::from_secs(5);

#[actix_rt::test]
async fn partner_relay_attaches_the_canonical_header_and_request_id() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Partner, &orchestrator.base_url, TIMEOUT);
    let request_id = "0b8f0f5e-5e0a-4f3e-9a59-55b2d9c6d0b1";

    let response = gateway
        .client
        .get(gateway.url("/api/proxy/api/partners/clients?page=2"))
        .header("X-Api-Key", PARTNER_KEY)
        .header("x-request-id", request_id)
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    assert_eq!(
        response.headers().get("trace-id").and_then(|v| v.to_str().ok()),
        Some(request_id)
    );
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["path"], "/api/partners/clients");
    assert_eq!(body["query"], "page=2");

    let calls = orchestrator.recorder.calls();
    let call = calls.last().expect("upstream call");
    assert_eq!(call.method, "GET");
    assert_eq!(call.header("X-Partner-API-Key"), Some(PARTNER_KEY));
    assert_eq!(call.header("X-Request-Id"), Some(request_id));
    assert_eq!(call.header("Cache-Control"), Some("no-store"));

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn credential_header_is_forwarded_exactly_as_sent() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Partner, &orchestrator.base_url, TIMEOUT);

    let response = gateway
        .client
        .get(gateway.url("/api/proxy/api/partners/clients"))
        .header("X-Partner-API-Key", "pk live 1")
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::OK);
    let calls = orchestrator.recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].header("X-Partner-API-Key"), Some("pk live 1"));

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn missing_credential_fails_closed_without_calling_upstream() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Client, &orchestrator.base_url, TIMEOUT);

    let response = gateway
        .client
        .get(gateway.url("/api/client/findings"))
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(body["detail"], "missing X-Client-API-Key");
    assert!(orchestrator.recorder.calls().is_empty());

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn client_findings_encode_the_asset_filter() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Client, &orchestrator.base_url, TIMEOUT);

    let response = gateway
        .client
        .get(gateway.url("/api/client/findings"))
        .query(&[("asset_id", "web 01&x")])
        .header("X-Client-API-Key", CLIENT_KEY)
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["path"], "/api/client/findings");
    assert_eq!(body["query"], "asset_id=web+01%26x");

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn report_summary_posts_the_normalised_body() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Client, &orchestrator.base_url, TIMEOUT);

    let response = gateway
        .client
        .post(gateway.url("/api/client/reports/summary"))
        .header("X-Client-API-Key", CLIENT_KEY)
        .json(&json!({ "period": "30d" }))
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["method"], "POST");
    assert_eq!(body["body"], json!({ "period": "30d" }));

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn upstream_errors_pass_through_unchanged() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(ConsoleKind::Client, &orchestrator.base_url, TIMEOUT);

    let response = gateway
        .client
        .get(gateway.url("/api/proxy/api/client/assets/404"))
        .header("X-Client-API-Key", CLIENT_KEY)
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["detail"], "no such asset");

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn slow_orchestrator_yields_gateway_timeout() {
    let orchestrator = spawn_fake_orchestrator();
    let gateway = spawn_gateway(
        ConsoleKind::Partner,
        &orchestrator.base_url,
        Duration::from_secs(1),
    );

    let response = gateway
        .client
        .get(gateway.url("/api/proxy/api/slow"))
        .header("X-Partner-API-Key", PARTNER_KEY)
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["code"], "gateway_timeout");

    gateway.stop().await;
    orchestrator.stop().await;
}

#[actix_rt::test]
async fn unreachable_orchestrator_yields_bad_gateway() {
    let unused = TcpListener::bind("127.0.0.1:0").expect("bind unused port");
    let addr = unused.local_addr().expect("unused addr");
    drop(unused);
    let orchestrator = Url::parse(&format!("http://{addr}")).expect("url");
    let gateway = spawn_gateway(ConsoleKind::Partner, &orchestrator, TIMEOUT);

    let response = gateway
        .client
        .get(gateway.url("/api/proxy/api/partners/me"))
        .header("X-Partner-API-Key", PARTNER_KEY)
        .send()
        .await
        .expect("relay call");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    gateway.stop().await;
}
