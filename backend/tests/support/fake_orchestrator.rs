//! In-process stand-in for the orchestrator.
//!
//! Serves the profile and login endpoints the consoles use, an echo route
//! that reports exactly what the gateway forwarded, and a slow route for
//! timeout checks. Every call is recorded.

use std::net::TcpListener;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{HttpRequest, HttpResponse, HttpServer, web};
use reqwest::Url;
use serde_json::{Value, json};

/// Partner API key the fake orchestrator accepts.
pub const PARTNER_KEY: &str = "pk_live_1";
/// Client API key the fake orchestrator accepts.
pub const CLIENT_KEY: &str = "sk_demo_123";
/// Partner login accepted by the fake orchestrator.
pub const PARTNER_EMAIL: &str = "ops@acme.test";
pub const PARTNER_PASSWORD: &str = "correct horse";

/// One request as the orchestrator saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedCall {
    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<RecordedCall>>,
}

impl Recorder {
    fn record(&self, req: &HttpRequest) {
        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        self.calls.lock().expect("recorder lock").push(RecordedCall {
            method: req.method().as_str().to_owned(),
            path: req.path().to_owned(),
            headers,
        });
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("recorder lock").clone()
    }
}

/// Running fake orchestrator.
pub struct FakeOrchestrator {
    pub base_url: Url,
    pub recorder: web::Data<Recorder>,
    handle: ServerHandle,
}

impl FakeOrchestrator {
    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

async fn partner_me(req: HttpRequest, recorder: web::Data<Recorder>) -> HttpResponse {
    recorder.record(&req);
    if header_value(&req, "X-Partner-API-Key") != Some(PARTNER_KEY) {
        return HttpResponse::Unauthorized().json(json!({ "detail": "Invalid API key" }));
    }
    HttpResponse::Ok().json(json!({
        "id": 7,
        "name": "Acme MSP",
        "email": "msp@acme.test",
        "account_mode": "full",
        "status": "active",
        "created_at": "2025-01-10T09:30:00Z"
    }))
}

async fn client_me(req: HttpRequest, recorder: web::Data<Recorder>) -> HttpResponse {
    recorder.record(&req);
    if header_value(&req, "X-Client-API-Key") != Some(CLIENT_KEY) {
        return HttpResponse::Unauthorized().json(json!({ "detail": "Invalid API key" }));
    }
    HttpResponse::Ok().json(json!({
        "id": "client-demo",
        "name": "Demo Client",
        "contact_email": "demo@client.test",
        "status": "active"
    }))
}

async fn partner_login(
    req: HttpRequest,
    recorder: web::Data<Recorder>,
    body: web::Json<Value>,
) -> HttpResponse {
    recorder.record(&req);
    if body["email"] == PARTNER_EMAIL && body["password"] == PARTNER_PASSWORD {
        HttpResponse::Ok().json(json!({ "access_token": PARTNER_KEY, "token_type": "bearer" }))
    } else {
        HttpResponse::Unauthorized().json(json!({ "detail": "bad credentials" }))
    }
}

async fn slow(req: HttpRequest, recorder: web::Data<Recorder>) -> HttpResponse {
    recorder.record(&req);
    tokio::time::sleep(Duration::from_secs(3)).await;
    HttpResponse::Ok().json(json!({ "late": true }))
}

async fn echo(req: HttpRequest, recorder: web::Data<Recorder>, body: web::Bytes) -> HttpResponse {
    recorder.record(&req);
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    HttpResponse::Ok().json(json!({
        "method": req.method().as_str(),
        "path": req.path(),
        "query": req.query_string(),
        "body": body,
    }))
}

async fn missing(req: HttpRequest, recorder: web::Data<Recorder>) -> HttpResponse {
    recorder.record(&req);
    HttpResponse::NotFound().json(json!({ "detail": "no such asset" }))
}

/// Start the fake orchestrator on an ephemeral port.
pub fn spawn_fake_orchestrator() -> FakeOrchestrator {
    let recorder = web::Data::new(Recorder::default());
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake orchestrator");
    let addr = listener.local_addr().expect("fake orchestrator addr");
    let server_recorder = recorder.clone();
    let server = HttpServer::new(move || {
        actix_web::App::new()
            .app_data(server_recorder.clone())
            .route("/api/partners/me", web::get().to(partner_me))
            .route("/api/clients/me", web::get().to(client_me))
            .route("/api/partners/login", web::post().to(partner_login))
            .route("/api/slow", web::get().to(slow))
            .route("/api/client/assets/404", web::get().to(missing))
            .default_service(web::to(echo))
    })
    .workers(1)
    .listen(listener)
    .expect("listen fake orchestrator")
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    FakeOrchestrator {
        base_url: Url::parse(&format!("http://{addr}")).expect("fake orchestrator url"),
        recorder,
        handle,
    }
}
