//! In-process stand-in for the Zoho accounts server and the TrainerCentral
//! API. Every request is recorded so tests can assert exact call counts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use trainercentral_core::auth::Credentials;

use crate::config::RuntimeConfig;
use crate::context::TenantContext;
use crate::util::http_client;

pub const ORG_ID: &str = "60001234567";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn form(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

#[derive(Default)]
struct Script {
    routes: HashMap<(String, String), VecDeque<(u16, Value)>>,
    requests: Vec<RecordedRequest>,
}

pub struct FakeVendor {
    pub base_url: String,
    state: Arc<Mutex<Script>>,
}

impl FakeVendor {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(Script::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake vendor");
        let addr = listener.local_addr().expect("fake vendor addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake vendor server");
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Queue a response for `method path`. Queued responses are consumed in
    /// order; the last one keeps answering.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        let mut script = self.state.lock().expect("script lock");
        script
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body));
    }

    /// Resource path under the tenant base URL, e.g. `courses.json`.
    pub fn api_path(relative: &str) -> String {
        format!("/api/v4/{ORG_ID}/{relative}")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().expect("script lock").requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn token_calls(&self) -> usize {
        self.count("POST", "/oauth/v2/token")
    }

    pub fn grant_token(&self, access_token: &str, expires_in: i64) {
        self.respond(
            "POST",
            "/oauth/v2/token",
            200,
            json!({
                "access_token": access_token,
                "expires_in": expires_in,
                "api_domain": "https://www.zohoapis.in",
                "token_type": "Bearer"
            }),
        );
    }

    /// Config with explicit domain and org id pointing at this server.
    pub fn config(&self) -> RuntimeConfig {
        RuntimeConfig {
            credentials: Credentials {
                client_id: Some("1000.client".into()),
                client_secret: Some("client-secret".into()),
                refresh_token: Some("1000.refresh".into()),
            },
            accounts_url: self.base_url.clone(),
            domain: Some(self.base_url.clone()),
            org_id: Some(ORG_ID.to_string()),
            ..RuntimeConfig::default()
        }
    }

    /// Context holding a fresh token, so no refresh happens unless forced.
    pub fn context(&self) -> TenantContext {
        self.context_with(self.config())
    }

    pub fn context_with(&self, config: RuntimeConfig) -> TenantContext {
        let http = http_client(config.http_timeout).expect("http client");
        let mut ctx = TenantContext::new(&config, http);
        ctx.tokens_mut().seed(
            "fresh-token",
            Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        );
        ctx
    }
}

async fn handle(
    State(state): State<Arc<Mutex<Script>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let mut script = state.lock().expect("script lock");
    script.requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });

    let key = (method.to_string(), uri.path().to_string());
    let reply = match script.routes.get_mut(&key) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
    };

    match reply {
        Some((status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if body.is_null() {
                status.into_response()
            } else {
                (status, axum::Json(body)).into_response()
            }
        }
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "message": format!("no scripted response for {method} {}", uri.path())
            })),
        )
            .into_response(),
    }
}
