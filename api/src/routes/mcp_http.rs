use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::header::{AUTHORIZATION, HOST, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use trainercentral_mcp_runtime::{
    ContextSource, MCP_PROTOCOL_VERSION, RpcError, error_response, handle_http_jsonrpc,
    is_auth_error_response,
};

use crate::state::{AppState, DEFAULT_RESOURCE_BASE_URL};

const MCP_PATH: &str = "/mcp";
const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(MCP_PATH, get(mcp_get).post(mcp_post))
        .route("/mcp/", get(mcp_get).post(mcp_post))
        .route(PROTECTED_RESOURCE_PATH, get(oauth_protected_resource_metadata))
        .route(
            "/.well-known/oauth-protected-resource/mcp",
            get(oauth_protected_resource_metadata),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth_authorization_server_metadata),
        )
        .route(
            "/.well-known/openid-configuration",
            get(oauth_authorization_server_metadata),
        )
}

async fn mcp_get() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "protocol": "mcp",
        "version": MCP_PROTOCOL_VERSION,
    }))
}

async fn mcp_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!(event = "mcp_parse_error", body_len = body.len(), error = %err);
            return (
                StatusCode::OK,
                Json(error_response(Value::Null, RpcError::parse_error("Parse error"))),
            )
                .into_response();
        }
    };

    let bearer = extract_bearer_token(&headers);
    let context = ContextSource::for_http_request(
        &state.runtime,
        &state.http,
        state.shared_context.as_ref(),
        bearer.as_deref(),
    );
    let responses = handle_http_jsonrpc(context, incoming).await;

    let status = if responses.iter().any(is_auth_error_response) {
        tracing::info!(
            event = "mcp_auth_challenge",
            bearer_present = bearer.is_some(),
            "MCP request needs (re)authorization"
        );
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };

    let mut response = match responses.len() {
        0 => return StatusCode::ACCEPTED.into_response(),
        1 => (
            status,
            Json(responses.into_iter().next().unwrap_or(Value::Null)),
        )
            .into_response(),
        _ => (status, Json(Value::Array(responses))).into_response(),
    };
    if status == StatusCode::UNAUTHORIZED {
        let base = public_base_url(&state, &headers);
        insert_challenge(&mut response, &base);
    }
    response
}

async fn oauth_protected_resource_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
    original_uri: OriginalUri,
) -> Json<Value> {
    let base = public_base_url(&state, &headers);
    log_oauth_discovery_request("protected_resource", &headers, &original_uri, &base);
    Json(json!({
        "resource": base,
        "authorization_servers": [state.runtime.accounts_url],
        "scopes_supported": state.settings.scopes,
        "resource_documentation": format!("{base}/docs"),
    }))
}

async fn oauth_authorization_server_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
    original_uri: OriginalUri,
) -> Json<Value> {
    let base = public_base_url(&state, &headers);
    log_oauth_discovery_request("authorization_server", &headers, &original_uri, &base);
    Json(json!({
        "issuer": state.runtime.accounts_url,
        "authorization_endpoint": state.runtime.authorization_endpoint(),
        "token_endpoint": state.runtime.token_endpoint(),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"],
        "scopes_supported": state.settings.scopes,
    }))
}

fn log_oauth_discovery_request(
    metadata_kind: &'static str,
    headers: &HeaderMap,
    original_uri: &OriginalUri,
    base_url: &str,
) {
    tracing::info!(
        event = "mcp_oauth_discovery_request",
        metadata_kind = metadata_kind,
        path = %original_uri.0.path(),
        base_url = %base_url,
        origin = ?header_value(headers, "origin"),
        user_agent = ?header_value(headers, "user-agent"),
        "MCP OAuth discovery metadata served"
    );
}

/// `None` for a missing header, a non-bearer scheme or an empty token.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn insert_challenge(response: &mut Response, base_url: &str) {
    let challenge = format!("Bearer resource_metadata=\"{base_url}{PROTECTED_RESOURCE_PATH}\"");
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
}

fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    match &state.settings.resource_base_url {
        Some(configured) => configured.clone(),
        None => request_base_url(headers),
    }
}

fn request_base_url(headers: &HeaderMap) -> String {
    let forwarded_proto = first_header_token(headers, "x-forwarded-proto");
    let forwarded_host = first_header_token(headers, "x-forwarded-host");
    let host = forwarded_host.or_else(|| header_value(headers, HOST.as_str()));

    if let Some(host) = host {
        let proto = forwarded_proto.unwrap_or_else(|| {
            if host.contains("localhost") || host.starts_with("127.0.0.1") {
                "http".to_string()
            } else {
                "https".to_string()
            }
        });
        return format!("{}://{}", proto.trim_end_matches(':'), host);
    }

    DEFAULT_RESOURCE_BASE_URL.to_string()
}

fn header_value(headers: &HeaderMap, key: &str) -> Option<String> {
    headers
        .get(key)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

fn first_header_token(headers: &HeaderMap, key: &str) -> Option<String> {
    headers
        .get(key)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
