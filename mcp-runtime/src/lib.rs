//! MCP runtime for TrainerCentral: JSON-RPC handling shared by the stdio
//! binary and the HTTP server, plus the tenant context and tool surface it
//! dispatches into.

mod client;
pub mod config;
pub mod context;
pub mod framing;
pub mod oauth;
pub mod resources;
pub mod tools;
pub mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::Mutex;
use trainercentral_core::TcError;
use trainercentral_core::error::codes;
use uuid::Uuid;

pub use config::{ContextMode, RuntimeConfig};
pub use context::TenantContext;

use crate::framing::{read_frame, write_framed_json};
use crate::tools::{Args as ToolArgs, parse_tool_call, tools_list_payload};
use crate::util::{http_client, to_pretty_json};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "trainercentral-mcp";

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Unknown tool: {name}"),
            data: Some(json!({ "kind": "dispatch_error", "tool": name })),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }
}

impl From<TcError> for RpcError {
    fn from(err: TcError) -> Self {
        Self {
            code: err.rpc_code(),
            message: err.to_string(),
            data: Some(err.to_data()),
        }
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

/// True when a response envelope carries an authorization failure, which the
/// HTTP layer turns into a 401 challenge.
pub fn is_auth_error_response(response: &Value) -> bool {
    response.pointer("/error/code").and_then(Value::as_i64) == Some(codes::AUTH_ERROR)
}

/// Where `tools/call` gets its tenant context from.
pub enum ContextSource {
    /// One context owned by this server (stdio, or one HTTP request).
    Owned(TenantContext),
    /// Single-tenant deployments: one context reused across requests.
    Shared(Arc<Mutex<TenantContext>>),
    /// No caller credentials were presented; tool calls fail with an auth error.
    Unauthenticated,
}

impl ContextSource {
    /// Context for one inbound HTTP request.
    ///
    /// Shared mode always uses the operator context. Per-request mode builds
    /// a fresh context from the caller's bearer token.
    pub fn for_http_request(
        config: &RuntimeConfig,
        http: &reqwest::Client,
        shared: Option<&Arc<Mutex<TenantContext>>>,
        bearer: Option<&str>,
    ) -> Self {
        if let Some(shared) = shared {
            return ContextSource::Shared(shared.clone());
        }
        match bearer.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => {
                ContextSource::Owned(TenantContext::for_bearer(config, http.clone(), token))
            }
            None => ContextSource::Unauthenticated,
        }
    }
}

pub struct McpServer {
    context: ContextSource,
}

impl McpServer {
    pub fn new(context: ContextSource) -> Self {
        Self { context }
    }

    /// Handles one decoded message or batch. Notifications contribute no
    /// response, so the result may be empty.
    pub async fn handle_incoming_message(&mut self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&mut self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let Some(id) = obj.get("id").cloned() else {
            tracing::debug!(event = "mcp_notification", method = %method);
            return None;
        };
        let result = self.handle_request(method, params).await;
        Some(match result {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&mut self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let args: ToolArgs = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            None | Some(Value::Null) => ToolArgs::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call field 'arguments' must be an object",
                ));
            }
        };

        let call = parse_tool_call(name, &args)?.ok_or_else(|| RpcError::unknown_tool(name))?;

        let started = Instant::now();
        let result = match &mut self.context {
            ContextSource::Owned(ctx) => call.execute(ctx).await,
            ContextSource::Shared(shared) => {
                let mut ctx = shared.lock().await;
                call.execute(&mut ctx).await
            }
            ContextSource::Unauthenticated => Err(TcError::Auth(
                "tools/call requires an Authorization: Bearer token".to_string(),
            )),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(payload) => {
                tracing::info!(event = "tool_call", tool = %name, ok = true, elapsed_ms);
                Ok(build_tool_call_response(&payload))
            }
            Err(err) => {
                tracing::warn!(
                    event = "tool_call",
                    tool = %name,
                    ok = false,
                    kind = err.kind(),
                    elapsed_ms,
                    error = %err,
                );
                Err(err.into())
            }
        }
    }

    /// Serves Content-Length framed messages until the reader hits EOF.
    pub async fn serve<R, W>(&mut self, reader: &mut R, writer: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(frame) = read_frame(reader).await? {
            let responses = match serde_json::from_slice::<Value>(&frame) {
                Ok(incoming) => self.handle_incoming_message(incoming).await,
                Err(e) => vec![error_response(
                    Value::Null,
                    RpcError::parse_error(format!("Invalid JSON payload: {e}")),
                )],
            };
            for response in responses {
                write_framed_json(writer, &response).await?;
            }
        }
        Ok(())
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": "Tools manage a TrainerCentral academy: courses, chapters, lessons, assignments, tests and live workshops. Dates use DD-MM-YYYY H:MMAM/PM; tc_convert_date shows the epoch milliseconds the server will send."
    })
}

fn build_tool_call_response(payload: &Value) -> Value {
    json!({
        "content": [{ "type": "text", "text": to_pretty_json(payload) }],
        "structuredContent": payload
    })
}

/// One-shot handling of a decoded HTTP request body.
pub async fn handle_http_jsonrpc(context: ContextSource, incoming: Value) -> Vec<Value> {
    let mut server = McpServer::new(context);
    server.handle_incoming_message(incoming).await
}

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the TrainerCentral MCP server over stdio
    Serve,
    /// Exchange a one-time OAuth authorization code for a refresh token
    ExchangeCode(ExchangeCodeArgs),
    /// Resolve the tenant context and report domain, org id and token freshness
    Diagnose,
}

#[derive(Args, Clone, Debug)]
pub struct ExchangeCodeArgs {
    /// Authorization code from the Zoho consent redirect
    #[arg(long)]
    pub code: String,
    /// Redirect URI registered for the client
    #[arg(long, env = "ZOHO_REDIRECT_URI")]
    pub redirect_uri: String,
    /// Scope string sent with the exchange
    #[arg(long)]
    pub scope: Option<String>,
}

pub async fn run(config: RuntimeConfig, command: McpCommands) -> i32 {
    let http = match http_client(config.http_timeout) {
        Ok(http) => http,
        Err(err) => return report_error(&err),
    };
    match command {
        McpCommands::Serve => {
            let session_id = format!("stdio-{}", Uuid::now_v7());
            tracing::info!(
                event = "mcp_stdio_started",
                session_id = %session_id,
                server = MCP_SERVER_NAME,
                version = env!("CARGO_PKG_VERSION"),
            );
            let mut server = McpServer::new(ContextSource::Owned(TenantContext::new(&config, http)));
            let mut reader = BufReader::new(io::stdin());
            let mut writer = io::stdout();
            match server.serve(&mut reader, &mut writer).await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": format!("stdio transport failed: {err}"),
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::ExchangeCode(args) => {
            let mut ctx = TenantContext::new(&config, http);
            match exchange_code(&mut ctx, &args).await {
                Ok(report) => {
                    println!("{}", to_pretty_json(&report));
                    0
                }
                Err(err) => report_error(&err),
            }
        }
        McpCommands::Diagnose => {
            let mut ctx = TenantContext::new(&config, http);
            let resolved = ctx.base_url().await;
            let mut report = ctx.describe();
            report["context_mode"] = json!(config.context_mode.as_str());
            match resolved {
                Ok(base_url) => {
                    report["status"] = json!("ready");
                    report["base_url"] = json!(base_url);
                    println!("{}", to_pretty_json(&report));
                    0
                }
                Err(err) => {
                    report["status"] = json!("unresolved");
                    report["error"] = json!({ "message": err.to_string(), "data": err.to_data() });
                    println!("{}", to_pretty_json(&report));
                    2
                }
            }
        }
    }
}

async fn exchange_code(ctx: &mut TenantContext, args: &ExchangeCodeArgs) -> Result<Value, TcError> {
    ctx.tokens_mut()
        .exchange_code(&args.code, &args.redirect_uri, args.scope.as_deref())
        .await?;
    let refresh_token = ctx.tokens().credentials().refresh_token.clone();
    let api_domain = ctx.tokens().api_domain_hint().map(str::to_string);
    let domain = ctx.domain().await?;
    ctx.base_url().await?;
    Ok(json!({
        "status": "ok",
        "env": {
            "ZOHO_REFRESH_TOKEN": refresh_token,
            "ZOHO_API_DOMAIN": api_domain,
            "TRAINERCENTRAL_DOMAIN": domain,
            "TRAINERCENTRAL_ORG_ID": ctx.org_id(),
        }
    }))
}

fn report_error(err: &TcError) -> i32 {
    let payload = json!({
        "error": err.kind(),
        "message": err.to_string(),
        "data": err.to_data(),
    });
    eprintln!("{}", to_pretty_json(&payload));
    1
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeVendor, ORG_ID};

    fn request(id: i64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    fn unauthenticated() -> McpServer {
        McpServer::new(ContextSource::Unauthenticated)
    }

    #[tokio::test]
    async fn initialize_reports_protocol_and_server_info() {
        let responses = unauthenticated()
            .handle_incoming_message(request(1, "initialize", json!({})))
            .await;
        let result = &responses[0]["result"];
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "trainercentral-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn tools_list_exposes_the_catalog_without_credentials() {
        let responses = unauthenticated()
            .handle_incoming_message(request(2, "tools/list", Value::Null))
            .await;
        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 34);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn notifications_and_client_responses_get_no_reply() {
        let mut server = unauthenticated();
        assert!(
            server
                .handle_incoming_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .await
                .is_empty()
        );
        assert!(
            server
                .handle_incoming_message(json!({"jsonrpc": "2.0", "id": 9, "result": {}}))
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn batches_answer_requests_only() {
        let responses = unauthenticated()
            .handle_incoming_message(json!([
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "2.0", "id": 2, "method": "nope"}
            ]))
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn malformed_envelopes_are_invalid_requests() {
        let mut server = unauthenticated();
        let empty = server.handle_incoming_message(json!([])).await;
        assert_eq!(empty[0]["error"]["code"], -32600);

        let scalar = server.handle_incoming_message(json!(42)).await;
        assert_eq!(scalar[0]["error"]["code"], -32600);

        let wrong_version = server
            .handle_incoming_message(json!({"jsonrpc": "1.0", "id": 5, "method": "ping"}))
            .await;
        assert_eq!(wrong_version[0]["error"]["code"], -32600);
        assert_eq!(wrong_version[0]["id"], 5);
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_are_distinguished() {
        let mut server = unauthenticated();
        let unknown = server
            .handle_incoming_message(request(1, "tools/call", json!({"name": "tc_nope"})))
            .await;
        assert_eq!(unknown[0]["error"]["code"], -32601);

        let missing = server
            .handle_incoming_message(request(
                2,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": {}}),
            ))
            .await;
        assert_eq!(missing[0]["error"]["code"], -32602);
        assert_eq!(missing[0]["error"]["data"]["field"], "course_id");

        let not_object = server
            .handle_incoming_message(request(
                3,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": [1]}),
            ))
            .await;
        assert_eq!(not_object[0]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn tool_call_without_credentials_is_an_auth_error() {
        let responses = unauthenticated()
            .handle_incoming_message(request(
                1,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": {"course_id": "1"}}),
            ))
            .await;
        assert!(is_auth_error_response(&responses[0]));
        assert_eq!(responses[0]["error"]["data"]["kind"], "auth_error");
    }

    #[tokio::test]
    async fn successful_tool_call_returns_text_and_structured_content() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "GET",
            &FakeVendor::api_path("courses/77.json"),
            200,
            json!({"course": {"courseId": "77", "courseName": "Rust"}}),
        );
        let mut server = McpServer::new(ContextSource::Owned(vendor.context()));

        let responses = server
            .handle_incoming_message(request(
                4,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": {"course_id": 77}}),
            ))
            .await;
        let result = &responses[0]["result"];
        assert_eq!(result["structuredContent"]["course"]["courseName"], "Rust");
        let text = result["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), result["structuredContent"]);
        assert_eq!(
            vendor.requests()[0].authorization.as_deref(),
            Some("Bearer fresh-token")
        );
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status_in_error_data() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "GET",
            &FakeVendor::api_path("courses/404.json"),
            404,
            json!({"message": "Course not found"}),
        );
        let mut server = McpServer::new(ContextSource::Owned(vendor.context()));
        let responses = server
            .handle_incoming_message(request(
                1,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": {"course_id": "404"}}),
            ))
            .await;
        let error = &responses[0]["error"];
        assert_eq!(error["code"], -32000);
        assert_eq!(error["data"]["status"], 404);
        assert!(error["message"].as_str().unwrap().contains("Course not found"));
    }

    #[tokio::test]
    async fn bearer_context_does_not_refresh_with_operator_credentials() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "GET",
            &FakeVendor::api_path("courses/1.json"),
            401,
            json!({"message": "invalid oauth token"}),
        );
        vendor.grant_token("operator-token", 3600);
        let config = vendor.config();
        let http = http_client(config.http_timeout).unwrap();
        let context =
            ContextSource::for_http_request(&config, &http, None, Some("caller-token"));

        let responses = handle_http_jsonrpc(
            context,
            request(
                1,
                "tools/call",
                json!({"name": "tc_get_course", "arguments": {"course_id": "1"}}),
            ),
        )
        .await;
        assert!(is_auth_error_response(&responses[0]));
        assert_eq!(vendor.token_calls(), 0);
        assert_eq!(
            vendor.requests()[0].authorization.as_deref(),
            Some("Bearer caller-token")
        );
    }

    #[tokio::test]
    async fn http_request_without_bearer_is_unauthenticated_unless_shared() {
        let vendor = FakeVendor::start().await;
        let config = vendor.config();
        let http = http_client(config.http_timeout).unwrap();
        assert!(matches!(
            ContextSource::for_http_request(&config, &http, None, Some("  ")),
            ContextSource::Unauthenticated
        ));

        let shared = Arc::new(Mutex::new(vendor.context()));
        assert!(matches!(
            ContextSource::for_http_request(&config, &http, Some(&shared), None),
            ContextSource::Shared(_)
        ));
    }

    #[tokio::test]
    async fn shared_context_discovers_org_once_across_requests() {
        let vendor = FakeVendor::start().await;
        vendor.respond("GET", "/portals.json", 200, json!({"portals": [{"id": ORG_ID}]}));
        vendor.respond(
            "GET",
            &FakeVendor::api_path("courses.json"),
            200,
            json!({"courses": []}),
        );
        let mut config = vendor.config();
        config.org_id = None;
        let shared = Arc::new(Mutex::new(vendor.context_with(config)));

        for id in 0..2 {
            let responses = handle_http_jsonrpc(
                ContextSource::Shared(shared.clone()),
                request(id, "tools/call", json!({"name": "tc_list_courses"})),
            )
            .await;
            assert!(responses[0].get("result").is_some(), "{}", responses[0]);
        }
        assert_eq!(vendor.count("GET", "/portals.json"), 1);
        assert_eq!(vendor.count("GET", &FakeVendor::api_path("courses.json")), 2);
    }

    #[tokio::test]
    async fn stdio_loop_answers_parse_errors_and_keeps_going() {
        let frame = |body: &str| format!("Content-Length: {}\r\n\r\n{body}", body.len());
        let input = format!(
            "{}{}",
            frame("{not json"),
            frame(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#)
        );
        let mut reader = BufReader::new(input.as_bytes());
        let mut output = Vec::new();

        unauthenticated().serve(&mut reader, &mut output).await.unwrap();

        let mut replies = BufReader::new(output.as_slice());
        let first = read_frame(&mut replies).await.unwrap().unwrap();
        let first: Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(first["error"]["code"], -32700);
        let second = read_frame(&mut replies).await.unwrap().unwrap();
        let second: Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(second["id"], 7);
        assert_eq!(second["result"], json!({}));
    }
}
