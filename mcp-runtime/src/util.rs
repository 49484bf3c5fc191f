use std::time::Duration;

use serde_json::Value;
use trainercentral_core::TcError;

/// Shared outbound client; every request inherits the timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, TcError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("trainercentral-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TcError::Configuration(format!("Failed to build HTTP client: {e}")))
}

pub fn transport_error(target: &str, err: &reqwest::Error) -> TcError {
    if err.is_timeout() {
        TcError::Transport(format!("Request to {target} timed out"))
    } else {
        TcError::Transport(format!("Failed to reach {target}: {err}"))
    }
}

pub fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}

/// Human-readable message from a vendor error body, if it carries one.
pub fn vendor_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.get("error").and_then(|e| e.get("message")),
        body.get("error"),
        body.get("error_description"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
