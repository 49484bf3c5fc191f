use serde_json::{Value, json};

/// Failure kinds surfaced by the connector.
///
/// Every variant is caught at the dispatch boundary and turned into a
/// JSON-RPC error envelope; the kind is preserved in `error.data.kind` so an
/// agent can tell "your credentials are bad" apart from "the vendor is down".
#[derive(Debug, Clone, thiserror::Error)]
pub enum TcError {
    /// Domain, organization or credentials still missing after every fallback.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Token exchange or refresh rejected by the vendor.
    #[error("authorization failed: {0}")]
    Auth(String),
    /// Vendor answered with a non-2xx status other than an auth failure.
    #[error("TrainerCentral API returned HTTP {status}: {message}")]
    UpstreamHttp {
        status: u16,
        message: String,
        body: Value,
    },
    /// Network or timeout failure reaching the vendor.
    #[error("transport error: {0}")]
    Transport(String),
    /// Unknown tool or malformed arguments.
    #[error("{message}")]
    Dispatch {
        message: String,
        field: Option<String>,
    },
    /// A vendor response lacked every key an identifier is expected under.
    #[error("unexpected TrainerCentral response: {message}")]
    MalformedResponse { message: String, body: Value },
}

impl TcError {
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TcError::Configuration(_) => kinds::CONFIGURATION,
            TcError::Auth(_) => kinds::AUTH,
            TcError::UpstreamHttp { .. } => kinds::UPSTREAM_HTTP,
            TcError::Transport(_) => kinds::TRANSPORT,
            TcError::Dispatch { .. } => kinds::DISPATCH,
            TcError::MalformedResponse { .. } => kinds::MALFORMED_RESPONSE,
        }
    }

    pub fn rpc_code(&self) -> i64 {
        match self {
            TcError::Configuration(_) => codes::CONFIGURATION_ERROR,
            TcError::Auth(_) => codes::AUTH_ERROR,
            TcError::UpstreamHttp { .. } => codes::UPSTREAM_ERROR,
            TcError::Transport(_) => codes::INTERNAL_ERROR,
            TcError::Dispatch { .. } => codes::INVALID_PARAMS,
            TcError::MalformedResponse { .. } => codes::MALFORMED_RESPONSE,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, TcError::Auth(_))
    }

    /// Structured `error.data` payload for the JSON-RPC envelope.
    pub fn to_data(&self) -> Value {
        let mut data = json!({ "kind": self.kind() });
        match self {
            TcError::UpstreamHttp { status, body, .. } => {
                data["status"] = json!(status);
                if !body.is_null() {
                    data["body"] = body.clone();
                }
            }
            TcError::Dispatch {
                field: Some(field), ..
            } => {
                data["field"] = json!(field);
            }
            TcError::MalformedResponse { body, .. } => {
                data["body"] = body.clone();
            }
            TcError::Auth(_) => {
                data["docs_hint"] = json!(
                    "Re-run the OAuth authorization flow to obtain a fresh TrainerCentral token."
                );
            }
            _ => {}
        }
        data
    }
}

impl From<crate::dates::DateFormatError> for TcError {
    fn from(err: crate::dates::DateFormatError) -> Self {
        TcError::Dispatch {
            message: err.to_string(),
            field: None,
        }
    }
}

/// Values used for `error.data.kind`.
pub mod kinds {
    pub const CONFIGURATION: &str = "configuration_error";
    pub const AUTH: &str = "auth_error";
    pub const UPSTREAM_HTTP: &str = "upstream_http_error";
    pub const TRANSPORT: &str = "transport_error";
    pub const DISPATCH: &str = "dispatch_error";
    pub const MALFORMED_RESPONSE: &str = "malformed_response";
}

/// JSON-RPC error codes used across the connector
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const UPSTREAM_ERROR: i64 = -32000;
    pub const AUTH_ERROR: i64 = -32001;
    pub const CONFIGURATION_ERROR: i64 = -32002;
    pub const MALFORMED_RESPONSE: i64 = -32003;
}
