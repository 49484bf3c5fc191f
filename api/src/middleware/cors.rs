use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

const CONNECTOR_ORIGINS: &[&str] = &[
    "https://chatgpt.com",
    "https://chat.openai.com",
    "https://claude.ai",
];

/// Build a CORS layer from the `TC_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: `http://localhost:8000`), plus
///   the hosted connector origins
/// - Methods: GET, POST, OPTIONS
/// - Headers: Authorization, Content-Type, Mcp-Protocol-Version
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let origins_str = std::env::var("TC_CORS_ORIGINS").ok();
    CorsLayer::new()
        .allow_origin(allowed_origins(origins_str.as_deref()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("mcp-protocol-version"),
        ])
        .expose_headers([HeaderName::from_static("www-authenticate")])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

fn allowed_origins(configured: Option<&str>) -> Vec<HeaderValue> {
    let mut origin_values: Vec<String> = configured
        .unwrap_or("http://localhost:8000")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    for connector_origin in CONNECTOR_ORIGINS {
        if !origin_values
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(connector_origin))
        {
            origin_values.push((*connector_origin).to_string());
        }
    }

    origin_values
        .into_iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect()
}
