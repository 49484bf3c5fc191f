use std::net::{IpAddr, SocketAddr};

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trainercentral_mcp_runtime::RuntimeConfig;
use trainercentral_mcp_runtime::util::http_client;

mod error;
mod middleware;
mod routes;
mod state;

use error::StartupError;
use state::{AppState, ServerSettings};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trainercentral_api=debug,trainercentral_mcp_runtime=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(err) = serve().await {
        tracing::error!(event = "server_startup_failed", error = %err);
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), StartupError> {
    let runtime = RuntimeConfig::from_env()?;
    let http = http_client(runtime.http_timeout)?;
    let settings = ServerSettings::from_env();
    tracing::info!(
        event = "server_config_loaded",
        context_mode = runtime.context_mode.as_str(),
        accounts_url = %runtime.accounts_url,
        domain = ?runtime.domain,
        org_id = ?runtime.org_id,
        timezone = runtime.timezone.name(),
        resource_base_url = ?settings.resource_base_url,
    );
    let app_state = AppState::new(runtime, http, settings);

    let app = build_app(app_state);

    let addr = listen_addr(|key| std::env::var(key).ok())?;
    tracing::info!("TrainerCentral MCP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}

fn build_app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::mcp_http::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(app_state)
}

/// `METADATA_HOST` (default `0.0.0.0`) and `PORT`, then `METADATA_PORT`
/// (default 8000).
fn listen_addr<F>(lookup: F) -> Result<SocketAddr, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let host = non_empty("METADATA_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let ip: IpAddr = host
        .trim()
        .parse()
        .map_err(|_| StartupError::Address(host.clone()))?;

    let port = match non_empty("PORT").or_else(|| non_empty("METADATA_PORT")) {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| StartupError::Address(format!("{host}:{raw}")))?,
        None => DEFAULT_PORT,
    };
    Ok(SocketAddr::new(ip, port))
}
