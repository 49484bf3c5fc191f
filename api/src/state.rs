use std::sync::Arc;

use tokio::sync::Mutex;
use trainercentral_mcp_runtime::{ContextMode, RuntimeConfig, TenantContext};

pub const DEFAULT_RESOURCE_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_OAUTH_SCOPES: [&str; 6] = [
    "TrainerCentral.courseapi.ALL",
    "TrainerCentral.sessionapi.ALL",
    "TrainerCentral.sectionapi.ALL",
    "TrainerCentral.talkapi.ALL",
    "TrainerCentral.userapi.ALL",
    "TrainerCentral.portalapi.ALL",
];

/// Settings only the HTTP server cares about.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// Public base URL advertised in discovery documents. When unset the
    /// base is derived from the request's forwarded/host headers.
    pub resource_base_url: Option<String>,
    pub scopes: Vec<String>,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let resource_base_url =
            non_empty("RESOURCE_BASE_URL").map(|url| url.trim().trim_end_matches('/').to_string());

        let scopes: Vec<String> = non_empty("TC_OAUTH_SCOPES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .filter(|scopes: &Vec<String>| !scopes.is_empty())
            .unwrap_or_else(|| DEFAULT_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect());

        Self {
            resource_base_url,
            scopes,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            resource_base_url: None,
            scopes: DEFAULT_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeConfig>,
    pub http: reqwest::Client,
    pub settings: Arc<ServerSettings>,
    /// Present only in shared context mode.
    pub shared_context: Option<Arc<Mutex<TenantContext>>>,
}

impl AppState {
    pub fn new(runtime: RuntimeConfig, http: reqwest::Client, settings: ServerSettings) -> Self {
        let shared_context = match runtime.context_mode {
            ContextMode::Shared => {
                tracing::warn!(
                    event = "shared_context_enabled",
                    "TC_CONTEXT_MODE=shared: every caller uses the operator's TrainerCentral credentials; do not expose this server to multiple users"
                );
                Some(Arc::new(Mutex::new(TenantContext::new(&runtime, http.clone()))))
            }
            ContextMode::PerRequest => None,
        };
        Self {
            runtime: Arc::new(runtime),
            http,
            settings: Arc::new(settings),
            shared_context,
        }
    }
}
