use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use trainercentral_mcp_runtime::util::to_pretty_json;
use trainercentral_mcp_runtime::{McpCommands, RuntimeConfig, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "trainercentral-mcp",
    version,
    about = "TrainerCentral MCP server over stdio"
)]
struct Cli {
    /// Tenant domain, e.g. https://myacademy.trainercentral.in
    #[arg(long, env = "TRAINERCENTRAL_DOMAIN")]
    domain: Option<String>,

    /// Organization (portal) id; discovered via portals.json when omitted
    #[arg(long, env = "TRAINERCENTRAL_ORG_ID")]
    org_id: Option<String>,

    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainercentral_mcp=info,trainercentral_mcp_runtime=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(event = "mcp_config_invalid", kind = err.kind(), error = %err);
            let payload = json!({
                "error": err.kind(),
                "message": err.to_string(),
            });
            eprintln!("{}", to_pretty_json(&payload));
            std::process::exit(1);
        }
    };
    if let Some(domain) = cli.domain.filter(|d| !d.trim().is_empty()) {
        config.domain = Some(domain.trim_end_matches('/').to_string());
    }
    if let Some(org_id) = cli.org_id.filter(|o| !o.trim().is_empty()) {
        config.org_id = Some(org_id);
    }

    tracing::info!(
        event = "mcp_starting",
        version = env!("CARGO_PKG_VERSION"),
        domain_configured = config.domain.is_some(),
        org_id_configured = config.org_id.is_some(),
        context_mode = ?config.context_mode,
    );
    let code = run_mcp(config, cli.command).await;
    std::process::exit(code);
}
