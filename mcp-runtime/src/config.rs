use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use trainercentral_core::TcError;
use trainercentral_core::auth::Credentials;
use trainercentral_core::dates::parse_timezone;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.in";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

/// How the HTTP server scopes tenant contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    /// A fresh context for every inbound `/mcp` request.
    PerRequest,
    /// One context for the whole process. Single-tenant deployments only.
    Shared,
}

impl ContextMode {
    pub fn parse(raw: &str) -> Result<Self, TcError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "per_request" | "per-request" => Ok(Self::PerRequest),
            "shared" => Ok(Self::Shared),
            other => Err(TcError::Configuration(format!(
                "TC_CONTEXT_MODE must be 'per_request' or 'shared', got '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerRequest => "per_request",
            Self::Shared => "shared",
        }
    }
}

/// Process-wide settings read once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub credentials: Credentials,
    pub access_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub accounts_url: String,
    pub api_domain: Option<String>,
    pub domain: Option<String>,
    pub org_id: Option<String>,
    pub timezone: Tz,
    pub http_timeout: Duration,
    pub token_safety_margin: chrono::Duration,
    pub context_mode: ContextMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            access_token: None,
            access_token_expires_at: None,
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_domain: None,
            domain: None,
            org_id: None,
            timezone: Tz::UTC,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            token_safety_margin: chrono::Duration::seconds(DEFAULT_TOKEN_SAFETY_MARGIN_SECS),
            context_mode: ContextMode::PerRequest,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, TcError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; the first non-empty variable of
    /// each fallback chain wins.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TcError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let access_token_expires_at = match first(&["ACCESS_TOKEN_EXPIRES_AT"]) {
            Some(raw) => parse_epoch_seconds(&raw)?,
            None => None,
        };

        let timezone = match first(&["TC_TIMEZONE"]) {
            Some(raw) => parse_timezone(&raw).map_err(TcError::Configuration)?,
            None => Tz::UTC,
        };

        let http_timeout_secs = match first(&["TC_HTTP_TIMEOUT_SECS"]) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    TcError::Configuration(format!(
                        "TC_HTTP_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let margin_secs = match first(&["TC_TOKEN_SAFETY_MARGIN_SECS"]) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .ok_or_else(|| {
                    TcError::Configuration(format!(
                        "TC_TOKEN_SAFETY_MARGIN_SECS must be a non-negative integer, got '{raw}'"
                    ))
                })?,
            None => DEFAULT_TOKEN_SAFETY_MARGIN_SECS,
        };

        let context_mode = match first(&["TC_CONTEXT_MODE"]) {
            Some(raw) => ContextMode::parse(&raw)?,
            None => ContextMode::PerRequest,
        };

        Ok(Self {
            credentials: Credentials {
                client_id: first(&["ZOHO_CLIENT_ID", "CLIENT_ID"]),
                client_secret: first(&["ZOHO_CLIENT_SECRET", "CLIENT_SECRET"]),
                refresh_token: first(&["ZOHO_REFRESH_TOKEN", "REFRESH_TOKEN"]),
            },
            access_token: first(&["ZOHO_ACCESS_TOKEN", "ACCESS_TOKEN"]),
            access_token_expires_at,
            accounts_url: first(&["ZOHO_ACCOUNTS_URL", "ACCOUNTS_URL"])
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            api_domain: first(&["ZOHO_API_DOMAIN", "API_DOMAIN"])
                .map(|url| url.trim_end_matches('/').to_string()),
            domain: first(&["TRAINERCENTRAL_DOMAIN", "TC_DOMAIN", "DOMAIN"])
                .map(|url| url.trim_end_matches('/').to_string()),
            org_id: first(&["TRAINERCENTRAL_ORG_ID", "TC_ORG_ID", "ORG_ID"]),
            timezone,
            http_timeout: Duration::from_secs(http_timeout_secs),
            token_safety_margin: chrono::Duration::seconds(margin_secs),
            context_mode,
        })
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_url)
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/oauth/v2/auth", self.accounts_url)
    }
}

fn parse_epoch_seconds(raw: &str) -> Result<Option<DateTime<Utc>>, TcError> {
    let secs = raw.parse::<f64>().map_err(|_| {
        TcError::Configuration(format!(
            "ACCESS_TOKEN_EXPIRES_AT must be epoch seconds, got '{raw}'"
        ))
    })?;
    if secs <= 0.0 {
        // Zero is the conventional "already expired" marker.
        return Ok(Some(DateTime::<Utc>::UNIX_EPOCH));
    }
    Ok(DateTime::from_timestamp(secs as i64, 0))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<RuntimeConfig, TcError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.accounts_url, DEFAULT_ACCOUNTS_URL);
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.token_safety_margin, chrono::Duration::seconds(60));
        assert_eq!(config.context_mode, ContextMode::PerRequest);
        assert!(config.domain.is_none());
        assert!(!config.credentials.has_refresh_token());
    }

    #[test]
    fn first_non_empty_variable_in_chain_wins() {
        let config = config_from(&[
            ("ZOHO_CLIENT_ID", "  "),
            ("CLIENT_ID", "1000.fallback"),
            ("TRAINERCENTRAL_ORG_ID", "111"),
            ("ORG_ID", "222"),
            ("TC_DOMAIN", "https://academy.trainercentral.in/"),
        ])
        .unwrap();
        assert_eq!(config.credentials.client_id.as_deref(), Some("1000.fallback"));
        assert_eq!(config.org_id.as_deref(), Some("111"));
        assert_eq!(
            config.domain.as_deref(),
            Some("https://academy.trainercentral.in")
        );
    }

    #[test]
    fn endpoints_derive_from_accounts_url() {
        let config = config_from(&[("ACCOUNTS_URL", "https://accounts.zoho.com/")]).unwrap();
        assert_eq!(
            config.token_endpoint(),
            "https://accounts.zoho.com/oauth/v2/token"
        );
        assert_eq!(
            config.authorization_endpoint(),
            "https://accounts.zoho.com/oauth/v2/auth"
        );
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        for pairs in [
            [("TC_TIMEZONE", "Nowhere/Special")],
            [("TC_HTTP_TIMEOUT_SECS", "0")],
            [("TC_CONTEXT_MODE", "global")],
            [("ACCESS_TOKEN_EXPIRES_AT", "tomorrow")],
        ] {
            let err = config_from(&pairs).unwrap_err();
            assert_eq!(err.kind(), "configuration_error", "{pairs:?}");
        }
    }

    #[test]
    fn seeded_expiry_is_parsed_as_epoch_seconds() {
        let config = config_from(&[
            ("ACCESS_TOKEN", "seed"),
            ("ACCESS_TOKEN_EXPIRES_AT", "1764433800.5"),
            ("TC_CONTEXT_MODE", "shared"),
        ])
        .unwrap();
        assert_eq!(
            config.access_token_expires_at,
            DateTime::from_timestamp(1_764_433_800, 0)
        );
        assert_eq!(config.context_mode, ContextMode::Shared);
    }
}
