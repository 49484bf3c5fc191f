use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{Value, json};
use trainercentral_core::TcError;
use trainercentral_core::auth::Credentials;

use crate::config::RuntimeConfig;
use crate::oauth::TokenStore;
use crate::util::vendor_message;

/// Tenant coordinates plus the token store used to reach them.
///
/// Resolution is lazy: nothing touches the network until `base_url()` is
/// first needed, and only a successful discovery is cached.
pub struct TenantContext {
    pub(crate) http: reqwest::Client,
    tokens: TokenStore,
    api_domain: Option<String>,
    domain: Option<String>,
    org_id: Option<String>,
    timezone: Tz,
}

impl TenantContext {
    /// Context backed by the operator's configured credentials.
    pub fn new(config: &RuntimeConfig, http: reqwest::Client) -> Self {
        let mut tokens = TokenStore::new(
            http.clone(),
            config.token_endpoint(),
            config.credentials.clone(),
            config.token_safety_margin,
        );
        if let Some(seed) = &config.access_token {
            tokens.seed(seed.clone(), config.access_token_expires_at);
        }
        Self {
            http,
            tokens,
            api_domain: config.api_domain.clone(),
            domain: config.domain.clone(),
            org_id: config.org_id.clone(),
            timezone: config.timezone,
        }
    }

    /// Context for a caller that presented its own bearer token.
    ///
    /// The operator's refresh token is withheld so one caller's rejected token
    /// can never be renewed with another principal's credentials.
    pub fn for_bearer(config: &RuntimeConfig, http: reqwest::Client, bearer: &str) -> Self {
        let credentials = Credentials {
            refresh_token: None,
            ..config.credentials.clone()
        };
        let mut tokens = TokenStore::new(
            http.clone(),
            config.token_endpoint(),
            credentials,
            config.token_safety_margin,
        );
        tokens.seed(bearer, None);
        Self {
            http,
            tokens,
            api_domain: config.api_domain.clone(),
            domain: config.domain.clone(),
            org_id: config.org_id.clone(),
            timezone: config.timezone,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenStore {
        &mut self.tokens
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    /// Tenant domain, e.g. `https://www.zohoapis.in/trainercentral`.
    pub async fn domain(&mut self) -> Result<String, TcError> {
        if let Some(domain) = &self.domain {
            return Ok(domain.clone());
        }

        // Only a token grant can tell us the account's region.
        if self.api_domain.is_none() && self.tokens.api_domain_hint().is_none() {
            if self.tokens.credentials().has_refresh_token() {
                self.tokens.refresh().await?;
            } else if !self.tokens.has_usable_token(Utc::now()) {
                self.tokens.get_valid_token().await?;
            }
        }

        let api_domain = self
            .api_domain
            .clone()
            .or_else(|| self.tokens.api_domain_hint().map(str::to_string))
            .ok_or_else(|| {
                TcError::Configuration(
                    "TrainerCentral domain is unknown: set TRAINERCENTRAL_DOMAIN or ZOHO_API_DOMAIN"
                        .to_string(),
                )
            })?;
        let domain = format!("{}/trainercentral", api_domain.trim_end_matches('/'));
        tracing::debug!(event = "tenant_domain_derived", domain = %domain);
        self.domain = Some(domain.clone());
        Ok(domain)
    }

    /// `{domain}/api/v4/{org_id}`, discovering the org id on first use.
    pub async fn base_url(&mut self) -> Result<String, TcError> {
        let domain = self.domain().await?;
        let org_id = match &self.org_id {
            Some(org_id) => org_id.clone(),
            None => self.discover_org_id().await?,
        };
        Ok(format!("{domain}/api/v4/{org_id}"))
    }

    async fn discover_org_id(&mut self) -> Result<String, TcError> {
        let response = self.get_on_domain_raw("portals.json").await?;
        let body = response.body;
        if !(200..=299).contains(&response.status) {
            let detail = vendor_message(&body).unwrap_or_else(|| response.status.to_string());
            return Err(TcError::Configuration(format!(
                "Organization discovery via portals.json failed ({detail}); set TRAINERCENTRAL_ORG_ID"
            )));
        }

        let org_id = first_portal_id(&body).ok_or_else(|| {
            TcError::Configuration(
                "portals.json listed no organizations; set TRAINERCENTRAL_ORG_ID".to_string(),
            )
        })?;
        tracing::info!(event = "tenant_org_discovered", org_id = %org_id);
        self.org_id = Some(org_id.clone());
        Ok(org_id)
    }

    /// Snapshot for diagnostics. Never includes token values.
    pub fn describe(&self) -> Value {
        let token = self.tokens.current();
        json!({
            "domain": self.domain,
            "org_id": self.org_id,
            "timezone": self.timezone.name(),
            "token": {
                "present": token.is_some(),
                "expires_at": token.and_then(|t| t.expires_at()),
                "usable": self.tokens.has_usable_token(Utc::now()),
            },
            "refresh_token_configured": self.tokens.credentials().has_refresh_token(),
        })
    }
}

fn first_portal_id(body: &Value) -> Option<String> {
    let portals = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map.get("portals")?.as_array()?.as_slice(),
        _ => return None,
    };
    match portals.first()?.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
