use chrono::{DateTime, Utc};
use trainercentral_core::TcError;
use trainercentral_core::auth::{AccessToken, Credentials, TokenGrant};

use crate::util::{parse_response_body, transport_error, vendor_message};

/// Owns the OAuth state of one tenant context.
///
/// Not shared between contexts; callers that need sharing wrap the owning
/// context in a mutex, so every mutation here goes through `&mut self`.
pub struct TokenStore {
    http: reqwest::Client,
    token_endpoint: String,
    credentials: Credentials,
    token: Option<AccessToken>,
    api_domain_hint: Option<String>,
    safety_margin: chrono::Duration,
}

impl TokenStore {
    pub fn new(
        http: reqwest::Client,
        token_endpoint: impl Into<String>,
        credentials: Credentials,
        safety_margin: chrono::Duration,
    ) -> Self {
        Self {
            http,
            token_endpoint: token_endpoint.into(),
            credentials,
            token: None,
            api_domain_hint: None,
            safety_margin,
        }
    }

    /// Inject an access token obtained elsewhere. `None` expiry means the
    /// token is trusted until the vendor rejects it.
    pub fn seed(&mut self, access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let value = access_token.into();
        self.token = Some(match expires_at {
            Some(expires_at) => AccessToken::with_expiry(value, expires_at),
            None => AccessToken::caller_supplied(value),
        });
    }

    pub fn current(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Region-specific API domain reported by the last successful grant.
    pub fn api_domain_hint(&self) -> Option<&str> {
        self.api_domain_hint.as_deref()
    }

    pub fn has_usable_token(&self, now: DateTime<Utc>) -> bool {
        self.token
            .as_ref()
            .is_some_and(|token| token.is_usable(now, self.safety_margin))
    }

    /// Current token if it is outside the safety margin, otherwise exactly
    /// one refresh.
    pub async fn get_valid_token(&mut self) -> Result<String, TcError> {
        if let Some(token) = &self.token {
            if token.is_usable(Utc::now(), self.safety_margin) {
                return Ok(token.value().to_string());
            }
        }
        if !self.credentials.has_refresh_token() {
            return Err(TcError::Auth(
                "No usable access token and no refresh token is configured".to_string(),
            ));
        }
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> Result<String, TcError> {
        let refresh_token = self
            .credentials
            .refresh_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                TcError::Auth(
                    "Missing refresh token; complete the OAuth authorization flow first"
                        .to_string(),
                )
            })?;
        let (client_id, client_secret) = self.client_pair()?;

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let grant = self.request_grant(&form).await?;
        let value = self.apply_grant(grant, Utc::now());
        tracing::info!(
            event = "oauth_token_refreshed",
            grant_type = "refresh_token",
            expires_at = ?self.token.as_ref().and_then(AccessToken::expires_at),
        );
        Ok(value)
    }

    /// Trade a one-time authorization code for an access and refresh token.
    pub async fn exchange_code(
        &mut self,
        code: &str,
        redirect_uri: &str,
        scope: Option<&str>,
    ) -> Result<String, TcError> {
        let (client_id, client_secret) = self.client_pair()?;
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ];
        if let Some(scope) = scope.filter(|s| !s.trim().is_empty()) {
            form.push(("scope", scope));
        }
        let grant = self.request_grant(&form).await?;
        let value = self.apply_grant(grant, Utc::now());
        tracing::info!(
            event = "oauth_code_exchanged",
            grant_type = "authorization_code",
            refresh_token_issued = self.credentials.has_refresh_token(),
        );
        Ok(value)
    }

    /// Called after the vendor answered 401 for the current token.
    pub async fn force_refresh_on_rejection(&mut self) -> Result<String, TcError> {
        if !self.credentials.has_refresh_token() {
            return Err(TcError::Auth(
                "TrainerCentral rejected the access token and no refresh token is available"
                    .to_string(),
            ));
        }
        self.refresh().await
    }

    fn client_pair(&self) -> Result<(String, String), TcError> {
        let pick = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    TcError::Configuration(format!("{name} is not configured"))
                })
        };
        Ok((
            pick(&self.credentials.client_id, "ZOHO_CLIENT_ID")?,
            pick(&self.credentials.client_secret, "ZOHO_CLIENT_SECRET")?,
        ))
    }

    async fn request_grant(&self, form: &[(&str, &str)]) -> Result<TokenGrant, TcError> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| transport_error("the Zoho token endpoint", &e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("the Zoho token endpoint", &e))?;
        let body = parse_response_body(&bytes);

        if !status.is_success() {
            let detail = vendor_message(&body).unwrap_or_else(|| status.to_string());
            tracing::warn!(
                event = "oauth_token_rejected",
                status = status.as_u16(),
                detail = %detail,
            );
            return Err(TcError::Auth(format!(
                "Token endpoint rejected the request: {detail}"
            )));
        }

        let grant: TokenGrant = serde_json::from_value(body).map_err(|e| {
            TcError::Auth(format!("Token endpoint returned an unreadable body: {e}"))
        })?;
        if let Some(error) = grant.error.as_deref() {
            tracing::warn!(event = "oauth_token_rejected", status = status.as_u16(), detail = %error);
            return Err(TcError::Auth(format!(
                "Token endpoint rejected the request: {error}"
            )));
        }
        if grant
            .access_token
            .as_deref()
            .is_none_or(|token| token.trim().is_empty())
        {
            return Err(TcError::Auth(
                "Token endpoint response did not include an access_token".to_string(),
            ));
        }
        Ok(grant)
    }

    fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) -> String {
        let expires_in = grant.expires_in_secs();
        let value = grant.access_token.unwrap_or_default();
        self.token = Some(AccessToken::issued(value.clone(), expires_in, now));
        if let Some(rotated) = grant.refresh_token.filter(|t| !t.trim().is_empty()) {
            self.credentials.refresh_token = Some(rotated);
        }
        if let Some(api_domain) = grant.api_domain.filter(|d| !d.trim().is_empty()) {
            self.api_domain_hint = Some(api_domain.trim_end_matches('/').to_string());
        }
        value
    }
}
