use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Upper bound on an advertised lifetime. Anything longer is clamped.
pub const MAX_EXPIRES_IN_SECS: i64 = 7 * 24 * 3600;

/// Long-lived OAuth client credentials.
///
/// The refresh token is the only field the vendor may rotate during the
/// process lifetime.
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Opaque bearer token plus its absolute expiry.
///
/// Never mutated in place: a refresh produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// A token handed to us by a caller; its expiry is unknown until the
    /// vendor rejects it.
    pub fn caller_supplied(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Expiry is `now + expires_in_secs`, with the lifetime clamped to
    /// `1..=MAX_EXPIRES_IN_SECS`.
    pub fn issued(value: impl Into<String>, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        let lifetime = Duration::try_seconds(expires_in_secs.clamp(1, MAX_EXPIRES_IN_SECS))
            .unwrap_or_else(|| Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        let expires_at = now.checked_add_signed(lifetime).unwrap_or(now);
        Self::with_expiry(value, expires_at)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True while `now < expires_at - margin`.
    pub fn is_usable(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at
                .checked_sub_signed(margin)
                .is_some_and(|deadline| now < deadline),
            None => !self.value.is_empty(),
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of a token-endpoint response.
///
/// Zoho answers some rejections with HTTP 200 and an `error` field, so
/// `access_token` is optional here and checked by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub api_domain: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TokenGrant {
    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| secs.min(MAX_EXPIRES_IN_SECS))
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn token_is_unusable_inside_safety_margin() {
        let token = AccessToken::with_expiry("t", at(1_000));
        let margin = Duration::seconds(60);
        assert!(token.is_usable(at(939), margin));
        assert!(!token.is_usable(at(940), margin));
        assert!(!token.is_usable(at(2_000), margin));
    }

    #[test]
    fn issued_token_expires_after_expires_in() {
        let token = AccessToken::issued("t", 3600, at(10));
        assert_eq!(token.expires_at(), Some(at(3610)));
    }

    #[test]
    fn absurd_lifetimes_are_clamped_instead_of_overflowing() {
        let token = AccessToken::issued("t", i64::MAX, at(10));
        assert_eq!(token.expires_at(), Some(at(10 + MAX_EXPIRES_IN_SECS)));

        let token = AccessToken::issued("t", i64::MIN, at(10));
        assert_eq!(token.expires_at(), Some(at(11)));

        let token = AccessToken::issued("t", 3600, DateTime::<Utc>::MAX_UTC);
        assert_eq!(token.expires_at(), Some(DateTime::<Utc>::MAX_UTC));

        let ancient = AccessToken::with_expiry("t", DateTime::<Utc>::MIN_UTC);
        assert!(!ancient.is_usable(at(0), Duration::seconds(60)));

        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","expires_in":9223372036854775807}"#)
                .unwrap();
        assert_eq!(grant.expires_in_secs(), MAX_EXPIRES_IN_SECS);
    }

    #[test]
    fn caller_supplied_token_has_no_known_expiry() {
        let token = AccessToken::caller_supplied("bearer");
        assert!(token.is_usable(at(i64::from(i32::MAX)), Duration::seconds(60)));
        assert!(!AccessToken::caller_supplied("").is_usable(at(0), Duration::zero()));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials {
            client_id: Some("1000.ABC".into()),
            client_secret: Some("very-secret".into()),
            refresh_token: Some("1000.refresh".into()),
        };
        let rendered = format!("{creds:?} {:?}", AccessToken::caller_supplied("abc123"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("1000.refresh"));
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains("1000.ABC"));
    }

    #[test]
    fn grant_defaults_expiry_when_missing() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","api_domain":"https://www.zohoapis.in"}"#)
                .unwrap();
        assert_eq!(grant.expires_in_secs(), DEFAULT_EXPIRES_IN_SECS);
        assert_eq!(grant.api_domain.as_deref(), Some("https://www.zohoapis.in"));
    }
}
