use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::Value;
use trainercentral_core::TcError;

use crate::context::TenantContext;
use crate::util::{parse_response_body, transport_error, vendor_message};

pub(crate) struct VendorResponse {
    pub(crate) status: u16,
    pub(crate) body: Value,
}

impl VendorResponse {
    fn into_result(self) -> Result<Value, TcError> {
        if (200..=299).contains(&self.status) {
            return Ok(self.body);
        }
        let message = vendor_message(&self.body).unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        });
        Err(TcError::UpstreamHttp {
            status: self.status,
            message,
            body: self.body,
        })
    }
}

impl TenantContext {
    /// JSON request to a path relative to the tenant base URL.
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TcError> {
        self.send_with_query(method, path, &[], body).await
    }

    pub async fn send_with_query(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, TcError> {
        let base = self.base_url().await?;
        let url = build_url(&base, path, query)?;
        self.execute(&url, |http| {
            let request = http.request(method.clone(), url.clone());
            Ok(match &body {
                Some(body) => request.json(body),
                None => request,
            })
        })
        .await
    }

    /// GET a path relative to the tenant domain, e.g. a `links.*` value
    /// returned by the vendor.
    pub async fn get_on_domain(&mut self, path: &str) -> Result<Value, TcError> {
        let domain = self.domain().await?;
        let url = build_url(&domain, path, &[])?;
        self.execute(&url, |http| Ok(http.get(url.clone()))).await
    }

    /// Like `get_on_domain` but hands back any non-401 status for the caller
    /// to interpret.
    pub(crate) async fn get_on_domain_raw(
        &mut self,
        path: &str,
    ) -> Result<VendorResponse, TcError> {
        let domain = self.domain().await?;
        let url = build_url(&domain, path, &[])?;
        self.execute_with_retry(&url, |http| Ok(http.get(url.clone())))
            .await
    }

    /// Multipart POST. The form is rebuilt for the retry since a sent form
    /// cannot be replayed.
    pub async fn send_multipart<F>(&mut self, path: &str, build_form: F) -> Result<Value, TcError>
    where
        F: Fn() -> Result<Form, TcError>,
    {
        let base = self.base_url().await?;
        let url = build_url(&base, path, &[])?;
        self.execute(&url, |http| Ok(http.post(url.clone()).multipart(build_form()?)))
            .await
    }

    async fn execute<B>(&mut self, url: &url::Url, build: B) -> Result<Value, TcError>
    where
        B: Fn(&reqwest::Client) -> Result<reqwest::RequestBuilder, TcError>,
    {
        self.execute_with_retry(url, build).await?.into_result()
    }

    /// Sends with the current token; on 401 refreshes and retries exactly once.
    /// A second 401 is an auth error.
    async fn execute_with_retry<B>(
        &mut self,
        url: &url::Url,
        build: B,
    ) -> Result<VendorResponse, TcError>
    where
        B: Fn(&reqwest::Client) -> Result<reqwest::RequestBuilder, TcError>,
    {
        let token = self.tokens_mut().get_valid_token().await?;
        let first = self.dispatch(build(&self.http)?, &token, url).await?;
        if first.status != 401 {
            return Ok(first);
        }

        tracing::warn!(
            event = "vendor_token_rejected",
            path = url.path(),
            retry = true,
        );
        let token = self.tokens_mut().force_refresh_on_rejection().await?;
        let retry = self.dispatch(build(&self.http)?, &token, url).await?;
        if retry.status == 401 {
            return Err(TcError::Auth(
                "TrainerCentral rejected a freshly refreshed access token".to_string(),
            ));
        }
        Ok(retry)
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
        url: &url::Url,
    ) -> Result<VendorResponse, TcError> {
        let started = std::time::Instant::now();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(url.path(), &e))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(url.path(), &e))?;
        tracing::debug!(
            event = "vendor_request",
            path = url.path(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
        );
        Ok(VendorResponse {
            status,
            body: parse_response_body(&bytes),
        })
    }
}

fn build_url(base: &str, path: &str, query: &[(&str, String)]) -> Result<url::Url, TcError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = url::Url::parse(&joined)
        .map_err(|e| TcError::Configuration(format!("Invalid TrainerCentral URL '{joined}': {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
