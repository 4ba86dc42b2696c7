//! Request dispatch: the call surface every API request funnels through.
//!
//! Two operations with different defaults share one transport call:
//!
//! - [`Dispatch::request`] defaults to an unauthenticated call and performs no
//!   URI length check.
//! - [`Dispatch::do_request`] defaults to an authenticated call and rejects
//!   URIs longer than [`MAX_URI_LEN`] before any network I/O.
//!
//! The split is kept as two operations because the guard only applies to
//! `do_request`; it looks like a historical accident rather than a design
//! decision, but callers rely on it.
//!
//! HTTP error statuses are never turned into errors here: callers get the
//! status and raw text back and interpret them.

use async_trait::async_trait;
use neutron_core::{NeutronError, Result, MAX_URI_LEN};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::fmt;

/// Content type used when the caller sets none
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Header carrying the token on service requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized with `serde_json` before sending
    Json(serde_json::Value),
    /// Sent verbatim
    Text(String),
}

impl RequestBody {
    fn into_text(self) -> Result<String> {
        match self {
            RequestBody::Json(value) => Ok(serde_json::to_string(&value)?),
            RequestBody::Text(text) => Ok(text),
        }
    }
}

/// Per-call options for [`Dispatch`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    /// `None` picks the default of the entry point
    pub authenticated: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a raw text body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            NeutronError::InvalidInput(format!("Invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| NeutronError::InvalidInput(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Override the content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = Some(authenticated);
        self
    }
}

/// Status and raw text of a response; the body is never parsed here
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub text: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Token, endpoint and best-effort identity of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthInfo {
    pub auth_token: Option<String>,
    pub endpoint_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_user_id: Option<String>,
}

/// The dispatch contract shared by the session-backed and the fallback client
#[async_trait]
pub trait Dispatch: Send + Sync + fmt::Debug {
    /// Low-level entry point; unauthenticated unless `options.authenticated` says otherwise
    async fn request(&self, url: &str, method: Method, options: RequestOptions) -> Result<Response>;

    /// Entry point for resource calls; authenticated by default and URI-length guarded
    async fn do_request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<Response>;

    /// Base URL requests are sent to
    async fn endpoint_url(&self) -> Result<String>;

    /// Token, endpoint and identity summary, for display and debugging
    async fn auth_info(&self) -> Result<AuthInfo>;
}

/// Fail when `endpoint` plus `url` exceed [`MAX_URI_LEN`]
pub fn check_uri_length(endpoint: &str, url: &str) -> Result<()> {
    let uri_len = endpoint.len() + url.len();
    if uri_len > MAX_URI_LEN {
        return Err(NeutronError::RequestUriTooLong {
            excess: uri_len - MAX_URI_LEN,
        });
    }
    Ok(())
}

/// Apply content negotiation to the caller's headers
///
/// `Accept` is set to the content type unless present; `Content-Type` too,
/// but only when a non-empty body is sent. Returns the headers and body text.
pub fn negotiate(options: RequestOptions) -> Result<(HeaderMap, Option<String>)> {
    let RequestOptions {
        body,
        mut headers,
        content_type,
        ..
    } = options;

    let content_type = content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let content_type = HeaderValue::from_str(&content_type)
        .map_err(|e| NeutronError::InvalidInput(format!("Invalid content type: {}", e)))?;

    if !headers.contains_key(ACCEPT) {
        headers.insert(ACCEPT, content_type.clone());
    }

    let body = body.map(RequestBody::into_text).transpose()?;
    if body.as_deref().is_some_and(|b| !b.is_empty()) && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, content_type);
    }

    Ok((headers, body))
}

/// Join an endpoint and a relative URL; absolute URLs pass through
pub fn join_url(endpoint: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let endpoint = endpoint.trim_end_matches('/');
    if url.is_empty() {
        endpoint.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", endpoint, url)
    } else {
        format!("{}/{}", endpoint, url)
    }
}

/// Map a transport failure onto the client's error kinds
///
/// Timeouts become [`NeutronError::Timeout`]; failures to connect or to send
/// become [`NeutronError::ConnectionFailed`] with the original error kept as
/// the source.
pub fn translate_error(err: reqwest::Error) -> NeutronError {
    if err.is_timeout() {
        NeutronError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        NeutronError::connection_failed(err)
    } else if err.is_builder() {
        NeutronError::InvalidInput(err.to_string())
    } else {
        NeutronError::Other(err.to_string())
    }
}

/// Send one prepared request and collect `(status, text)`
pub(crate) async fn send(
    http: &reqwest::Client,
    method: Method,
    full_url: &str,
    headers: HeaderMap,
    body: Option<String>,
) -> Result<Response> {
    let mut builder = http.request(method.clone(), full_url).headers(headers);
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(translate_error)?;
    let status = response.status();
    let text = response.text().await.map_err(translate_error)?;
    tracing::debug!("{} {} -> {}", method, full_url, status.as_u16());

    Ok(Response { status, text })
}
