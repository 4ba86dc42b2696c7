//! Auth plugins: where a session gets its token and endpoint from.
//!
//! - [`IdentityPlugin`] authenticates against the identity service (v3 token
//!   API) with a password or an existing token, caches the result until it is
//!   about to expire, and resolves endpoints from the service catalog.
//! - [`AdminTokenPlugin`] hands out a static token bound to a fixed endpoint
//!   and never talks to the identity service.
//!
//! Token refresh in [`IdentityPlugin`] is serialized: the cache lock is held
//! across the identity call, so concurrent callers that find the token missing
//! or expired wait for the single in-flight refresh instead of starting their
//! own.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use neutron_core::config::{AuthConfig, Secret};
use neutron_core::identity::{
    find_endpoint, AuthRequest, CatalogEntry, EndpointFilter, ProjectScope, TokenResponse, UserRef,
};
use neutron_core::{api, NeutronError, Result};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::dispatch::translate_error;

/// Header carrying the issued token in identity responses
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Tokens this close to expiry are treated as expired
const STALE_TOKEN_SECS: i64 = 30;

/// Result of an identity authentication
#[derive(Debug, Clone)]
pub struct AccessInfo {
    pub token: Secret,
    pub expires_at: DateTime<Utc>,
    pub project_id: Option<String>,
    pub user_id: String,
    pub catalog: Vec<CatalogEntry>,
}

impl AccessInfo {
    /// Whether the token expires within the staleness window
    pub fn will_expire_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + ChronoDuration::seconds(STALE_TOKEN_SECS)
    }
}

/// Source of tokens and endpoints for a [`crate::session::Session`]
#[async_trait]
pub trait AuthPlugin: Send + Sync + fmt::Debug {
    /// Auth type name, as shown to users
    fn auth_type(&self) -> &'static str;

    /// Current token, authenticating first if needed
    async fn token(&self, http: &Client) -> Result<String>;

    /// Endpoint for the service described by `filter`
    async fn endpoint(&self, http: &Client, filter: &EndpointFilter<'_>) -> Result<String>;

    /// Identity details, when the plugin has any
    async fn access(&self, http: &Client) -> Result<Option<Arc<AccessInfo>>>;

    /// Drop the cached token if it is still `rejected`
    ///
    /// Returns whether a retry can get a different token. A token that was
    /// already replaced by another caller's refresh is left in place.
    async fn invalidate(&self, rejected: &str) -> bool;
}

/// How an [`IdentityPlugin`] proves who it is
#[derive(Clone)]
enum Method {
    Password { user: UserRef, password: Secret },
    Token { token: Secret },
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Password { user, .. } => {
                f.debug_struct("Password").field("user", user).finish()
            }
            Method::Token { .. } => f.write_str("Token"),
        }
    }
}

/// Identity service authentication with token caching
#[derive(Debug)]
pub struct IdentityPlugin {
    tokens_url: String,
    method: Method,
    project: Option<ProjectScope>,
    cached: Mutex<Option<Arc<AccessInfo>>>,
}

/// Build the token API URL from an identity endpoint
///
/// `http://host:5000`, `http://host:5000/v3` and `http://host:5000/v2.0` all
/// map to `http://host:5000/v3/auth/tokens`.
pub fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    let base = base.strip_suffix("/v2.0").unwrap_or(base);
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

impl IdentityPlugin {
    /// Password authentication
    pub fn password(
        auth_url: &str,
        user: UserRef,
        password: Secret,
        project: Option<ProjectScope>,
    ) -> Self {
        Self {
            tokens_url: tokens_url(auth_url),
            method: Method::Password { user, password },
            project,
            cached: Mutex::new(None),
        }
    }

    /// Token authentication
    pub fn with_token(auth_url: &str, token: Secret, project: Option<ProjectScope>) -> Self {
        Self {
            tokens_url: tokens_url(auth_url),
            method: Method::Token { token },
            project,
            cached: Mutex::new(None),
        }
    }

    fn auth_request(&self) -> AuthRequest {
        match &self.method {
            Method::Password { user, password } => {
                AuthRequest::password(user.clone(), password.expose(), self.project.clone())
            }
            Method::Token { token } => AuthRequest::token(token.expose(), self.project.clone()),
        }
    }

    /// Return cached access info, refreshing it when missing or stale
    pub async fn get_access(&self, http: &Client) -> Result<Arc<AccessInfo>> {
        let mut cached = self.cached.lock().await;
        if let Some(access) = cached.as_ref() {
            if !access.will_expire_soon(Utc::now()) {
                return Ok(Arc::clone(access));
            }
            debug!("Cached token is about to expire, re-authenticating");
        }

        let access = Arc::new(self.authenticate(http).await?);
        *cached = Some(Arc::clone(&access));
        Ok(access)
    }

    async fn authenticate(&self, http: &Client) -> Result<AccessInfo> {
        debug!("Authenticating against {}", self.tokens_url);

        let response = http
            .post(&self.tokens_url)
            .json(&self.auth_request())
            .send()
            .await
            .map_err(translate_error)?;

        let status = response.status();
        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(translate_error)?;

        if !status.is_success() {
            let detail = api::error_message(&text).unwrap_or_else(|| status.to_string());
            warn!("Identity service rejected authentication: {}", status);
            return Err(NeutronError::Auth(match status {
                StatusCode::UNAUTHORIZED => format!(
                    "The request you have made requires authentication. ({})",
                    detail
                ),
                _ => format!("HTTP {} from identity service: {}", status.as_u16(), detail),
            }));
        }

        let token = token.ok_or_else(|| {
            NeutronError::Auth(format!("Identity response has no {} header", SUBJECT_TOKEN_HEADER))
        })?;
        let body: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| NeutronError::Auth(format!("Invalid identity response: {}", e)))?;

        Ok(AccessInfo {
            token: Secret::new(token),
            expires_at: body.token.expires_at,
            project_id: body.token.project.map(|p| p.id),
            user_id: body.token.user.id,
            catalog: body.token.catalog,
        })
    }
}

#[async_trait]
impl AuthPlugin for IdentityPlugin {
    fn auth_type(&self) -> &'static str {
        match self.method {
            Method::Password { .. } => "password",
            Method::Token { .. } => "token",
        }
    }

    async fn token(&self, http: &Client) -> Result<String> {
        Ok(self.get_access(http).await?.token.expose().to_string())
    }

    async fn endpoint(&self, http: &Client, filter: &EndpointFilter<'_>) -> Result<String> {
        let access = self.get_access(http).await?;
        find_endpoint(&access.catalog, filter)
            .map(str::to_string)
            .ok_or_else(|| NeutronError::EndpointNotFound {
                service_type: filter.service_type.to_string(),
                interface: filter.interface.to_string(),
                region: filter.region.unwrap_or("any").to_string(),
            })
    }

    async fn access(&self, http: &Client) -> Result<Option<Arc<AccessInfo>>> {
        self.get_access(http).await.map(Some)
    }

    async fn invalidate(&self, rejected: &str) -> bool {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|access| access.token.expose() == rejected) {
            *cached = None;
        }
        true
    }
}

/// Static token bound to a fixed endpoint
#[derive(Debug, Clone)]
pub struct AdminTokenPlugin {
    endpoint: String,
    token: Secret,
}

impl AdminTokenPlugin {
    pub fn new(endpoint: impl Into<String>, token: Secret) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl AuthPlugin for AdminTokenPlugin {
    fn auth_type(&self) -> &'static str {
        "admin_token"
    }

    async fn token(&self, _http: &Client) -> Result<String> {
        Ok(self.token.expose().to_string())
    }

    async fn endpoint(&self, _http: &Client, _filter: &EndpointFilter<'_>) -> Result<String> {
        Ok(self.endpoint.clone())
    }

    async fn access(&self, _http: &Client) -> Result<Option<Arc<AccessInfo>>> {
        Ok(None)
    }

    async fn invalidate(&self, _rejected: &str) -> bool {
        false
    }
}

/// Pick the plugin for an identity-backed configuration
///
/// Returns `None` for the noauth strategy, which has no session.
pub fn plugin_for(auth: &AuthConfig) -> Option<Arc<dyn AuthPlugin>> {
    match auth {
        AuthConfig::Password {
            auth_url,
            user,
            password,
            project,
        } => Some(Arc::new(IdentityPlugin::password(
            auth_url,
            user.clone(),
            password.clone(),
            project.clone(),
        ))),
        AuthConfig::Token {
            auth_url,
            token,
            project,
        } => Some(Arc::new(IdentityPlugin::with_token(auth_url, token.clone(), project.clone()))),
        AuthConfig::AdminToken { endpoint, token } => {
            Some(Arc::new(AdminTokenPlugin::new(endpoint.clone(), token.clone())))
        }
        AuthConfig::NoAuth { .. } => None,
    }
}
