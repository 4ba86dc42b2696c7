//! Authenticated session and the session-backed dispatcher.

use async_trait::async_trait;
use neutron_core::config::{Configuration, TlsConfig};
use neutron_core::identity::EndpointFilter;
use neutron_core::{Interface, NeutronError, Result};
use reqwest::header::HeaderValue;
use reqwest::{Client, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::{plugin_for, AuthPlugin};
use crate::dispatch::{
    check_uri_length, join_url, negotiate, send, AuthInfo, Dispatch, RequestOptions, Response,
    AUTH_TOKEN_HEADER,
};

/// Build the HTTP client shared by sessions and the fallback client
///
/// # Errors
///
/// Returns an error if a CA bundle or client certificate cannot be read or
/// parsed, or if the client cannot be created.
pub fn build_http_client(
    tls: &TlsConfig,
    timeout: Option<Duration>,
    user_agent: &str,
) -> Result<Client> {
    let mut builder = Client::builder().user_agent(user_agent);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    if !tls.verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(ca_cert) = &tls.ca_cert {
        let pem = std::fs::read(ca_cert)?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            NeutronError::Config(format!("Invalid CA certificate {}: {}", ca_cert.display(), e))
        })?;
        builder = builder.add_root_certificate(cert);
    }

    if let Some(cert) = &tls.cert {
        let mut pem = std::fs::read(cert)?;
        if let Some(key) = &tls.key {
            pem.push(b'\n');
            pem.extend(std::fs::read(key)?);
        }

        if contains_private_key(&pem) {
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                NeutronError::Config(format!(
                    "Invalid client certificate {}: {}",
                    cert.display(),
                    e
                ))
            })?;
            builder = builder.identity(identity);
        } else if tls.ca_cert.as_ref() != Some(cert) {
            return Err(NeutronError::Config(format!(
                "Client certificate {} has no private key; pass one with --os-key",
                cert.display()
            )));
        }
        // a certificate defaulted from the CA bundle is only a trust anchor
    }

    builder
        .build()
        .map_err(|e| NeutronError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn contains_private_key(pem: &[u8]) -> bool {
    pem.windows(b"PRIVATE KEY-----".len())
        .any(|w| w == b"PRIVATE KEY-----")
}

/// Catalog filters owned by a session
#[derive(Debug, Clone)]
struct ServiceFilter {
    service_type: String,
    service_name: Option<String>,
    interface: Interface,
    region: Option<String>,
}

impl ServiceFilter {
    fn as_filter(&self) -> EndpointFilter<'_> {
        EndpointFilter {
            service_type: &self.service_type,
            service_name: self.service_name.as_deref(),
            interface: self.interface,
            region: self.region.as_deref(),
        }
    }
}

/// Lazily-authenticating handle bound to one auth plugin
///
/// Nothing is sent until a token or endpoint is first needed. The session is
/// shared read-only; the auth plugin owns the only mutable state (its token
/// cache).
#[derive(Debug)]
pub struct Session {
    http: Client,
    auth: Arc<dyn AuthPlugin>,
    filter: ServiceFilter,
}

impl Session {
    /// Build a session for an identity-backed configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration uses the noauth strategy, or if
    /// the HTTP client cannot be built from the TLS settings.
    pub fn build(config: &Configuration) -> Result<Self> {
        let auth = plugin_for(&config.auth).ok_or_else(|| {
            NeutronError::Config("The noauth strategy has no authenticated session".to_string())
        })?;
        let http = build_http_client(&config.tls, config.timeout, &config.user_agent)?;
        Ok(Self::with_plugin(http, auth, config))
    }

    /// Build a session around an existing HTTP client and plugin
    pub fn with_plugin(http: Client, auth: Arc<dyn AuthPlugin>, config: &Configuration) -> Self {
        debug!(
            "Session uses {} auth for service '{}' ({})",
            auth.auth_type(),
            config.service_type,
            config.interface
        );
        Self {
            http,
            auth,
            filter: ServiceFilter {
                service_type: config.service_type.clone(),
                service_name: config.service_name.clone(),
                interface: config.interface,
                region: config.region_name.clone(),
            },
        }
    }

    pub fn auth_plugin(&self) -> &Arc<dyn AuthPlugin> {
        &self.auth
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Current token; authenticates on first use
    pub async fn token(&self) -> Result<String> {
        self.auth.token(&self.http).await
    }

    /// Endpoint of the target service, resolved on every call
    pub async fn endpoint(&self) -> Result<String> {
        self.auth.endpoint(&self.http, &self.filter.as_filter()).await
    }

    /// Project and user ID, when the plugin knows them
    pub async fn identity(&self) -> Result<(Option<String>, Option<String>)> {
        Ok(match self.auth.access(&self.http).await? {
            Some(access) => (access.project_id.clone(), Some(access.user_id.clone())),
            None => (None, None),
        })
    }

    /// Drop the cached token if it is still `rejected`; `false` when no other token can be had
    pub async fn invalidate(&self, rejected: &str) -> bool {
        self.auth.invalidate(rejected).await
    }
}

/// Dispatcher backed by a [`Session`]
#[derive(Debug, Clone)]
pub struct SessionClient {
    session: Arc<Session>,
}

impl SessionClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    async fn send_once(
        &self,
        url: &str,
        method: &Method,
        options: &RequestOptions,
        authenticated: bool,
    ) -> Result<(Response, Option<String>)> {
        let (mut headers, body) = negotiate(options.clone())?;
        let token = if authenticated {
            let token = self.session.token().await?;
            let value = HeaderValue::from_str(&token)
                .map_err(|e| NeutronError::Auth(format!("Unusable token: {}", e)))?;
            headers.insert(AUTH_TOKEN_HEADER, value);
            Some(token)
        } else {
            None
        };

        let full_url = join_url(&self.session.endpoint().await?, url);
        let response = send(self.session.http(), method.clone(), &full_url, headers, body).await?;
        Ok((response, token))
    }
}

#[async_trait]
impl Dispatch for SessionClient {
    async fn request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<Response> {
        let authenticated = options.authenticated.unwrap_or(false);
        let (response, token) = self.send_once(url, &method, &options, authenticated).await?;

        // One re-authentication for a token the service no longer accepts
        if let (StatusCode::UNAUTHORIZED, Some(rejected)) = (response.status, token) {
            if self.session.invalidate(&rejected).await {
                debug!("Service rejected the token, re-authenticating once");
                let (response, _) = self.send_once(url, &method, &options, true).await?;
                return Ok(response);
            }
        }

        Ok(response)
    }

    async fn do_request(
        &self,
        url: &str,
        method: Method,
        mut options: RequestOptions,
    ) -> Result<Response> {
        options.authenticated.get_or_insert(true);
        check_uri_length(&self.session.endpoint().await?, url)?;
        self.request(url, method, options).await
    }

    async fn endpoint_url(&self) -> Result<String> {
        self.session.endpoint().await
    }

    async fn auth_info(&self) -> Result<AuthInfo> {
        let auth_token = self.session.token().await?;
        let endpoint_url = self.session.endpoint().await?;
        let (auth_tenant_id, auth_user_id) = self.session.identity().await?;

        Ok(AuthInfo {
            auth_token: Some(auth_token),
            endpoint_url,
            auth_tenant_id,
            auth_user_id,
        })
    }
}
