//! Fallback dispatcher for deployments without an identity service.

use async_trait::async_trait;
use neutron_core::config::{AuthConfig, Configuration, Secret};
use neutron_core::{NeutronError, Result};
use reqwest::header::HeaderValue;
use reqwest::{Client, Method};
use std::sync::Arc;
use tracing::debug;

use crate::dispatch::{
    check_uri_length, join_url, negotiate, send, AuthInfo, Dispatch, RequestOptions, Response,
    AUTH_TOKEN_HEADER,
};
use crate::session::{build_http_client, Session, SessionClient};

/// Dispatcher with a fixed endpoint and an optional static token
///
/// The token, when configured, is attached to every request regardless of
/// the `authenticated` option, and a rejected token is not retried.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    endpoint: String,
    token: Option<Secret>,
}

impl HttpClient {
    /// Build the fallback client for a noauth configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration uses another auth strategy, or
    /// if the HTTP client cannot be built from the TLS settings.
    pub fn new(config: &Configuration) -> Result<Self> {
        let AuthConfig::NoAuth { endpoint, token } = &config.auth else {
            return Err(NeutronError::Config(format!(
                "The fallback client only serves the noauth strategy, not {}",
                config.auth.auth_type()
            )));
        };

        let http = build_http_client(&config.tls, config.timeout, &config.user_agent)?;
        Ok(Self {
            http,
            endpoint: endpoint.clone(),
            token: token.clone(),
        })
    }
}

#[async_trait]
impl Dispatch for HttpClient {
    async fn request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<Response> {
        let (mut headers, body) = negotiate(options)?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(token.expose())
                .map_err(|e| NeutronError::Config(format!("Unusable token: {}", e)))?;
            headers.insert(AUTH_TOKEN_HEADER, value);
        }

        let full_url = join_url(&self.endpoint, url);
        send(&self.http, method, &full_url, headers, body).await
    }

    async fn do_request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<Response> {
        check_uri_length(&self.endpoint, url)?;
        self.request(url, method, options).await
    }

    async fn endpoint_url(&self) -> Result<String> {
        Ok(self.endpoint.clone())
    }

    async fn auth_info(&self) -> Result<AuthInfo> {
        Ok(AuthInfo {
            auth_token: self.token.as_ref().map(|t| t.expose().to_string()),
            endpoint_url: self.endpoint.clone(),
            auth_tenant_id: None,
            auth_user_id: None,
        })
    }
}

/// Pick the dispatcher for a configuration
///
/// Identity-backed strategies get a [`SessionClient`]; noauth gets the
/// fallback [`HttpClient`]. No request is sent here.
pub fn construct_http_client(config: &Configuration) -> Result<Arc<dyn Dispatch>> {
    match config.auth {
        AuthConfig::NoAuth { .. } => {
            debug!("Using the fallback HTTP client");
            Ok(Arc::new(HttpClient::new(config)?))
        }
        _ => {
            let session = Session::build(config)?;
            Ok(Arc::new(SessionClient::new(Arc::new(session))))
        }
    }
}
