//! Resolution of [`ClientParams`] into an immutable [`Configuration`]

use super::params::ClientParams;
use crate::error::{NeutronError, Result};
use crate::identity::{DomainRef, ProjectScope, UserRef};
use crate::types::{
    resolve_api_version, ApiVersion, AuthStrategy, Interface, DEFAULT_SERVICE_NAME,
    DEFAULT_SERVICE_TYPE,
};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default API version when none is requested
pub const DEFAULT_API_VERSION: &str = "2.0";

/// Default user agent sent with every request
pub fn default_user_agent() -> String {
    format!("neutronctl/{}", env!("CARGO_PKG_VERSION"))
}

/// A credential that must not show up in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The single auth strategy active for a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Identity password authentication
    Password {
        auth_url: String,
        user: UserRef,
        password: Secret,
        project: Option<ProjectScope>,
    },
    /// Identity token authentication (re-scoping an existing token)
    Token {
        auth_url: String,
        token: Secret,
        project: Option<ProjectScope>,
    },
    /// Static pre-issued token bound to a fixed endpoint
    AdminToken { endpoint: String, token: Secret },
    /// No identity at all; optional static token
    NoAuth {
        endpoint: String,
        token: Option<Secret>,
    },
}

impl AuthConfig {
    /// Auth type name, as shown to users
    pub fn auth_type(&self) -> &'static str {
        match self {
            AuthConfig::Password { .. } => "password",
            AuthConfig::Token { .. } => "token",
            AuthConfig::AdminToken { .. } => "admin_token",
            AuthConfig::NoAuth { .. } => "noauth",
        }
    }

    pub fn strategy(&self) -> AuthStrategy {
        match self {
            AuthConfig::NoAuth { .. } => AuthStrategy::NoAuth,
            _ => AuthStrategy::Keystone,
        }
    }
}

/// TLS settings for the HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Verify server certificates
    pub verify: bool,
    /// Extra CA bundle to trust
    pub ca_cert: Option<PathBuf>,
    /// Client certificate (PEM); may also hold the private key
    pub cert: Option<PathBuf>,
    /// Client private key (PEM), when kept apart from the certificate
    pub key: Option<PathBuf>,
}

/// Fully resolved, immutable client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub auth: AuthConfig,
    pub api_version: ApiVersion,
    pub interface: Interface,
    pub service_type: String,
    pub service_name: Option<String>,
    pub region_name: Option<String>,
    pub tls: TlsConfig,
    /// Per-request timeout; `None` blocks indefinitely
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Configuration {
    /// Resolve construction parameters into a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API version is not `2.0` or `2`
    /// - The interface or auth strategy is unknown
    /// - The chosen strategy lacks its required parameters
    pub fn resolve(params: ClientParams) -> Result<Self> {
        let api_version =
            resolve_api_version(params.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION))?;

        let verify = params.verify.unwrap_or(!params.insecure.unwrap_or(false));
        let cert = params.cert.clone().or_else(|| params.ca_cert.clone());

        let interface: Interface = params
            .interface
            .as_deref()
            .or(params.endpoint_type.as_deref())
            .map(str::parse::<Interface>)
            .transpose()?
            .unwrap_or_default();

        let strategy: AuthStrategy = params
            .auth_strategy
            .as_deref()
            .map(str::parse::<AuthStrategy>)
            .transpose()?
            .unwrap_or_default();

        let timeout = match params.timeout {
            Some(0) => {
                return Err(NeutronError::Config(
                    "Timeout must be greater than 0".to_string(),
                ))
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let auth = resolve_auth(&params, strategy)?;

        Ok(Configuration {
            auth,
            api_version,
            interface,
            service_type: params
                .service_type
                .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()),
            service_name: params.service_name.or_else(|| {
                (strategy == AuthStrategy::Keystone).then(|| DEFAULT_SERVICE_NAME.to_string())
            }),
            region_name: params.region_name,
            tls: TlsConfig {
                verify,
                ca_cert: params.ca_cert,
                cert,
                key: params.key,
            },
            timeout,
            user_agent: params.user_agent.unwrap_or_else(default_user_agent),
        })
    }
}

fn resolve_auth(params: &ClientParams, strategy: AuthStrategy) -> Result<AuthConfig> {
    if strategy == AuthStrategy::NoAuth {
        let endpoint = params.endpoint_url.clone().ok_or_else(|| {
            NeutronError::Config("An endpoint URL is required with the noauth strategy".to_string())
        })?;
        return Ok(AuthConfig::NoAuth {
            endpoint,
            token: params.token.clone().map(Secret::new),
        });
    }

    // A token paired with an endpoint bypasses identity entirely.
    if let (Some(token), Some(endpoint)) = (&params.token, &params.endpoint_url) {
        return Ok(AuthConfig::AdminToken {
            endpoint: endpoint.clone(),
            token: Secret::new(token.clone()),
        });
    }

    let auth_url = params.auth_url.clone().ok_or_else(|| {
        NeutronError::Config(
            "You must provide an auth url via either --os-auth-url or env[OS_AUTH_URL]"
                .to_string(),
        )
    })?;
    let project = project_scope(params);

    if let Some(password) = &params.password {
        let user = match (&params.user_id, &params.username) {
            (Some(id), _) => UserRef::Id { id: id.clone() },
            (None, Some(name)) => UserRef::Name {
                name: name.clone(),
                domain: DomainRef::from_parts(
                    params.user_domain_id.clone(),
                    params.user_domain_name.clone(),
                ),
            },
            (None, None) => {
                return Err(NeutronError::Config(
                    "You must provide a username or user ID via --os-username, env[OS_USERNAME] \
                     or --os-user-id, env[OS_USER_ID]"
                        .to_string(),
                ))
            }
        };
        return Ok(AuthConfig::Password {
            auth_url,
            user,
            password: Secret::new(password.clone()),
            project,
        });
    }

    if let Some(token) = &params.token {
        return Ok(AuthConfig::Token {
            auth_url,
            token: Secret::new(token.clone()),
            project,
        });
    }

    Err(NeutronError::Config(
        "You must provide a password via --os-password or env[OS_PASSWORD], \
         or a token via --os-token or env[OS_TOKEN]"
            .to_string(),
    ))
}

fn project_scope(params: &ClientParams) -> Option<ProjectScope> {
    match (&params.project_id, &params.project_name) {
        (Some(id), _) => Some(ProjectScope::Id { id: id.clone() }),
        (None, Some(name)) => Some(ProjectScope::Name {
            name: name.clone(),
            domain: DomainRef::from_parts(
                params.project_domain_id.clone(),
                params.project_domain_name.clone(),
            ),
        }),
        (None, None) => None,
    }
}
