//! Core types shared by the resolver, the session and the CLI

use crate::error::{NeutronError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the API in the service catalog and in version errors
pub const API_NAME: &str = "network";

/// Default catalog service type
pub const DEFAULT_SERVICE_TYPE: &str = "network";

/// Catalog service name assumed for identity-backed clients
pub const DEFAULT_SERVICE_NAME: &str = "neutron";

/// Maximum length of endpoint URL plus relative request URL
pub const MAX_URI_LEN: usize = 8192;

/// Networking API versions this client can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Networking API v2.0
    V2,
}

impl ApiVersion {
    /// URL prefix for resource paths
    pub fn path_prefix(&self) -> &'static str {
        match self {
            ApiVersion::V2 => "/v2.0",
        }
    }
}

/// Accepted version strings, in the order they are reported
pub const API_VERSIONS: [(&str, ApiVersion); 2] = [("2.0", ApiVersion::V2), ("2", ApiVersion::V2)];

/// Resolve a requested API version string
///
/// Fails with [`NeutronError::UnsupportedVersion`] listing the valid keys.
pub fn resolve_api_version(version: &str) -> Result<ApiVersion> {
    API_VERSIONS
        .iter()
        .find(|(key, _)| *key == version)
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            let keys: Vec<&str> = API_VERSIONS.iter().map(|(key, _)| *key).collect();
            NeutronError::UnsupportedVersion(format!(
                "Invalid {} client version '{}'. must be one of: {}",
                API_NAME,
                version,
                keys.join(", ")
            ))
        })
}

/// Strip the legacy `URL` suffix from an endpoint type (`publicURL` -> `public`)
pub fn strip_legacy_suffix(interface: &str) -> &str {
    interface.strip_suffix("URL").unwrap_or(interface)
}

/// Catalog endpoint interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Public => "public",
            Interface::Internal => "internal",
            Interface::Admin => "admin",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = NeutronError;

    fn from_str(s: &str) -> Result<Self> {
        match strip_legacy_suffix(s) {
            "public" => Ok(Interface::Public),
            "internal" => Ok(Interface::Internal),
            "admin" => Ok(Interface::Admin),
            other => Err(NeutronError::Config(format!(
                "Invalid interface '{}'. Must be one of: public, internal, admin",
                other
            ))),
        }
    }
}

/// How the client obtains credentials for the networking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Authenticate through the identity service (or an admin token)
    #[default]
    Keystone,
    /// Talk to a fixed endpoint without identity
    NoAuth,
}

impl FromStr for AuthStrategy {
    type Err = NeutronError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keystone" => Ok(AuthStrategy::Keystone),
            "noauth" => Ok(AuthStrategy::NoAuth),
            other => Err(NeutronError::Config(format!(
                "Invalid auth strategy '{}'. Must be 'keystone' or 'noauth'",
                other
            ))),
        }
    }
}
