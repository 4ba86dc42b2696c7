//! Named construction parameters
//!
//! Every field is optional: `None` means "not supplied" and never overrides a
//! value that was supplied elsewhere.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw client construction parameters, as given on the command line, in the
/// environment, or in a cloud profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientParams {
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "tenant_name")]
    pub project_name: Option<String>,
    #[serde(alias = "tenant_id")]
    pub project_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub auth_url: Option<String>,
    pub region_name: Option<String>,
    pub token: Option<String>,
    pub endpoint_url: Option<String>,
    pub insecure: Option<bool>,
    pub verify: Option<bool>,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub interface: Option<String>,
    pub endpoint_type: Option<String>,
    pub service_type: Option<String>,
    pub service_name: Option<String>,
    pub auth_strategy: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
    pub api_version: Option<String>,
    pub user_agent: Option<String>,
    /// Named cloud profile to fill unset values from
    pub cloud: Option<String>,
}

impl ClientParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every unset field from `fallback`
    ///
    /// Values already set on `self` always win.
    pub fn or(self, fallback: ClientParams) -> ClientParams {
        ClientParams {
            username: self.username.or(fallback.username),
            user_id: self.user_id.or(fallback.user_id),
            password: self.password.or(fallback.password),
            project_name: self.project_name.or(fallback.project_name),
            project_id: self.project_id.or(fallback.project_id),
            user_domain_name: self.user_domain_name.or(fallback.user_domain_name),
            user_domain_id: self.user_domain_id.or(fallback.user_domain_id),
            project_domain_name: self.project_domain_name.or(fallback.project_domain_name),
            project_domain_id: self.project_domain_id.or(fallback.project_domain_id),
            auth_url: self.auth_url.or(fallback.auth_url),
            region_name: self.region_name.or(fallback.region_name),
            token: self.token.or(fallback.token),
            endpoint_url: self.endpoint_url.or(fallback.endpoint_url),
            insecure: self.insecure.or(fallback.insecure),
            verify: self.verify.or(fallback.verify),
            ca_cert: self.ca_cert.or(fallback.ca_cert),
            cert: self.cert.or(fallback.cert),
            key: self.key.or(fallback.key),
            interface: self.interface.or(fallback.interface),
            endpoint_type: self.endpoint_type.or(fallback.endpoint_type),
            service_type: self.service_type.or(fallback.service_type),
            service_name: self.service_name.or(fallback.service_name),
            auth_strategy: self.auth_strategy.or(fallback.auth_strategy),
            timeout: self.timeout.or(fallback.timeout),
            api_version: self.api_version.or(fallback.api_version),
            user_agent: self.user_agent.or(fallback.user_agent),
            cloud: self.cloud.or(fallback.cloud),
        }
    }
}
