//! Identity (Keystone v3) wire models
//!
//! Only the parts of the token API the client needs: password and token
//! authentication requests, and the token body with its service catalog.

use crate::types::Interface;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain used when a name-scoped user or project names no domain
pub const DEFAULT_DOMAIN: &str = "Default";

/// Reference to a domain by ID or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainRef {
    Id { id: String },
    Name { name: String },
}

impl DomainRef {
    /// Pick the domain ID when given, the name otherwise, falling back to `Default`
    pub fn from_parts(id: Option<String>, name: Option<String>) -> Self {
        match (id, name) {
            (Some(id), _) => DomainRef::Id { id },
            (None, Some(name)) => DomainRef::Name { name },
            (None, None) => DomainRef::Name {
                name: DEFAULT_DOMAIN.to_string(),
            },
        }
    }
}

/// User identification for password authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id { id: String },
    Name { name: String, domain: DomainRef },
}

/// Project the token is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectScope {
    Id { id: String },
    Name { name: String, domain: DomainRef },
}

/// Body of `POST /v3/auth/tokens`
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    pub auth: AuthBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthBody {
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub project: ProjectScope,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenMethod>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordMethod {
    pub user: PasswordUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordUser {
    #[serde(flatten)]
    pub user: UserRef,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenMethod {
    pub id: String,
}

impl AuthRequest {
    /// Password authentication request
    pub fn password(user: UserRef, password: &str, project: Option<ProjectScope>) -> Self {
        Self {
            auth: AuthBody {
                identity: Identity {
                    methods: vec!["password".to_string()],
                    password: Some(PasswordMethod {
                        user: PasswordUser {
                            user,
                            password: password.to_string(),
                        },
                    }),
                    token: None,
                },
                scope: project.map(|project| Scope { project }),
            },
        }
    }

    /// Token re-scoping request
    pub fn token(token: &str, project: Option<ProjectScope>) -> Self {
        Self {
            auth: AuthBody {
                identity: Identity {
                    methods: vec!["token".to_string()],
                    password: None,
                    token: Some(TokenMethod {
                        id: token.to_string(),
                    }),
                },
                scope: project.map(|project| Scope { project }),
            },
        }
    }
}

/// Body returned by the token API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBody {
    pub expires_at: DateTime<Utc>,
    pub user: NamedRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One service in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: Interface,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    pub url: String,
}

impl CatalogEndpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region.as_deref() == Some(region) || self.region_id.as_deref() == Some(region)
    }
}

/// Catalog lookup filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFilter<'a> {
    pub service_type: &'a str,
    pub service_name: Option<&'a str>,
    pub interface: Interface,
    pub region: Option<&'a str>,
}

/// Find the first catalog URL matching the filters
///
/// A service name filter only applies to catalog entries that carry a name.
pub fn find_endpoint<'c>(
    catalog: &'c [CatalogEntry],
    filter: &EndpointFilter<'_>,
) -> Option<&'c str> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == filter.service_type)
        .filter(|entry| match (filter.service_name, entry.name.as_deref()) {
            (Some(wanted), Some(name)) => wanted == name,
            _ => true,
        })
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|ep| ep.interface == filter.interface)
        .find(|ep| filter.region.map_or(true, |region| ep.in_region(region)))
        .map(|ep| ep.url.as_str())
}
