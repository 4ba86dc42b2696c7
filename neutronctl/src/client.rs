//! Resource client for the Neutron networking API.

use neutron_core::packet_filter::{
    self, CreatePacketFilter, PacketFilter, PacketFilterRequest, UpdatePacketFilter,
};
use neutron_core::{api, ApiErrorKind, Configuration, NeutronError, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::dispatch::{AuthInfo, Dispatch, RequestOptions, Response};
use crate::http_client::construct_http_client;

/// Encode `(key, value)` pairs as a query string, without the leading `?`
pub fn encode_query(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Client for the networking API's resource endpoints.
///
/// Wraps a [`Dispatch`] implementation and adds the version prefix, resource
/// wrapping and error interpretation:
/// - Single resources are sent and received as `{"<resource>": {...}}`
/// - Collections are received as `{"<resources>": [...]}`
/// - Non-2xx statuses become [`NeutronError::Api`] carrying the service's message
///
/// # Examples
///
/// ```no_run
/// use neutronctl::client::NeutronClient;
/// use neutron_core::{ClientParams, Configuration};
///
/// # async fn example() -> neutron_core::Result<()> {
/// let config = Configuration::resolve(ClientParams {
///     token: Some("admin-token".to_string()),
///     endpoint_url: Some("http://neutron:9696".to_string()),
///     ..Default::default()
/// })?;
///
/// let client = NeutronClient::from_config(&config)?;
/// for filter in client.list_packet_filters(&[]).await? {
///     println!("{} {}", filter.id, filter.summary());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NeutronClient {
    dispatch: Arc<dyn Dispatch>,
    prefix: &'static str,
}

impl NeutronClient {
    /// Wrap a dispatcher for API v2.0
    pub fn new(dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            dispatch,
            prefix: neutron_core::ApiVersion::V2.path_prefix(),
        }
    }

    /// Build the dispatcher for `config` and wrap it
    ///
    /// No network I/O happens until the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, e.g. when a CA
    /// bundle or client certificate cannot be read.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self {
            dispatch: construct_http_client(config)?,
            prefix: config.api_version.path_prefix(),
        })
    }

    pub fn dispatch(&self) -> &Arc<dyn Dispatch> {
        &self.dispatch
    }

    /// Token, endpoint and identity of the underlying dispatcher
    pub async fn auth_info(&self) -> Result<AuthInfo> {
        self.dispatch.auth_info().await
    }

    /// Interpret a dispatcher response: errors for non-2xx, `None` for an empty body
    fn handle_response(response: Response, path: &str) -> Result<Option<Value>> {
        if !response.is_success() {
            let status = response.status.as_u16();
            let message = api::error_message(&response.text).unwrap_or_else(|| {
                response
                    .status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            debug!("{} failed with HTTP {}: {}", path, status, message);
            return Err(NeutronError::Api {
                status,
                kind: ApiErrorKind::from_status(status),
                message,
            });
        }

        if response.text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&response.text).map(Some).map_err(|e| {
            NeutronError::Serialization(format!("Invalid response from {}: {}", path, e))
        })
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Option<Value>> {
        let url = format!("{}{}", self.prefix, path);
        let mut options = RequestOptions::new();
        if let Some(body) = body {
            options = options.json(&body)?;
        }
        let response = self.dispatch.do_request(&url, method, options).await?;
        Self::handle_response(response, path)
    }

    fn unwrap_body<T: DeserializeOwned>(body: Option<Value>, key: &str) -> Result<T> {
        let mut body = body.ok_or_else(|| {
            NeutronError::Serialization(format!("Empty response, expected '{}'", key))
        })?;
        let inner = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| NeutronError::Serialization(format!("Response has no '{}' key", key)))?;
        Ok(serde_json::from_value(inner)?)
    }

    /// List a resource collection, optionally filtered by query pairs
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let collection = api::collection_name(resource);
        let mut path = format!("/{}", collection);
        if !query.is_empty() {
            path.push('?');
            path.push_str(&encode_query(query));
        }
        let body = self.call(Method::GET, &path, None).await?;
        Self::unwrap_body(body, &collection)
    }

    /// Show one resource by ID
    pub async fn show<T: DeserializeOwned>(&self, resource: &str, id: &str) -> Result<T> {
        let path = format!("/{}/{}", api::collection_name(resource), urlencoding::encode(id));
        let body = self.call(Method::GET, &path, None).await?;
        Self::unwrap_body(body, resource)
    }

    /// Create a resource from its inner body
    pub async fn create<T: DeserializeOwned>(
        &self,
        resource: &str,
        body: Map<String, Value>,
    ) -> Result<T> {
        let path = format!("/{}", api::collection_name(resource));
        let body = self.call(Method::POST, &path, Some(api::wrap(resource, body))).await?;
        Self::unwrap_body(body, resource)
    }

    /// Update a resource by ID with a partial inner body
    pub async fn update<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        body: Map<String, Value>,
    ) -> Result<T> {
        let path = format!("/{}/{}", api::collection_name(resource), urlencoding::encode(id));
        let body = self.call(Method::PUT, &path, Some(api::wrap(resource, body))).await?;
        Self::unwrap_body(body, resource)
    }

    /// Delete a resource by ID
    pub async fn delete(&self, resource: &str, id: &str) -> Result<()> {
        let path = format!("/{}/{}", api::collection_name(resource), urlencoding::encode(id));
        self.call(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Resolve a name or ID to an ID
    ///
    /// The value is tried as an ID first, then as a name.
    ///
    /// # Errors
    ///
    /// - [`NeutronError::NotFound`] if nothing matches
    /// - [`NeutronError::NotUnique`] if several resources share the name
    pub async fn find_resource_id_by_name_or_id(
        &self,
        resource: &str,
        name_or_id: &str,
    ) -> Result<String> {
        let by_id: Vec<Value> = self.list(resource, &[("id", name_or_id), ("fields", "id")]).await?;
        if let Some(id) = single_id(&by_id) {
            return Ok(id);
        }

        let by_name: Vec<Value> = self
            .list(resource, &[("name", name_or_id), ("fields", "id")])
            .await?;
        match by_name.len() {
            0 => Err(NeutronError::NotFound {
                resource: resource.to_string(),
                name_or_id: name_or_id.to_string(),
            }),
            1 => single_id(&by_name).ok_or_else(|| {
                NeutronError::Serialization(format!("{} without an id in response", resource))
            }),
            _ => Err(NeutronError::NotUnique {
                resource: resource.to_string(),
                name: name_or_id.to_string(),
            }),
        }
    }

    pub async fn list_packet_filters(&self, query: &[(&str, &str)]) -> Result<Vec<PacketFilter>> {
        self.list(packet_filter::RESOURCE, query).await
    }

    pub async fn show_packet_filter(&self, name_or_id: &str) -> Result<PacketFilter> {
        let id = self
            .find_resource_id_by_name_or_id(packet_filter::RESOURCE, name_or_id)
            .await?;
        self.show(packet_filter::RESOURCE, &id).await
    }

    /// Create a packet filter; fields are validated before any request
    pub async fn create_packet_filter(&self, request: CreatePacketFilter) -> Result<PacketFilter> {
        let body = PacketFilterRequest::Create(request).to_body()?;
        self.create(packet_filter::RESOURCE, body).await
    }

    /// Update a packet filter by name or ID; fields are validated before any request
    pub async fn update_packet_filter(
        &self,
        name_or_id: &str,
        request: UpdatePacketFilter,
    ) -> Result<PacketFilter> {
        let body = PacketFilterRequest::Update(request).to_body()?;
        let id = self
            .find_resource_id_by_name_or_id(packet_filter::RESOURCE, name_or_id)
            .await?;
        self.update(packet_filter::RESOURCE, &id, body).await
    }

    /// Delete a packet filter by name or ID, returning the deleted ID
    pub async fn delete_packet_filter(&self, name_or_id: &str) -> Result<String> {
        let id = self
            .find_resource_id_by_name_or_id(packet_filter::RESOURCE, name_or_id)
            .await?;
        self.delete(packet_filter::RESOURCE, &id).await?;
        Ok(id)
    }
}

fn single_id(items: &[Value]) -> Option<String> {
    match items {
        [item] => item.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
