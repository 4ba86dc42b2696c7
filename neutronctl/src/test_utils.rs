//! Test utilities for client testing
//!
//! Provides a mock identity and networking service for exercising the session,
//! dispatch and resource layers against real HTTP.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Password the mock identity service accepts
pub const VALID_PASSWORD: &str = "secret";

/// How long the identity handler takes, so concurrent refreshes overlap if unserialized
const AUTH_DELAY: Duration = Duration::from_millis(50);

/// How long `/v2.0/slow` takes to answer
const SLOW_DELAY: Duration = Duration::from_secs(2);

/// Mock server state
#[derive(Debug, Clone)]
pub struct MockServerState {
    base_url: Arc<Mutex<String>>,
    auth_requests: Arc<AtomicUsize>,
    auth_in_flight: Arc<AtomicUsize>,
    max_auth_in_flight: Arc<AtomicUsize>,
    token_ttl_secs: Arc<AtomicI64>,
    next_token: Arc<AtomicUsize>,
    revoked: Arc<Mutex<HashSet<String>>>,
    reject_all: Arc<AtomicBool>,
    rejected_requests: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
    /// Stored packet filters by ID
    pub packet_filters: Arc<Mutex<BTreeMap<String, Value>>>,
    networks: Arc<Vec<Value>>,
    ports: Arc<Vec<Value>>,
}

impl Default for MockServerState {
    fn default() -> Self {
        let networks = vec![
            json!({"id": "net-1", "name": "private"}),
            json!({"id": "net-2", "name": "shared"}),
            json!({"id": "net-3", "name": "shared"}),
        ];
        let ports = vec![json!({"id": "port-1", "name": "web", "network_id": "net-1"})];

        Self {
            base_url: Arc::new(Mutex::new(String::new())),
            auth_requests: Arc::new(AtomicUsize::new(0)),
            auth_in_flight: Arc::new(AtomicUsize::new(0)),
            max_auth_in_flight: Arc::new(AtomicUsize::new(0)),
            token_ttl_secs: Arc::new(AtomicI64::new(3600)),
            next_token: Arc::new(AtomicUsize::new(1)),
            revoked: Arc::new(Mutex::new(HashSet::new())),
            reject_all: Arc::new(AtomicBool::new(false)),
            rejected_requests: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicUsize::new(1)),
            packet_filters: Arc::new(Mutex::new(BTreeMap::new())),
            networks: Arc::new(networks),
            ports: Arc::new(ports),
        }
    }
}

impl MockServerState {
    /// Number of identity authentications served
    pub fn auth_requests(&self) -> usize {
        self.auth_requests.load(Ordering::SeqCst)
    }

    /// Highest number of identity calls that were in flight at once
    pub fn max_concurrent_auth(&self) -> usize {
        self.max_auth_in_flight.load(Ordering::SeqCst)
    }

    /// Lifetime of issued tokens; negative values issue already-expired tokens
    pub fn set_token_ttl_secs(&self, secs: i64) {
        self.token_ttl_secs.store(secs, Ordering::SeqCst);
    }

    /// Make the networking routes reject one token with 401
    pub fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    /// Make the networking routes reject every request with 401
    pub fn revoke_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Number of networking requests answered with 401
    pub fn rejected_requests(&self) -> usize {
        self.rejected_requests.load(Ordering::SeqCst)
    }

    /// Insert a packet filter directly, returning its ID
    pub fn add_packet_filter(&self, mut filter: Value) -> String {
        let id = format!("pf-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        filter["id"] = Value::String(id.clone());
        self.packet_filters
            .lock()
            .unwrap()
            .insert(id.clone(), filter);
        id
    }

    fn check_token(&self, headers: &HeaderMap) -> std::result::Result<(), Response> {
        let token = headers.get("x-auth-token").and_then(|v| v.to_str().ok());
        let rejected = self.reject_all.load(Ordering::SeqCst)
            || token.is_some_and(|t| self.revoked.lock().unwrap().contains(t));
        if rejected {
            self.rejected_requests.fetch_add(1, Ordering::SeqCst);
            return Err((
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            )
                .into_response());
        }
        Ok(())
    }
}

/// Mock server implementation
#[derive(Debug)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Create a new mock server
    pub fn new() -> Self {
        Self {
            state: MockServerState::default(),
            port: 0, // Will be assigned when server starts
        }
    }

    /// Start the mock server and return the address
    ///
    /// The same address serves the identity API and is advertised as the
    /// public and internal `network` endpoint in the catalog.
    pub async fn start(mut self) -> Result<(Self, String)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);
        *self.state.base_url.lock().unwrap() = server_url.clone();

        let app = self.create_router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok((self, server_url))
    }

    /// Get the server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &MockServerState {
        &self.state
    }

    fn create_router(&self) -> Router {
        Router::new()
            // Identity
            .route("/v3/auth/tokens", post(auth_handler))
            // Diagnostics
            .route("/v2.0/echo", any(echo_handler))
            .route("/v2.0/slow", get(slow_handler))
            // Networking
            .route("/v2.0/networks", get(list_networks_handler))
            .route("/v2.0/ports", get(list_ports_handler))
            .route(
                "/v2.0/packet_filters",
                get(list_packet_filters_handler).post(create_packet_filter_handler),
            )
            .route(
                "/v2.0/packet_filters/:id",
                get(show_packet_filter_handler)
                    .put(update_packet_filter_handler)
                    .delete(delete_packet_filter_handler),
            )
            .with_state(self.state.clone())
    }
}

/// URL of a local port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn neutron_error(status: StatusCode, error_type: &str, message: String) -> Response {
    let body = json!({
        "NeutronError": {"type": error_type, "message": message, "detail": ""}
    });
    (status, Json(body)).into_response()
}

/// Keep items whose fields match the query; repeated keys match any of their values
///
/// `fields` selects columns on the real service and is ignored here.
fn filter_items(items: impl IntoIterator<Item = Value>, query: &[(String, String)]) -> Vec<Value> {
    let mut wanted: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (key, value) in query.iter().filter(|(key, _)| key != "fields") {
        wanted.entry(key.as_str()).or_default().push(value.as_str());
    }

    items
        .into_iter()
        .filter(|item| {
            wanted.iter().all(|(key, values)| {
                item.get(*key)
                    .and_then(Value::as_str)
                    .is_some_and(|v| values.contains(&v))
            })
        })
        .collect()
}

// Handler functions

async fn auth_handler(
    State(state): State<MockServerState>,
    Json(request): Json<Value>,
) -> Response {
    state.auth_requests.fetch_add(1, Ordering::SeqCst);
    let in_flight = state.auth_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state
        .max_auth_in_flight
        .fetch_max(in_flight, Ordering::SeqCst);
    tokio::time::sleep(AUTH_DELAY).await;
    let response = issue_token(&state, &request);
    state.auth_in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

fn issue_token(state: &MockServerState, request: &Value) -> Response {
    let identity = &request["auth"]["identity"];
    let user = match identity["methods"][0].as_str() {
        Some("password") => {
            let user = &identity["password"]["user"];
            if user["password"].as_str() != Some(VALID_PASSWORD) {
                let body = json!({"error": {
                    "code": 401,
                    "message": "The request you have made requires authentication.",
                    "title": "Unauthorized"
                }});
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            match (user["id"].as_str(), user["name"].as_str()) {
                (Some(id), _) => json!({"id": id}),
                (None, Some(name)) => json!({"id": format!("user-{}", name), "name": name}),
                (None, None) => return (StatusCode::BAD_REQUEST, "no user").into_response(),
            }
        }
        Some("token") => json!({"id": "user-token", "name": "token-user"}),
        _ => return (StatusCode::BAD_REQUEST, "unsupported method").into_response(),
    };

    let scope = &request["auth"]["scope"]["project"];
    let project = match (scope["id"].as_str(), scope["name"].as_str()) {
        (Some(id), _) => Some(json!({"id": id})),
        (None, Some(name)) => Some(json!({"id": format!("project-{}", name), "name": name})),
        (None, None) => None,
    };

    let base_url = state.base_url.lock().unwrap().clone();
    let ttl = state.token_ttl_secs.load(Ordering::SeqCst);
    let expires_at =
        (Utc::now() + ChronoDuration::seconds(ttl)).to_rfc3339_opts(SecondsFormat::Micros, true);

    let mut token = json!({
        "expires_at": expires_at,
        "user": user,
        "catalog": [{
            "type": "network",
            "name": "neutron",
            "endpoints": [
                {
                    "interface": "public",
                    "region": "RegionOne",
                    "region_id": "RegionOne",
                    "url": base_url
                },
                {
                    "interface": "internal",
                    "region": "RegionOne",
                    "region_id": "RegionOne",
                    "url": base_url
                }
            ]
        }]
    });
    if let Some(project) = project {
        token["project"] = project;
    }

    let issued = format!(
        "token-{}",
        state.next_token.fetch_add(1, Ordering::SeqCst)
    );
    (
        StatusCode::CREATED,
        [("X-Subject-Token", issued)],
        Json(json!({ "token": token })),
    )
        .into_response()
}

async fn echo_handler(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": body,
    }))
}

async fn slow_handler() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({}))
}

async fn list_networks_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    let networks = filter_items(state.networks.iter().cloned(), &query);
    Json(json!({ "networks": networks })).into_response()
}

async fn list_ports_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    let ports = filter_items(state.ports.iter().cloned(), &query);
    Json(json!({ "ports": ports })).into_response()
}

async fn list_packet_filters_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    let filters: Vec<Value> = state.packet_filters.lock().unwrap().values().cloned().collect();
    Json(json!({ "packet_filters": filter_items(filters, &query) })).into_response()
}

async fn create_packet_filter_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    let Some(mut filter) = body.get("packet_filter").cloned() else {
        return neutron_error(
            StatusCode::BAD_REQUEST,
            "HTTPBadRequest",
            "Resource body required".to_string(),
        );
    };

    let network_id = filter["network_id"].as_str().unwrap_or_default().to_string();
    if !state.networks.iter().any(|n| n["id"] == network_id.as_str()) {
        return neutron_error(
            StatusCode::NOT_FOUND,
            "NetworkNotFound",
            format!("Network {} could not be found.", network_id),
        );
    }

    filter["tenant_id"] = json!("project-demo");
    filter["status"] = json!("ACTIVE");
    let id = state.add_packet_filter(filter);
    let stored = state.packet_filters.lock().unwrap()[&id].clone();
    (StatusCode::CREATED, Json(json!({ "packet_filter": stored }))).into_response()
}

fn packet_filter_not_found(id: &str) -> Response {
    neutron_error(
        StatusCode::NOT_FOUND,
        "PacketFilterNotFound",
        format!("PacketFilter {} could not be found.", id),
    )
}

async fn show_packet_filter_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    match state.packet_filters.lock().unwrap().get(&id) {
        Some(filter) => Json(json!({ "packet_filter": filter })).into_response(),
        None => packet_filter_not_found(&id),
    }
}

async fn update_packet_filter_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    let mut filters = state.packet_filters.lock().unwrap();
    let Some(filter) = filters.get_mut(&id) else {
        return packet_filter_not_found(&id);
    };
    if let Some(changes) = body["packet_filter"].as_object() {
        for (key, value) in changes {
            filter[key] = value.clone();
        }
    }
    Json(json!({ "packet_filter": filter })).into_response()
}

async fn delete_packet_filter_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = state.check_token(&headers) {
        return rejection;
    }
    match state.packet_filters.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => packet_filter_not_found(&id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_startup() {
        let (server, url) = MockServer::new().start().await.unwrap();
        assert!(url.starts_with("http://127.0.0.1:"));
        assert!(server.port() > 0);
    }

    #[tokio::test]
    async fn test_identity_endpoint() {
        let (server, url) = MockServer::new().start().await.unwrap();
        let client = reqwest::Client::new();

        let body = json!({"auth": {"identity": {
            "methods": ["password"],
            "password": {
                "user": {
                    "name": "demo",
                    "domain": {"id": "default"},
                    "password": VALID_PASSWORD
                }
            }
        }}});
        let response = client
            .post(format!("{}/v3/auth/tokens", url))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(response.headers()["x-subject-token"], "token-1");

        let json: Value = response.json().await.unwrap();
        assert_eq!(json["token"]["user"]["id"], "user-demo");
        assert_eq!(json["token"]["catalog"][0]["endpoints"][0]["url"], url.as_str());
        assert_eq!(server.state().auth_requests(), 1);
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let (server, url) = MockServer::new().start().await.unwrap();
        server.state().revoke("old");
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/v2.0/networks", url))
            .header("X-Auth-Token", "old")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        let response = client
            .get(format!("{}/v2.0/networks?name=shared", url))
            .header("X-Auth-Token", "new")
            .send()
            .await
            .unwrap();
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["networks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_filter_items() {
        let items = vec![json!({"id": "a", "name": "x"}), json!({"id": "b", "name": "x"})];
        let query = vec![("id".to_string(), "a".to_string()), ("id".to_string(), "b".to_string())];
        assert_eq!(filter_items(items.clone(), &query).len(), 2);

        let query = vec![("name".to_string(), "y".to_string())];
        assert!(filter_items(items, &query).is_empty());
    }
}
