//! Integration tests for client construction and dispatch
//!
//! These go through the public API only. Tests needing a service run a small
//! axum app on an ephemeral port.

use anyhow::Result;
use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
use neutron_core::packet_filter::PacketFilter;
use neutron_core::{ClientParams, Configuration, NeutronError};
use neutronctl::client::NeutronClient;
use neutronctl::dispatch::{Dispatch, RequestOptions};
use neutronctl::http_client::construct_http_client;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

async fn closed_port_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{}", port))
}

async fn serve(app: Router) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(url)
}

fn noauth(endpoint: &str) -> ClientParams {
    ClientParams {
        auth_strategy: Some("noauth".to_string()),
        endpoint_url: Some(endpoint.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_unsupported_api_version() {
    let params = ClientParams {
        api_version: Some("3.0".to_string()),
        ..noauth("http://neutron:9696")
    };
    let err = Configuration::resolve(params).unwrap_err();
    assert!(matches!(err, NeutronError::UnsupportedVersion(_)));
    assert!(err.to_string().contains("2.0, 2"));
}

#[test]
fn test_both_version_strings_resolve() {
    for version in ["2.0", "2"] {
        let params = ClientParams {
            api_version: Some(version.to_string()),
            ..noauth("http://neutron:9696")
        };
        assert!(Configuration::resolve(params).is_ok(), "version {}", version);
    }
}

#[tokio::test]
async fn test_construction_performs_no_io() -> Result<()> {
    let endpoint = closed_port_url().await?;
    let config = Configuration::resolve(ClientParams {
        username: Some("demo".to_string()),
        password: Some("secret".to_string()),
        auth_url: Some(endpoint),
        ..Default::default()
    })?;

    // Building succeeds; the first call surfaces the unreachable identity service
    let client = construct_http_client(&config)?;
    let err = client.auth_info().await.unwrap_err();
    assert!(matches!(err, NeutronError::ConnectionFailed { .. }), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn test_uri_guard_through_public_api() -> Result<()> {
    let endpoint = closed_port_url().await?;
    let client = construct_http_client(&Configuration::resolve(noauth(&endpoint))?)?;

    let url = "/".repeat(8192 - endpoint.len() + 1);
    match client.do_request(&url, Method::GET, RequestOptions::new()).await {
        Err(NeutronError::RequestUriTooLong { excess }) => assert_eq!(excess, 1),
        other => panic!("Expected RequestUriTooLong, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_connection_failure_keeps_source() -> Result<()> {
    let endpoint = closed_port_url().await?;
    let client = construct_http_client(&Configuration::resolve(noauth(&endpoint))?)?;

    let err = client
        .request("/v2.0/networks", Method::GET, RequestOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Connection to neutron failed"));
    assert!(std::error::Error::source(&err).is_some());
    Ok(())
}

#[tokio::test]
async fn test_noauth_resource_listing() -> Result<()> {
    let app = Router::new().route(
        "/v2.0/packet_filters",
        get(|headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
            let token = headers
                .get("x-auth-token")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({"packet_filters": [{
                "id": "pf-1",
                "name": query.get("name").cloned().unwrap_or_default(),
                "network_id": "net-1",
                "action": "allow",
                "priority": "30000",
                "tenant_id": token
            }]}))
        }),
    );
    let url = serve(app).await?;

    let params = ClientParams {
        token: Some("static".to_string()),
        ..noauth(&url)
    };
    let client = NeutronClient::from_config(&Configuration::resolve(params)?)?;

    let filters: Vec<PacketFilter> = client.list_packet_filters(&[("name", "web")]).await?;
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].name.as_deref(), Some("web"));
    assert_eq!(filters[0].tenant_id.as_deref(), Some("static"));

    let info = client.auth_info().await?;
    assert_eq!(info.endpoint_url, url);
    assert_eq!(info.auth_token.as_deref(), Some("static"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_api_error() -> Result<()> {
    let url = serve(Router::new().route("/", get(|| async { Json(Value::Null) }))).await?;
    let client = NeutronClient::from_config(&Configuration::resolve(noauth(&url))?)?;

    let err = client.list_packet_filters(&[]).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    Ok(())
}
