//! Neutron Client Library
//!
//! Session, dispatch and resource layers for the Neutron networking API,
//! plus the `neutron` command-line tool built on them.
//!
//! # Public API
//!
//! [`client::NeutronClient`] is the entry point for resource calls. Below it,
//! [`http_client::construct_http_client`] picks a [`dispatch::Dispatch`]
//! implementation for a resolved [`neutron_core::Configuration`]: a
//! [`session::SessionClient`] when an identity service or admin token is
//! configured, or the fallback [`http_client::HttpClient`] for `noauth`.
//!
//! ```no_run
//! use neutronctl::http_client::construct_http_client;
//! use neutronctl::dispatch::RequestOptions;
//! use neutron_core::{ClientParams, Configuration};
//! use reqwest::Method;
//!
//! # async fn example() -> neutron_core::Result<()> {
//! let config = Configuration::resolve(ClientParams {
//!     username: Some("demo".to_string()),
//!     password: Some("secret".to_string()),
//!     project_name: Some("demo".to_string()),
//!     auth_url: Some("http://keystone:5000/v3".to_string()),
//!     ..Default::default()
//! })?;
//!
//! let client = construct_http_client(&config)?;
//! let response = client
//!     .do_request("/v2.0/networks", Method::GET, RequestOptions::new())
//!     .await?;
//! println!("{} {}", response.status, response.text);
//! # Ok(())
//! # }
//! ```

/// Identity and admin-token auth plugins.
pub mod auth;

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Resource client for the networking API.
pub mod client;

/// CLI preferences.
pub mod config;

/// The dispatch contract and its shared request helpers.
pub mod dispatch;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// Fallback dispatcher and dispatcher selection.
pub mod http_client;

/// Authenticated sessions.
pub mod session;

#[cfg(test)]
pub mod test_utils;
