//! Neutron Core Library
//!
//! Shared configuration, error and wire types for the Neutron networking API
//! client. This crate performs no I/O beyond reading profile files; the
//! session and dispatch layer lives in `neutronctl`.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod packet_filter;
pub mod types;

// Re-export commonly used types
pub use config::{AuthConfig, ClientParams, CloudsFile, Configuration, Secret, TlsConfig};
pub use error::*;
pub use types::*;
