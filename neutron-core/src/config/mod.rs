//! Client configuration
//!
//! Configuration is split into:
//! - [`ClientParams`] - named optional construction parameters
//! - [`CloudsFile`] - read-only named profiles filling unset parameters
//! - [`Configuration`] - the immutable result of [`Configuration::resolve`]

mod clouds;
mod params;
mod paths;
mod resolved;

pub use clouds::{CloudsFile, CLOUDS_FILE_ENV};
pub use params::ClientParams;
pub use paths::{default_cli_config_path, default_clouds_path, default_config_dir};
pub use resolved::{
    default_user_agent, AuthConfig, Configuration, Secret, TlsConfig, DEFAULT_API_VERSION,
};
