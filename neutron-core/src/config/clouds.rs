//! Named cloud profiles
//!
//! A read-only TOML file with one `[clouds.<name>]` table per cloud. Each
//! table holds any subset of [`ClientParams`].
//!
//! ```toml
//! [clouds.devstack]
//! auth_url = "http://192.168.1.10/identity/v3"
//! username = "demo"
//! project_name = "demo"
//! region_name = "RegionOne"
//! ```

use super::params::ClientParams;
use crate::error::{NeutronError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable overriding the profiles file location
pub const CLOUDS_FILE_ENV: &str = "NEUTRON_CLOUDS_FILE";

/// Parsed cloud profiles file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudsFile {
    #[serde(default)]
    pub clouds: BTreeMap<String, ClientParams>,
}

impl CloudsFile {
    /// Parse profiles from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CloudsFile = toml::from_str(content)?;
        if file.clouds.values().any(|params| params.cloud.is_some()) {
            return Err(NeutronError::Config(
                "Cloud profiles cannot reference other clouds".to_string(),
            ));
        }
        Ok(file)
    }

    /// Load profiles from a file; a missing file yields no profiles
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Look up a profile by name
    pub fn get(&self, name: &str) -> Result<&ClientParams> {
        self.clouds.get(name).ok_or_else(|| {
            NeutronError::Config(format!(
                "Cloud '{}' was not found. Known clouds: {}",
                name,
                if self.clouds.is_empty() {
                    "none".to_string()
                } else {
                    self.clouds.keys().cloned().collect::<Vec<_>>().join(", ")
                }
            ))
        })
    }
}

impl ClientParams {
    /// Fill unset values from the named cloud profile, if one is selected
    ///
    /// An empty cloud name selects nothing.
    pub fn with_cloud_profile(self, clouds: &CloudsFile) -> Result<Self> {
        match self.cloud.as_deref() {
            None | Some("") => Ok(self),
            Some(name) => {
                let profile = clouds.get(name)?.clone();
                Ok(self.or(profile))
            }
        }
    }
}
