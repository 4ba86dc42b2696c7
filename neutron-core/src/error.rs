//! Error types for the Neutron client

use thiserror::Error;

/// Boxed cause carried by transport errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a non-2xx response from the networking service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServiceUnavailable,
    Other,
}

impl ApiErrorKind {
    /// Map an HTTP status code to its error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            503 => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }
}

/// Core error type for Neutron client operations
#[derive(Error, Debug)]
pub enum NeutronError {
    /// Requested API version has no client mapping
    #[error("{0}")]
    UnsupportedVersion(String),

    /// Missing or inconsistent construction parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity service rejected the credentials or returned an unusable token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Service catalog has no endpoint matching the requested filters
    #[error("No '{service_type}' endpoint (interface: {interface}, region: {region})")]
    EndpointNotFound {
        service_type: String,
        interface: String,
        region: String,
    },

    /// Endpoint plus relative URL exceed the URI length limit
    #[error("URI too long by {excess} characters")]
    RequestUriTooLong { excess: usize },

    /// Connection could not be established (DNS, refused, TLS)
    #[error("Connection to neutron failed: {source}")]
    ConnectionFailed {
        #[source]
        source: BoxError,
    },

    /// A network call exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-2xx response interpreted by the resource layer
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        kind: ApiErrorKind,
        message: String,
    },

    /// No resource matched a name or ID
    #[error("Unable to find {resource} with name or id '{name_or_id}'")]
    NotFound { resource: String, name_or_id: String },

    /// More than one resource matched a name
    #[error("Multiple {resource} matches found for name '{name}', use an ID to be more specific.")]
    NotUnique { resource: String, name: String },

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl NeutronError {
    /// Wrap a low-level transport failure
    pub fn connection_failed(source: impl Into<BoxError>) -> Self {
        NeutronError::ConnectionFailed {
            source: source.into(),
        }
    }

    /// HTTP status carried by this error, if it came from the service
    pub fn status(&self) -> Option<u16> {
        match self {
            NeutronError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for Neutron client operations
pub type Result<T> = std::result::Result<T, NeutronError>;

impl From<serde_json::Error> for NeutronError {
    fn from(err: serde_json::Error) -> Self {
        NeutronError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NeutronError {
    fn from(err: toml::de::Error) -> Self {
        NeutronError::Parse(err.to_string())
    }
}
