//! Errors reported by the search API

use thiserror::Error;

use super::version::ApiVersion;
use crate::retry::Transient;

/// Failure of a search API call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The job or plugin does not exist (yet)
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The server's API version does not serve the endpoint
    #[error("{endpoint} is not implemented by API version {actual} ({requirement})")]
    NotImplemented {
        endpoint: String,
        requirement: String,
        actual: String,
    },

    /// The server refused the request in its current state
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other error status
    #[error("server returned {status}: {message}")]
    Remote { status: u16, message: String },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn not_implemented(endpoint: &str, min: &ApiVersion, actual: &ApiVersion) -> Self {
        Self::NotImplemented {
            endpoint: endpoint.to_string(),
            requirement: format!("requires {} or later", min),
            actual: actual.to_string(),
        }
    }

    pub fn removed(endpoint: &str, last: &ApiVersion, actual: &ApiVersion) -> Self {
        Self::NotImplemented {
            endpoint: endpoint.to_string(),
            requirement: format!("removed after {}", last),
            actual: actual.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl Transient for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            ApiError::NotFound { .. } | ApiError::NotImplemented { .. } | ApiError::Conflict { .. } => {
                true
            }
            ApiError::Remote { status, .. } => *status >= 500,
        }
    }
}
