//! Error type shared by the client, the readiness poller and the resources.

use thiserror::Error;

/// Errors that can occur while talking to Shadeform or orchestrating resources.
#[derive(Error, Debug)]
pub enum ShadeformError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A response was missing a field the caller depends on.
    #[error("Response is missing field `{0}`")]
    MissingField(&'static str),

    /// The remote side reported the instance in its error state.
    #[error("Instance {id} is in error state: {reason}")]
    ProvisioningFailed { id: String, reason: String },

    /// The instance did not become active before the deadline.
    #[error("Timed out after {waited_secs} seconds waiting for instance {id} to become active")]
    Timeout { id: String, waited_secs: u64 },

    /// The wait was aborted by the caller.
    #[error("Waiting for instance {id} was cancelled")]
    Cancelled { id: String },

    /// The status check itself failed while waiting for an instance.
    #[error("Status check for instance {id} failed: {source}")]
    StatusCheck {
        id: String,
        #[source]
        source: Box<ShadeformError>,
    },

    /// A volume cannot be deleted while an instance has it mounted.
    #[error(
        "Cannot delete volume {id} because it is mounted by instance {instance}. Delete the instance first."
    )]
    VolumeMounted { id: String, instance: String },
}

impl ShadeformError {
    /// Whether this error means the remote object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ShadeformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_check_wraps_source() {
        let err = ShadeformError::StatusCheck {
            id: "inst-1".to_string(),
            source: Box::new(ShadeformError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            }),
        };

        let msg = err.to_string();
        assert!(msg.contains("inst-1"));
        assert!(msg.contains("502"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_not_found() {
        assert!(ShadeformError::NotFound("gone".to_string()).is_not_found());
        assert!(!ShadeformError::MissingField("id").is_not_found());
    }
}
