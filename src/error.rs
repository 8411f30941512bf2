//! Error taxonomy for the monitoring core
//!
//! Only `Configuration` is meant to reach a caller of `connect` or session
//! start. Everything else raised inside a monitoring tick is logged and
//! absorbed by the loop.

#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    /// Network failure or timeout talking to a remote endpoint
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with an `ok: false` envelope
    #[error("remote rejected {method}: {error}")]
    RemoteRejection { method: String, error: String },

    /// Identity, group or account lookup found nothing
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid account token, unknown account
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The semantic oracle is disabled or failed
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The preference store collaborator failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl MonitorError {
    pub fn rejection(method: &str, error: impl Into<String>) -> Self {
        MonitorError::RemoteRejection {
            method: method.to_string(),
            error: error.into(),
        }
    }

    /// Whether the error must be surfaced to the user instead of absorbed
    pub fn is_user_visible(&self) -> bool {
        matches!(self, MonitorError::Configuration(_))
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MonitorError::Transport(format!("timed out: {}", err))
        } else {
            MonitorError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Transport(format!("malformed response: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_user_visible() {
        assert!(MonitorError::Configuration("missing token".into()).is_user_visible());
        assert!(!MonitorError::Transport("reset".into()).is_user_visible());
        assert!(!MonitorError::rejection("users.info", "user_not_found").is_user_visible());
        assert!(!MonitorError::ClassifierUnavailable("disabled".into()).is_user_visible());
    }

    #[test]
    fn test_rejection_display() {
        let err = MonitorError::rejection("auth.test", "invalid_auth");
        assert_eq!(err.to_string(), "remote rejected auth.test: invalid_auth");
    }
}
