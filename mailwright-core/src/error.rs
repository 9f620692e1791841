//! Error types for the mailwright core library.
//!
//! Uses `thiserror` for public API error types. Display strings for backend
//! and agent failures carry the words the session loop classifies on
//! ("credential", "token", "network", "connection", "timeout").

use std::path::PathBuf;

/// Top-level error type for the mailwright core library.
#[derive(Debug, thiserror::Error)]
pub enum MailwrightError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by an email/calendar backend adapter.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("missing credential: set {var} (run the provider's auth flow)")]
    MissingCredential { var: String },

    #[error("{provider} rejected the access token (HTTP {status})")]
    TokenRejected { provider: String, status: u16 },

    #[error("network error talking to {provider}: {message}")]
    Network { provider: String, message: String },

    #[error("{provider} API returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {provider}: {message}")]
    Parse { provider: String, message: String },

    #[error("contact file error at {path}: {message}")]
    ContactFile { path: PathBuf, message: String },
}

/// Errors from the conversational agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("no LLM credential configured: set {var}")]
    NotConfigured { var: String },

    #[error("LLM endpoint rejected the API token (HTTP {status})")]
    AuthFailed { status: u16 },

    #[error("LLM request failed with HTTP {status}: {message}")]
    Request { status: u16, message: String },

    #[error("network error reaching the LLM endpoint: {message}")]
    Network { message: String },

    #[error("LLM response could not be read: {message}")]
    Response { message: String },
}

/// Errors from the configuration layer.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Env file {path} could not be read: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Errors from prompt template loading and filling.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Command '{name}' not found in {dir}/")]
    NotFound { name: String, dir: PathBuf },

    #[error("Template '{name}' has no {slot} placeholder")]
    MissingSlot { name: String, slot: String },
}

/// A type alias for results using the top-level `MailwrightError`.
pub type Result<T> = std::result::Result<T, MailwrightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_mentions_credential() {
        let err = BackendError::MissingCredential {
            var: "GOOGLE_ACCESS_TOKEN".into(),
        };
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn test_token_rejected_mentions_token() {
        let err = BackendError::TokenRejected {
            provider: "Gmail".into(),
            status: 401,
        };
        assert_eq!(
            err.to_string(),
            "Gmail rejected the access token (HTTP 401)"
        );
    }

    #[test]
    fn test_error_display_template() {
        let err = MailwrightError::Template(TemplateError::NotFound {
            name: "today".into(),
            dir: PathBuf::from("commands"),
        });
        assert_eq!(
            err.to_string(),
            "Template error: Command 'today' not found in commands/"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MailwrightError = io_err.into();
        assert!(matches!(err, MailwrightError::Io(_)));
    }

    #[test]
    fn test_agent_network_error_mentions_network() {
        let err = AgentError::Network {
            message: "dns failure".into(),
        };
        assert!(err.to_string().contains("network"));
    }
}
