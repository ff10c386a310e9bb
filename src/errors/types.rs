//! Error type definitions for the guide scraper
//!
//! The hierarchy mirrors the layers of the application: configuration,
//! the upstream listings service, and guide assembly/serialization.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Upstream listings service errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Guide assembly errors
    #[error("Build error: {message}")]
    Build { message: String },

    /// XML serialization errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error(
        "{path} does not exist. Copy zap2itconfig.toml.dist to {path} \
         and update the settings to match your zap2it account"
    )]
    Missing { path: String },

    /// The configuration file could not be read
    #[error("Failed to read config, check permissions: {path} - {message}")]
    Unreadable { path: String, message: String },

    /// The configuration file is not valid TOML for our schema
    #[error("Invalid config file {path}: {message}")]
    Invalid { path: String, message: String },

    /// A required setting is absent
    #[error("Missing setting: [{section}] {key}")]
    MissingSetting { section: String, key: String },
}

/// Upstream listings service errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Login was rejected or the response lacked a token
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Upstream replied with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Upstream payload could not be decoded
    #[error("Parse error: {context} - {message}")]
    ParseError { context: String, message: String },

    /// Operation needs a session but none was negotiated
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AppError {
    /// Create a build error with a custom message
    pub fn build<S: Into<String>>(message: S) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Create a missing setting error
    pub fn missing_setting<S: Into<String>, K: Into<String>>(section: S, key: K) -> Self {
        Self::MissingSetting {
            section: section.into(),
            key: key.into(),
        }
    }
}

impl SourceError {
    /// Create an authentication failed error
    pub fn auth_failed<M: Into<String>>(message: M) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }
}
