//! Error types for sf-auth.
//!
//! Messages never include credential values.

/// Result type alias for sf-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-auth operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// SOAP fault returned by the login call, e.g. `INVALID_LOGIN`.
    #[error("Login failed: {code} - {message}")]
    LoginFailed { code: String, message: String },

    /// The login response could not be understood.
    #[error("Invalid login response: {0}")]
    InvalidResponse(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tally_sf_client::Error> for Error {
    fn from(err: tally_sf_client::Error) -> Self {
        let message = err.to_string();
        let sanitized = if message.contains("Bearer") || message.contains("sessionId") {
            "Client error (details redacted for security)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Http(sanitized), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidResponse(format!("bad URL: {err}")), err)
    }
}
