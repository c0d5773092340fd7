//! Error types for sf-rest.

/// Result type alias for sf-rest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-rest operations.
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

    /// The platform error code, for API and validation failures.
    pub fn error_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Salesforce { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Platform error payload, or a request rejected before sending
    /// (`INVALID_SOBJECT`, `INVALID_ID`).
    #[error("Salesforce error: {error_code} - {message}")]
    Salesforce { error_code: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(String),

    /// Transport or HTTP failure from the client layer.
    #[error("Client error: {0}")]
    Client(String),
}

impl From<tally_sf_client::Error> for Error {
    fn from(err: tally_sf_client::Error) -> Self {
        let kind = match &err.kind {
            tally_sf_client::ErrorKind::SalesforceApi {
                error_code,
                message,
                ..
            } => ErrorKind::Salesforce {
                error_code: error_code.clone(),
                message: message.clone(),
            },
            tally_sf_client::ErrorKind::NotFound(message) => ErrorKind::NotFound(message.clone()),
            tally_sf_client::ErrorKind::Json(message) => ErrorKind::Json(message.clone()),
            _ => ErrorKind::Client(err.to_string()),
        };
        Error::with_source(kind, err)
    }
}

impl From<tally_sf_auth::Error> for Error {
    fn from(err: tally_sf_auth::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
