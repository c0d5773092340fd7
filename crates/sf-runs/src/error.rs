//! Error types for sf-runs.

pub type Result<T> = std::result::Result<T, Error>;

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

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// No Integration record has this name and creating one was not allowed.
    #[error("Integration not found: {0}")]
    IntegrationNotFound(String),

    #[error("Execution {0} is already finished")]
    AlreadyFinished(String),

    /// A bulk delete left records behind; `failed_csv` is the platform's
    /// failed-results report for the batch.
    #[error("Bulk delete failed for {failed} of {submitted} records")]
    DeleteFailed {
        submitted: usize,
        failed: usize,
        failed_csv: String,
    },

    /// The platform refused some of the bookkeeping rows themselves.
    #[error("{rejected} {sobject} rows rejected: {first_error}")]
    RowsRejected {
        sobject: String,
        rejected: usize,
        first_error: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("REST error: {0}")]
    Rest(String),

    #[error("Bulk error: {0}")]
    Bulk(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<tally_sf_rest::Error> for Error {
    fn from(err: tally_sf_rest::Error) -> Self {
        Error::with_source(ErrorKind::Rest(err.to_string()), err)
    }
}

impl From<tally_sf_bulk::Error> for Error {
    fn from(err: tally_sf_bulk::Error) -> Self {
        Error::with_source(ErrorKind::Bulk(err.to_string()), err)
    }
}

impl From<tally_sf_auth::Error> for Error {
    fn from(err: tally_sf_auth::Error) -> Self {
        Error::with_source(ErrorKind::Auth(err.to_string()), err)
    }
}

impl From<tally_sf_client::Error> for Error {
    fn from(err: tally_sf_client::Error) -> Self {
        Error::with_source(ErrorKind::Rest(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
