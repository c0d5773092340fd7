//! Error types for sf-bulk.

use crate::types::JobState;

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

    /// True when the job itself ended `Failed` or `Aborted`.
    pub fn is_job_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::JobFailed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),
    #[error("Auth error: {0}")]
    Auth(String),
    /// The job finished in `Failed` or `Aborted`; `payload` is the job
    /// status document as returned by the platform.
    #[error("Bulk job {job_id} ended in state {state:?}: {payload}")]
    JobFailed {
        job_id: String,
        state: JobState,
        payload: serde_json::Value,
    },
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<tally_sf_client::Error> for Error {
    fn from(err: tally_sf_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<tally_sf_auth::Error> for Error {
    fn from(err: tally_sf_auth::Error) -> Self {
        Error::with_source(ErrorKind::Auth(err.to_string()), err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::with_source(ErrorKind::Csv(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
