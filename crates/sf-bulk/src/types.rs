//! Types for Bulk API 2.0.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::records::{parse_failed_results, FailedRecord};

/// Deserialize API version that can be either a float (62.0) or string ("62.0").
pub(crate) fn deserialize_api_version<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ApiVersion {
        Float(f64),
        String(String),
    }

    Option::<ApiVersion>::deserialize(deserializer).map(|opt| {
        opt.map(|v| match v {
            ApiVersion::Float(f) => format!("{:.1}", f),
            ApiVersion::String(s) => s,
        })
    })
}

/// Bulk API 2.0 job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is open and accepting data
    Open,
    /// Upload is complete, job is queued
    UploadComplete,
    /// Job is processing
    InProgress,
    Aborted,
    JobComplete,
    Failed,
}

impl JobState {
    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Aborted | JobState::JobComplete | JobState::Failed
        )
    }

    /// Check if job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobState::JobComplete)
    }

    /// Check if job ended without producing results.
    pub fn is_failure(&self) -> bool {
        matches!(self, JobState::Aborted | JobState::Failed)
    }

    /// States a query job passes through while the platform works on it.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobState::UploadComplete | JobState::InProgress)
    }
}

/// Bulk API 2.0 operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkOperation {
    Insert,
    Update,
    /// Upsert based on external ID
    Upsert,
    /// Soft delete (recycle bin)
    Delete,
    HardDelete,
    Query,
    /// Query including deleted and archived records
    QueryAll,
}

impl BulkOperation {
    /// Get the API string for this operation.
    pub fn api_name(&self) -> &'static str {
        match self {
            BulkOperation::Insert => "insert",
            BulkOperation::Update => "update",
            BulkOperation::Upsert => "upsert",
            BulkOperation::Delete => "delete",
            BulkOperation::HardDelete => "hardDelete",
            BulkOperation::Query => "query",
            BulkOperation::QueryAll => "queryAll",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, BulkOperation::Query | BulkOperation::QueryAll)
    }

    pub fn is_ingest(&self) -> bool {
        !self.is_query()
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Request to create an ingest job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngestJobRequest {
    /// SObject API name
    pub object: String,
    pub operation: String,
    /// External ID field for upsert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id_field_name: Option<String>,
    pub content_type: String,
    pub column_delimiter: String,
    pub line_ending: String,
}

impl CreateIngestJobRequest {
    pub fn new(sobject: impl Into<String>, operation: BulkOperation) -> Self {
        Self {
            object: sobject.into(),
            operation: operation.api_name().to_string(),
            external_id_field_name: None,
            content_type: "CSV".to_string(),
            column_delimiter: "COMMA".to_string(),
            line_ending: "LF".to_string(),
        }
    }

    /// Set the external ID field for upsert operations.
    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field_name = Some(field.into());
        self
    }
}

/// Request to create a query job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryJobRequest {
    pub query: String,
    /// `query` or `queryAll`
    pub operation: String,
}

impl CreateQueryJobRequest {
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            query: soql.into(),
            operation: BulkOperation::Query.api_name().to_string(),
        }
    }

    /// Use queryAll instead of query (includes deleted records).
    pub fn with_query_all(mut self) -> Self {
        self.operation = BulkOperation::QueryAll.api_name().to_string();
        self
    }
}

/// Body of the PATCH that moves an ingest job to a new state.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateJobStateRequest {
    pub state: JobState,
}

impl UpdateJobStateRequest {
    pub fn upload_complete() -> Self {
        Self {
            state: JobState::UploadComplete,
        }
    }

    pub fn abort() -> Self {
        Self {
            state: JobState::Aborted,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Ingest job response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestJob {
    pub id: String,
    pub state: JobState,
    /// SObject API name
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub operation: String,
    /// Number of records processed, failures included
    #[serde(default)]
    pub number_records_processed: i64,
    #[serde(default)]
    pub number_records_failed: i64,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub total_processing_time: Option<i64>,
    /// API version (can be float like 62.0 or string like "62.0")
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Query job response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJob {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub number_records_processed: i64,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryResults {
    pub csv_data: String,
    /// Locator for the next page (None if no more pages)
    pub locator: Option<String>,
}

// =============================================================================
// Result Types
// =============================================================================

/// Result of a completed ingest job.
#[derive(Debug, Clone)]
pub struct IngestJobResult {
    /// The completed job
    pub job: IngestJob,
    /// Failed records CSV, fetched only when the job reports failures
    pub failed_results: Option<String>,
}

impl IngestJobResult {
    pub fn is_success(&self) -> bool {
        self.job.state.is_success()
    }

    pub fn has_failures(&self) -> bool {
        self.job.number_records_failed > 0
    }

    /// Parse the failed-results CSV into per-record failures.
    pub fn failed_records(&self) -> Result<Vec<FailedRecord>> {
        match &self.failed_results {
            Some(csv) => parse_failed_results(csv),
            None => Ok(Vec::new()),
        }
    }
}
