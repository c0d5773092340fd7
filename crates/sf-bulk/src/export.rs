//! Paged export of Bulk API 2.0 query results.
//!
//! ```text
//! ExportSource::Query ──POST jobs/query──┐
//!                                        ├─> poll jobs/query/{id} ─> results?locator=... ─> ...
//! ExportSource::Job ─────────────────────┘
//! resume_at(job, locator) ──────────────────────────────> results?locator=...
//! ```

use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, instrument};

use crate::client::BulkApiClient;
use crate::error::{Error, Result};
use crate::records::{parse_rows, Row};
use crate::types::CreateQueryJobRequest;

/// Rows requested per results page.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Where an export gets its job from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    /// Submit this SOQL as a new query job.
    Query(String),
    /// Read an already submitted query job.
    Job(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Paging,
    Exhausted,
}

/// Lazily pages through the results of one query job.
///
/// Nothing is sent until the first call to [`next_page`](Self::next_page).
/// After each page [`locator`](Self::locator) holds the cursor of the next
/// one; passing it to [`resume_at`](Self::resume_at) continues the export
/// from there in a new reader.
///
/// # Example
///
/// ```rust,ignore
/// use futures::TryStreamExt;
/// use tally_sf_bulk::{BulkApiClient, BulkExportReader, ExportSource};
///
/// let reader = BulkExportReader::new(
///     client,
///     ExportSource::Query("SELECT Id FROM Account".to_string()),
/// );
/// let rows: Vec<_> = reader.into_rows().try_collect().await?;
/// ```
#[derive(Debug, Clone)]
pub struct BulkExportReader {
    client: BulkApiClient,
    source: ExportSource,
    job_id: Option<String>,
    locator: Option<String>,
    max_records: usize,
    phase: Phase,
}

impl BulkExportReader {
    pub fn new(client: BulkApiClient, source: ExportSource) -> Self {
        let job_id = match &source {
            ExportSource::Job(id) => Some(id.clone()),
            ExportSource::Query(_) => None,
        };
        Self {
            client,
            source,
            job_id,
            locator: None,
            max_records: DEFAULT_MAX_RECORDS,
            phase: Phase::NotStarted,
        }
    }

    /// Continue a finished job's export at `locator`.
    ///
    /// The job is neither submitted nor polled again.
    pub fn resume_at(
        client: BulkApiClient,
        job_id: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        let job_id = job_id.into();
        Self {
            client,
            source: ExportSource::Job(job_id.clone()),
            job_id: Some(job_id),
            locator: Some(locator.into()),
            max_records: DEFAULT_MAX_RECORDS,
            phase: Phase::Paging,
        }
    }

    /// Rows requested per page (`maxRecords`).
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Fail if the job has not finished within `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.client = self.client.with_max_wait(max_wait);
        self
    }

    pub fn source(&self) -> &ExportSource {
        &self.source
    }

    /// The query job id, once known.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Cursor of the next page, if a previous page pointed to one.
    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    async fn start(&mut self) -> Result<String> {
        let job_id = match (&self.job_id, &self.source) {
            (Some(id), _) | (None, ExportSource::Job(id)) => id.clone(),
            (None, ExportSource::Query(soql)) => {
                self.client
                    .create_query_job(CreateQueryJobRequest::new(soql.clone()))
                    .await?
                    .id
            }
        };
        self.job_id = Some(job_id.clone());

        self.client.wait_for_query_job(&job_id).await?;
        self.phase = Phase::Paging;
        Ok(job_id)
    }

    /// Fetch the next page of rows, or `None` once the export is done.
    #[instrument(skip(self))]
    pub async fn next_page(&mut self) -> Result<Option<Vec<Row>>> {
        let job_id = match (self.phase, self.job_id.clone()) {
            (Phase::Exhausted, _) => return Ok(None),
            (Phase::Paging, Some(id)) => id,
            _ => self.start().await?,
        };

        let page = self
            .client
            .get_query_results(&job_id, self.locator.as_deref(), Some(self.max_records))
            .await?;
        let rows = parse_rows(&page.csv_data)?;

        self.locator = page.locator;
        if self.locator.is_none() {
            self.phase = Phase::Exhausted;
        }
        debug!(job_id = %job_id, rows = rows.len(), next = ?self.locator, "export page");

        Ok(Some(rows))
    }

    /// Turn the reader into a stream of rows across all remaining pages.
    pub fn into_rows(self) -> impl Stream<Item = Result<Row>> {
        stream::try_unfold(self, |mut reader| async move {
            Ok::<_, Error>(reader.next_page().await?.map(|rows| (rows, reader)))
        })
        .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Row, Error>)))
        .try_flatten()
    }
}
