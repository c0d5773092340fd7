//! Bulk API 2.0 client.
//!
//! Low-level job operations: create, poll and page query jobs; create,
//! upload, close and collect ingest jobs.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, instrument};

use tally_sf_auth::Credentials;
use tally_sf_client::{ClientConfig, SalesforceClient};

use crate::error::{Error, ErrorKind, Result};
use crate::records::encode_records;
use crate::types::*;

/// Default polling interval for job status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Salesforce Bulk API 2.0 client.
///
/// Jobs are polled every [`DEFAULT_POLL_INTERVAL`] until they settle. There
/// is no limit on the total wait unless one is set with
/// [`with_max_wait`](Self::with_max_wait).
///
/// # Example
///
/// ```rust,ignore
/// use tally_sf_bulk::{BulkApiClient, BulkOperation};
///
/// let client = BulkApiClient::new(instance_url, session_id)?;
/// let result = client
///     .execute_ingest("Account", BulkOperation::Delete, "Id\n001xx0000000001\n", None)
///     .await?;
/// assert!(!result.has_failures());
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl BulkApiClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, access_token)?;
        Ok(Self::from_client(client))
    }

    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_config(instance_url, access_token, config)?;
        Ok(Self::from_client(client))
    }

    /// Build a client for a logged-in session.
    pub fn from_credentials(creds: &impl Credentials, config: ClientConfig) -> Result<Self> {
        let client =
            SalesforceClient::with_config(creds.instance_url(), creds.access_token(), config)?
                .with_api_version(creds.api_version());
        Ok(Self::from_client(client))
    }

    /// Wrap an existing client, sharing its connection pool.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }

    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    /// Set the polling interval for job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up on a job that has not settled within `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    fn check_deadline(&self, job_id: &str, start: Instant) -> Result<()> {
        match self.max_wait {
            Some(max_wait) if start.elapsed() > max_wait => {
                Err(Error::new(ErrorKind::Timeout(format!(
                    "Job {} did not complete within {:?}",
                    job_id, max_wait
                ))))
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Query Job Operations
    // =========================================================================

    /// Submit a query job.
    #[instrument(skip(self, request))]
    pub async fn create_query_job(&self, request: CreateQueryJobRequest) -> Result<QueryJob> {
        let url = self.client.bulk_url("query");
        let job: QueryJob = self.client.post_json(&url, &request).await?;
        debug!(job_id = %job.id, "created query job");
        Ok(job)
    }

    /// Get query job status.
    #[instrument(skip(self))]
    pub async fn get_query_job(&self, job_id: &str) -> Result<QueryJob> {
        let (job, _) = self.query_job_document(job_id).await?;
        Ok(job)
    }

    async fn query_job_document(&self, job_id: &str) -> Result<(QueryJob, serde_json::Value)> {
        let url = self.client.bulk_url(&format!("query/{}", job_id));
        let document: serde_json::Value = self.client.get_json(&url).await?;
        let job: QueryJob = serde_json::from_value(document.clone())?;
        Ok((job, document))
    }

    /// Wait until a query job leaves `UploadComplete`/`InProgress`.
    ///
    /// A job that ends `Failed` or `Aborted` is an error carrying the job
    /// document; any other state counts as finished.
    #[instrument(skip(self))]
    pub async fn wait_for_query_job(&self, job_id: &str) -> Result<QueryJob> {
        let start = Instant::now();

        loop {
            let (job, document) = self.query_job_document(job_id).await?;

            if job.state.is_failure() {
                return Err(Error::new(ErrorKind::JobFailed {
                    job_id: job_id.to_string(),
                    state: job.state,
                    payload: document,
                }));
            }
            if !job.state.is_pending() {
                debug!(state = ?job.state, records = job.number_records_processed, "query job finished");
                return Ok(job);
            }

            self.check_deadline(job_id, start)?;
            debug!(state = ?job.state, "query job still running");
            sleep(self.poll_interval).await;
        }
    }

    /// Fetch one page of query results.
    ///
    /// `locator` is the cursor returned with the previous page. The next
    /// cursor comes from the `Sforce-Locator` header; `null` means this is
    /// the last page.
    #[instrument(skip(self))]
    pub async fn get_query_results(
        &self,
        job_id: &str,
        locator: Option<&str>,
        max_records: Option<usize>,
    ) -> Result<QueryResults> {
        let url = self.client.bulk_url(&format!("query/{}/results", job_id));

        let mut request = self.client.get(&url).header("Accept", "text/csv");
        if let Some(max) = max_records {
            request = request.query("maxRecords", max.to_string());
        }
        if let Some(loc) = locator {
            request = request.query("locator", loc);
        }

        let response = self.client.execute(request).await?;

        let next_locator = response
            .sforce_locator()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty() && s != "null");

        let csv_data = response.text().await?;
        debug!(bytes = csv_data.len(), has_more = next_locator.is_some(), "fetched result page");

        Ok(QueryResults {
            csv_data,
            locator: next_locator,
        })
    }

    // =========================================================================
    // Ingest Job Operations
    // =========================================================================

    /// Create a new ingest job.
    #[instrument(skip(self, request))]
    pub async fn create_ingest_job(&self, request: CreateIngestJobRequest) -> Result<IngestJob> {
        let url = self.client.bulk_url("ingest");
        let job: IngestJob = self.client.post_json(&url, &request).await?;
        debug!(job_id = %job.id, operation = %job.operation, "created ingest job");
        Ok(job)
    }

    /// Upload CSV data to an open ingest job.
    #[instrument(skip(self, csv_data), fields(bytes = csv_data.len()))]
    pub async fn upload_job_data(&self, job_id: &str, csv_data: &str) -> Result<()> {
        let url = self.client.bulk_url(&format!("ingest/{}/batches", job_id));
        let request = self.client.put(&url).csv(csv_data);
        self.client.execute(request).await?;
        Ok(())
    }

    async fn set_ingest_state(
        &self,
        job_id: &str,
        request: UpdateJobStateRequest,
    ) -> Result<IngestJob> {
        let url = self.client.bulk_url(&format!("ingest/{}", job_id));
        let req = self.client.patch(&url).json(&request)?;
        let response = self.client.execute(req).await?;
        let job: IngestJob = response.json().await?;
        Ok(job)
    }

    /// Close an ingest job (mark as UploadComplete) so processing starts.
    #[instrument(skip(self))]
    pub async fn close_ingest_job(&self, job_id: &str) -> Result<IngestJob> {
        self.set_ingest_state(job_id, UpdateJobStateRequest::upload_complete())
            .await
    }

    #[instrument(skip(self))]
    pub async fn abort_ingest_job(&self, job_id: &str) -> Result<IngestJob> {
        self.set_ingest_state(job_id, UpdateJobStateRequest::abort())
            .await
    }

    /// Get ingest job status.
    #[instrument(skip(self))]
    pub async fn get_ingest_job(&self, job_id: &str) -> Result<IngestJob> {
        let url = self.client.bulk_url(&format!("ingest/{}", job_id));
        let job: IngestJob = self.client.get_json(&url).await?;
        Ok(job)
    }

    /// Wait for an ingest job to reach a terminal state.
    #[instrument(skip(self))]
    pub async fn wait_for_ingest_job(&self, job_id: &str) -> Result<IngestJob> {
        let start = Instant::now();

        loop {
            let job = self.get_ingest_job(job_id).await?;

            if job.state.is_terminal() {
                return Ok(job);
            }

            self.check_deadline(job_id, start)?;
            debug!(state = ?job.state, "ingest job still running");
            sleep(self.poll_interval).await;
        }
    }

    async fn get_csv(&self, url: &str) -> Result<String> {
        let request = self.client.get(url).header("Accept", "text/csv");
        let response = self.client.execute(request).await?;
        response.text().await.map_err(Into::into)
    }

    /// Get successful results from an ingest job (CSV format).
    #[instrument(skip(self))]
    pub async fn get_successful_results(&self, job_id: &str) -> Result<String> {
        let url = self
            .client
            .bulk_url(&format!("ingest/{}/successfulResults", job_id));
        self.get_csv(&url).await
    }

    /// Get failed results from an ingest job (CSV format).
    #[instrument(skip(self))]
    pub async fn get_failed_results(&self, job_id: &str) -> Result<String> {
        let url = self
            .client
            .bulk_url(&format!("ingest/{}/failedResults", job_id));
        self.get_csv(&url).await
    }

    // =========================================================================
    // High-Level Operations
    // =========================================================================

    /// Execute a complete ingest operation.
    ///
    /// Creates the job, uploads `csv_data`, closes the job and waits for it.
    /// Failed results are fetched when the job reports failed records. A job
    /// that ends `Failed` or `Aborted` is an error.
    #[instrument(skip(self, csv_data))]
    pub async fn execute_ingest(
        &self,
        sobject: &str,
        operation: BulkOperation,
        csv_data: &str,
        external_id_field: Option<&str>,
    ) -> Result<IngestJobResult> {
        let mut request = CreateIngestJobRequest::new(sobject, operation);
        if let Some(ext_id) = external_id_field {
            request = request.with_external_id_field(ext_id);
        }

        let job = self.create_ingest_job(request).await?;
        self.upload_job_data(&job.id, csv_data).await?;
        self.close_ingest_job(&job.id).await?;

        let completed_job = self.wait_for_ingest_job(&job.id).await?;
        if completed_job.state.is_failure() {
            return Err(Error::new(ErrorKind::JobFailed {
                job_id: completed_job.id.clone(),
                state: completed_job.state,
                payload: serde_json::to_value(&completed_job)?,
            }));
        }

        let failed_results = if completed_job.number_records_failed > 0 {
            Some(self.get_failed_results(&job.id).await?)
        } else {
            None
        };

        Ok(IngestJobResult {
            job: completed_job,
            failed_results,
        })
    }

    /// Encode `records` as CSV and run them through [`execute_ingest`](Self::execute_ingest).
    pub async fn ingest_records<T: Serialize>(
        &self,
        sobject: &str,
        operation: BulkOperation,
        records: &[T],
        external_id_field: Option<&str>,
    ) -> Result<IngestJobResult> {
        if records.is_empty() {
            return Err(Error::new(ErrorKind::Api(
                "an ingest job needs at least one record".to_string(),
            )));
        }
        let csv_data = encode_records(records)?;
        self.execute_ingest(sobject, operation, &csv_data, external_id_field)
            .await
    }
}
