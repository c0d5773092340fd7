//! Deletion of aged Integration Error records.
//!
//! Each pass exports up to `query_limit` of the oldest qualifying rows and
//! deletes them in bulk delete jobs of `delete_batch_size` ids. Passes repeat
//! until one comes back empty.

use serde_json::json;
use tracing::{debug, info, instrument};

use tally_sf_bulk::{BulkApiClient, BulkExportReader, BulkOperation, ExportSource};

use crate::config::PurgeConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::schema;

/// What a purge run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Query passes run, the final empty one included
    pub passes: usize,
    pub deleted: usize,
    /// Bulk delete jobs submitted
    pub batches: usize,
}

/// Delete every Error record older than `config.older_than_months`.
///
/// Any record the platform refuses to delete stops the run with
/// [`ErrorKind::DeleteFailed`]. Nothing is retried; running again picks up
/// whatever is left.
#[instrument(skip_all, fields(namespace = %config.namespace))]
pub async fn purge_aged_errors(bulk: &BulkApiClient, config: &PurgeConfig) -> Result<PurgeSummary> {
    config.validate()?;
    let sobject = config.schema().name(schema::ERROR);
    let query = config.query();
    let mut summary = PurgeSummary::default();

    loop {
        summary.passes += 1;
        let mut reader = BulkExportReader::new(bulk.clone(), ExportSource::Query(query.clone()));
        let mut buffer: Vec<String> = Vec::with_capacity(config.delete_batch_size);
        let mut seen = 0usize;

        while let Some(rows) = reader.next_page().await? {
            for mut row in rows {
                let id = row.remove("Id").ok_or_else(|| {
                    Error::new(ErrorKind::UnexpectedResponse(
                        "export row has no Id column".to_string(),
                    ))
                })?;
                seen += 1;
                buffer.push(id);
                if buffer.len() == config.delete_batch_size {
                    delete_batch(bulk, &sobject, &buffer).await?;
                    summary.batches += 1;
                    summary.deleted += buffer.len();
                    buffer.clear();
                }
            }
        }
        if !buffer.is_empty() {
            delete_batch(bulk, &sobject, &buffer).await?;
            summary.batches += 1;
            summary.deleted += buffer.len();
        }

        if seen == 0 {
            info!(
                passes = summary.passes,
                deleted = summary.deleted,
                "no more records to purge"
            );
            return Ok(summary);
        }
        info!(pass = summary.passes, records = seen, total = summary.deleted, "purge pass done");
    }
}

async fn delete_batch(bulk: &BulkApiClient, sobject: &str, ids: &[String]) -> Result<()> {
    let records: Vec<_> = ids.iter().map(|id| json!({ "Id": id })).collect();
    let result = bulk
        .ingest_records(sobject, BulkOperation::Delete, &records, None)
        .await?;

    if result.has_failures() {
        return Err(Error::new(ErrorKind::DeleteFailed {
            submitted: ids.len(),
            failed: usize::try_from(result.job.number_records_failed).unwrap_or(ids.len()),
            failed_csv: result.failed_results.unwrap_or_default(),
        }));
    }
    debug!(count = ids.len(), job_id = %result.job.id, "deleted batch");
    Ok(())
}
