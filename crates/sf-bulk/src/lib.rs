//! # tally-sf-bulk
//!
//! Salesforce Bulk API 2.0 for large exports and bulk DML.
//!
//! - **Export** - [`BulkExportReader`] submits (or adopts) a query job,
//!   waits for it and pages the CSV results by locator, yielding rows.
//! - **Ingest** - [`BulkApiClient::execute_ingest`] runs an insert, update,
//!   upsert or delete job end to end and returns per-record failures.
//! - **CSV** - [`encode_records`] turns JSON records into an upload body;
//!   [`parse_failed_results`] reads the `failedResults` report.
//!
//! ## Example - Export
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use tally_sf_bulk::{BulkApiClient, BulkExportReader, ExportSource};
//!
//! let client = BulkApiClient::new(instance_url, session_id)?;
//! let mut reader = BulkExportReader::new(
//!     client,
//!     ExportSource::Query("SELECT Id FROM IntegrationError__c".to_string()),
//! );
//! while let Some(rows) = reader.next_page().await? {
//!     println!("{} rows, next page at {:?}", rows.len(), reader.locator());
//! }
//! ```
//!
//! ## Example - Bulk Upsert
//!
//! ```rust,ignore
//! use tally_sf_bulk::{BulkApiClient, BulkOperation};
//!
//! let result = client
//!     .ingest_records("CustomObject__c", BulkOperation::Upsert, &records, Some("UpsertKey__c"))
//!     .await?;
//! for failure in result.failed_records()? {
//!     eprintln!("{}: {}", failure.error_code, failure.message);
//! }
//! ```

mod client;
mod error;
mod export;
mod records;
mod types;

pub use client::{BulkApiClient, DEFAULT_POLL_INTERVAL};
pub use error::{Error, ErrorKind, Result};
pub use export::{BulkExportReader, ExportSource, DEFAULT_MAX_RECORDS};
pub use records::{
    encode_records, match_submitted, parse_failed_results, parse_rows, FailedRecord, Row, BULK_NULL,
};
pub use types::*;
