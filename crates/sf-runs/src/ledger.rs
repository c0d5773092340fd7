//! Bookkeeping records for one run of an integration job.
//!
//! A run owns exactly one Execution record. Log and Error records hang off
//! it and are only ever inserted; the Execution's outcome fields are written
//! once, by [`RunLedger::complete_execution`] or
//! [`RunLedger::handle_exception`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use tally_sf_bulk::{match_submitted, BulkOperation, FailedRecord, IngestJobResult};
use tally_sf_client::security::soql;
use tally_sf_rest::{CollectionResult, SalesforceRestClient, MAX_COLLECTION_SIZE};

use crate::config::LedgerConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::payload::to_payload_text;
use crate::schema::{self, Schema};
use crate::session::Session;

/// Severity stored on a Log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the platform rejected, as stored on an Error row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub error_code: String,
    pub message: String,
    /// The submitted record
    pub payload: Value,
}

/// Falls back to the echoed CSV columns, so every payload value is text.
impl From<FailedRecord> for RecordFailure {
    fn from(record: FailedRecord) -> Self {
        Self {
            payload: record.payload(),
            error_code: record.error_code,
            message: record.message,
        }
    }
}

impl RecordFailure {
    /// Pair sObject Collections results with the records that produced them.
    ///
    /// Results arrive in submission order; only failed entries are returned.
    pub fn from_collection_results<T: Serialize>(
        records: &[T],
        results: &[CollectionResult],
    ) -> Result<Vec<Self>> {
        if records.len() != results.len() {
            return Err(Error::new(ErrorKind::UnexpectedResponse(format!(
                "{} results for {} records",
                results.len(),
                records.len()
            ))));
        }

        let mut failures = Vec::new();
        for (record, result) in records.iter().zip(results) {
            if result.success {
                continue;
            }
            let (error_code, message) = match result.errors.first() {
                Some(first) => (first.status_code.clone(), first.message.clone()),
                None => ("UNKNOWN_EXCEPTION".to_string(), String::new()),
            };
            failures.push(Self {
                error_code,
                message,
                payload: serde_json::to_value(record)?,
            });
        }
        Ok(failures)
    }
}

#[derive(Deserialize)]
struct IdRecord {
    #[serde(rename = "Id")]
    id: String,
}

fn fields(pairs: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Object(pairs.into_iter().collect::<Map<String, Value>>())
}

/// Handle on the Execution record of one integration run.
///
/// # Example
///
/// ```rust,ignore
/// use tally_sf_runs::{LedgerConfig, LogLevel, RunLedger, Session};
///
/// let mut ledger = RunLedger::start(session, &LedgerConfig::default(), "orders-sync", &input).await?;
/// ledger.log("fetched 120 orders", LogLevel::Info).await?;
/// ledger.bulk_upsert("Order__c", &orders, "ExternalId__c").await?;
/// ledger.complete_execution(None).await?;
/// ```
#[derive(Debug)]
pub struct RunLedger {
    session: Session,
    schema: Schema,
    integration_id: String,
    execution_id: String,
    finished: bool,
}

impl RunLedger {
    /// Open a new run of `integration_name`.
    ///
    /// Looks the Integration up by name, creating it when it is missing and
    /// `config.create_missing_integration` is set, then inserts the
    /// Execution record holding `payload` as JSON.
    #[instrument(skip(session, config, payload))]
    pub async fn start<P: Serialize + ?Sized>(
        session: Session,
        config: &LedgerConfig,
        integration_name: &str,
        payload: &P,
    ) -> Result<Self> {
        let schema = config.schema();
        let rest = session.rest();

        let integration_id = match find_integration(rest, &schema, integration_name).await? {
            Some(id) => id,
            None if config.create_missing_integration => {
                info!("integration missing, creating it");
                Self::create_integration(
                    rest,
                    &schema,
                    integration_name,
                    config.launcher_name.as_deref(),
                )
                .await?
            }
            None => {
                return Err(Error::new(ErrorKind::IntegrationNotFound(
                    integration_name.to_string(),
                )))
            }
        };

        let execution = fields([
            (
                schema.name(schema::EXECUTION_INTEGRATION),
                Value::String(integration_id.clone()),
            ),
            (
                schema.name(schema::EXECUTION_PAYLOAD),
                Value::String(to_payload_text(payload)?),
            ),
        ]);
        let execution_id = rest
            .create(&schema.name(schema::EXECUTION), &execution)
            .await?;
        info!(%execution_id, %integration_id, "execution started");

        Ok(Self {
            session,
            schema,
            integration_id,
            execution_id,
            finished: false,
        })
    }

    /// Attach to an existing Execution. No record is created.
    #[instrument(skip(session, config))]
    pub async fn resume(session: Session, config: &LedgerConfig, execution_id: &str) -> Result<Self> {
        let schema = config.schema();
        let integration_field = schema.name(schema::EXECUTION_INTEGRATION);
        let success_field = schema.name(schema::SUCCESSFUL_COMPLETION);
        let error_field = schema.name(schema::EXECUTION_ERROR_MESSAGE);
        let wanted = [
            "Id",
            integration_field.as_str(),
            success_field.as_str(),
            error_field.as_str(),
        ];

        let record: Value = session
            .rest()
            .get(&schema.name(schema::EXECUTION), execution_id, Some(&wanted[..]))
            .await?;

        let integration_id = record
            .get(&integration_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::new(ErrorKind::UnexpectedResponse(format!(
                    "execution {execution_id} has no {integration_field}"
                )))
            })?
            .to_string();
        let succeeded = record.get(&success_field).and_then(Value::as_bool) == Some(true);
        let errored = record
            .get(&error_field)
            .and_then(Value::as_str)
            .is_some_and(|m| !m.is_empty());

        debug!(%integration_id, finished = succeeded || errored, "execution resumed");
        Ok(Self {
            session,
            schema,
            integration_id,
            execution_id: execution_id.to_string(),
            finished: succeeded || errored,
        })
    }

    /// Insert an Integration record and return its id.
    #[instrument(skip(rest, schema))]
    pub async fn create_integration(
        rest: &SalesforceRestClient,
        schema: &Schema,
        name: &str,
        launcher: Option<&str>,
    ) -> Result<String> {
        let mut pairs = vec![(
            schema::INTEGRATION_NAME.to_string(),
            Value::String(name.to_string()),
        )];
        if let Some(launcher) = launcher {
            pairs.push((
                schema.name(schema::LAUNCHER_NAME),
                Value::String(launcher.to_string()),
            ));
        }
        let id = rest
            .create(&schema.name(schema::INTEGRATION), &fields(pairs))
            .await?;
        Ok(id)
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn integration_id(&self) -> &str {
        &self.integration_id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True once the run's outcome has been written.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the Execution record.
    pub async fn get_execution(&self) -> Result<Value> {
        let record = self
            .session
            .rest()
            .get(
                &self.schema.name(schema::EXECUTION),
                &self.execution_id,
                None,
            )
            .await?;
        Ok(record)
    }

    /// Insert a Log record under this run.
    #[instrument(skip(self, message), fields(execution_id = %self.execution_id))]
    pub async fn log(&self, message: &str, level: LogLevel) -> Result<String> {
        let log = fields([
            (
                self.schema.name(schema::LOG_MESSAGE),
                Value::String(message.to_string()),
            ),
            (
                self.schema.name(schema::LOG_LEVEL),
                Value::String(level.as_str().to_string()),
            ),
            (
                self.schema.name(schema::LOG_PARENT),
                Value::String(self.execution_id.clone()),
            ),
        ]);
        let id = self
            .session
            .rest()
            .create(&self.schema.name(schema::LOG), &log)
            .await?;
        Ok(id)
    }

    fn error_row(
        &self,
        operation: &str,
        sobject: &str,
        upsert_key: Option<&str>,
        failure: &RecordFailure,
    ) -> Result<Value> {
        let s = &self.schema;
        let mut row = Map::new();
        row.insert(
            s.name(schema::ERROR_EXECUTION),
            Value::String(self.execution_id.clone()),
        );
        row.insert(s.name(schema::OPERATION), Value::String(operation.to_string()));
        row.insert(
            s.name(schema::SALESFORCE_OBJECT),
            Value::String(sobject.to_string()),
        );
        row.insert(
            s.name(schema::ERROR_CODE),
            Value::String(failure.error_code.clone()),
        );
        row.insert(
            s.name(schema::ERROR_MESSAGE),
            Value::String(failure.message.clone()),
        );
        if let Some(key) = upsert_key {
            row.insert(s.name(schema::UPSERT_KEY), Value::String(key.to_string()));
            let key_value = match failure.payload.get(key) {
                Some(Value::String(v)) => Some(v.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            if let Some(v) = key_value {
                row.insert(s.name(schema::UPSERT_KEY_VALUE), Value::String(v));
            }
        }
        row.insert(
            s.name(schema::OBJECT_PAYLOAD),
            Value::String(to_payload_text(&failure.payload)?),
        );
        Ok(Value::Object(row))
    }

    /// Insert one Error record per failure, at most 200 per request.
    ///
    /// Returns the number of Error records created.
    #[instrument(skip(self, failures), fields(execution_id = %self.execution_id, count = failures.len()))]
    pub async fn record_errors(
        &self,
        operation: &str,
        sobject: &str,
        upsert_key: Option<&str>,
        failures: &[RecordFailure],
    ) -> Result<usize> {
        let rows = failures
            .iter()
            .map(|f| self.error_row(operation, sobject, upsert_key, f))
            .collect::<Result<Vec<_>>>()?;

        let error_object = self.schema.name(schema::ERROR);
        let mut created = 0;
        for chunk in rows.chunks(MAX_COLLECTION_SIZE) {
            let results = self
                .session
                .rest()
                .create_multiple(&error_object, chunk, false)
                .await?;
            let rejected: Vec<&CollectionResult> = results.iter().filter(|r| !r.success).collect();
            if let Some(first) = rejected.first() {
                let first_error = first
                    .errors
                    .first()
                    .map(|e| format!("{}: {}", e.status_code, e.message))
                    .unwrap_or_default();
                return Err(Error::new(ErrorKind::RowsRejected {
                    sobject: error_object,
                    rejected: rejected.len(),
                    first_error,
                }));
            }
            created += results.len();
        }
        debug!(created, "error rows recorded");
        Ok(created)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::new(ErrorKind::AlreadyFinished(
                self.execution_id.clone(),
            )))
        } else {
            Ok(())
        }
    }

    async fn update_execution(&self, changes: &Value) -> Result<()> {
        self.session
            .rest()
            .update(&self.schema.name(schema::EXECUTION), &self.execution_id, changes)
            .await?;
        Ok(())
    }

    /// Mark the run successful, storing `response_payload` as JSON if given.
    #[instrument(skip(self, response_payload), fields(execution_id = %self.execution_id))]
    pub async fn complete_execution(&mut self, response_payload: Option<&Value>) -> Result<()> {
        self.ensure_open()?;

        let mut pairs = vec![(
            self.schema.name(schema::SUCCESSFUL_COMPLETION),
            Value::Bool(true),
        )];
        if let Some(payload) = response_payload {
            pairs.push((
                self.schema.name(schema::RESPONSE_PAYLOAD),
                Value::String(to_payload_text(payload)?),
            ));
        }
        self.update_execution(&fields(pairs)).await?;

        self.finished = true;
        info!("execution completed");
        Ok(())
    }

    /// Mark the run failed with `message`. The response payload is left as is.
    #[instrument(skip(self, message), fields(execution_id = %self.execution_id))]
    pub async fn handle_exception(&mut self, message: &str) -> Result<()> {
        self.ensure_open()?;

        let changes = fields([
            (
                self.schema.name(schema::SUCCESSFUL_COMPLETION),
                Value::Bool(false),
            ),
            (
                self.schema.name(schema::EXECUTION_ERROR_MESSAGE),
                Value::String(message.to_string()),
            ),
        ]);
        self.update_execution(&changes).await?;

        self.finished = true;
        warn!(%message, "execution failed");
        Ok(())
    }

    /// Replace the stored input payload.
    #[instrument(skip(self, payload), fields(execution_id = %self.execution_id))]
    pub async fn update_execution_payload<P: Serialize + ?Sized>(&self, payload: &P) -> Result<()> {
        let changes = fields([(
            self.schema.name(schema::EXECUTION_PAYLOAD),
            Value::String(to_payload_text(payload)?),
        )]);
        self.update_execution(&changes).await
    }

    /// Run a Bulk API 2.0 ingest job and record an Error row per failed record.
    ///
    /// Each Error row's payload is the submitted record the failed row was
    /// encoded from, not the text the platform echoes back.
    #[instrument(skip(self, records), fields(execution_id = %self.execution_id, count = records.len()))]
    pub async fn bulk_ingest<T: Serialize>(
        &self,
        operation: BulkOperation,
        sobject: &str,
        records: &[T],
        external_id_field: Option<&str>,
    ) -> Result<IngestJobResult> {
        let submitted = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        let result = self
            .session
            .bulk()
            .ingest_records(sobject, operation, &submitted, external_id_field)
            .await?;

        let failed = result.failed_records()?;
        let sources = match_submitted(&failed, &submitted);
        let failures: Vec<RecordFailure> = failed
            .into_iter()
            .zip(sources)
            .map(|(record, source)| match source {
                Some(payload) => RecordFailure {
                    error_code: record.error_code,
                    message: record.message,
                    payload: payload.clone(),
                },
                None => RecordFailure::from(record),
            })
            .collect();
        if !failures.is_empty() {
            warn!(failed = failures.len(), %sobject, "bulk records failed");
            self.record_errors(operation.api_name(), sobject, external_id_field, &failures)
                .await?;
        }
        Ok(result)
    }

    /// [`bulk_ingest`](Self::bulk_ingest) as an upsert on `external_id_field`.
    pub async fn bulk_upsert<T: Serialize>(
        &self,
        sobject: &str,
        records: &[T],
        external_id_field: &str,
    ) -> Result<IngestJobResult> {
        self.bulk_ingest(BulkOperation::Upsert, sobject, records, Some(external_id_field))
            .await
    }

    /// Insert records through sObject Collections and record an Error row per
    /// rejected record. Returns the results in submission order.
    #[instrument(skip(self, records), fields(execution_id = %self.execution_id, count = records.len()))]
    pub async fn insert_records<T: Serialize>(
        &self,
        sobject: &str,
        records: &[T],
    ) -> Result<Vec<CollectionResult>> {
        let mut all_results = Vec::with_capacity(records.len());
        for chunk in records.chunks(MAX_COLLECTION_SIZE) {
            let results = self
                .session
                .rest()
                .create_multiple(sobject, chunk, false)
                .await?;
            let failures = RecordFailure::from_collection_results(chunk, &results)?;
            if !failures.is_empty() {
                warn!(failed = failures.len(), %sobject, "records rejected");
                self.record_errors("insert", sobject, None, &failures)
                    .await?;
            }
            all_results.extend(results);
        }
        Ok(all_results)
    }
}

async fn find_integration(
    rest: &SalesforceRestClient,
    schema: &Schema,
    name: &str,
) -> Result<Option<String>> {
    let soql = format!(
        "SELECT Id FROM {} WHERE {} = '{}' LIMIT 1",
        schema.name(schema::INTEGRATION),
        schema::INTEGRATION_NAME,
        soql::escape_string(name)
    );
    let result = rest.query::<IdRecord>(&soql).await?;
    Ok(result.records.into_iter().next().map(|r| r.id))
}
