//! CSV encoding and decoding for Bulk API 2.0 payloads.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

/// One result row: column name to field value.
pub type Row = HashMap<String, String>;

/// Stands in for `\0` while the csv reader runs.
const NULL_BYTE_SENTINEL: &str = "<NULL BYTE>";

/// Bulk API 2.0 marker that sets a field to null.
pub const BULK_NULL: &str = "#N/A";

/// Parse a query-results CSV page into rows.
///
/// Null bytes in the body survive into the field values unchanged.
pub fn parse_rows(csv_data: &str) -> Result<Vec<Row>> {
    if csv_data.trim().is_empty() {
        return Ok(Vec::new());
    }

    let guarded = csv_data.replace('\0', NULL_BYTE_SENTINEL);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(guarded.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), restore_null_bytes(value)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn restore_null_bytes(value: &str) -> String {
    if value.contains(NULL_BYTE_SENTINEL) {
        value.replace(NULL_BYTE_SENTINEL, "\0")
    } else {
        value.to_string()
    }
}

/// Encode records as an ingest CSV body.
///
/// Columns appear in the order they are first seen across the records.
/// A JSON `null` becomes `#N/A`; a field missing from a record is left
/// empty so the platform leaves it unchanged.
pub fn encode_records<T: Serialize>(records: &[T]) -> Result<String> {
    let objects = records
        .iter()
        .map(|r| match serde_json::to_value(r)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::new(ErrorKind::Json(format!(
                "bulk records must be JSON objects, got {other}"
            )))),
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    let mut headers: Vec<&str> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&headers)?;
    for object in &objects {
        let row: Vec<String> = headers
            .iter()
            .map(|h| object.get(*h).map(csv_field).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::new(ErrorKind::Csv(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| Error::with_source(ErrorKind::Csv(e.to_string()), e))
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => BULK_NULL.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A record the platform rejected during an ingest job.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    /// Record id, when the platform assigned or matched one
    pub id: Option<String>,
    pub error_code: String,
    pub message: String,
    /// Fields the platform blamed, if it named any
    pub fields: Vec<String>,
    /// Submitted columns, in upload order
    pub columns: Vec<(String, String)>,
}

impl FailedRecord {
    /// Value of a submitted column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// The submitted columns as a JSON object, keeping column order.
    pub fn payload(&self) -> Value {
        Value::Object(
            self.columns
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect(),
        )
    }

    /// Whether `record` encodes to exactly this row's submitted columns.
    pub fn matches(&self, record: &Value) -> bool {
        let Value::Object(object) = record else {
            return false;
        };
        self.columns.iter().all(|(name, value)| {
            object.get(name).map(csv_field).unwrap_or_default() == *value
        })
    }
}

/// Pair each failed row with the submitted record it was encoded from.
///
/// Rows are matched in order against the first record not already taken, so
/// identical records pair off one to one. `None` marks a row no submitted
/// record encodes to.
pub fn match_submitted<'a>(
    failures: &[FailedRecord],
    submitted: &'a [Value],
) -> Vec<Option<&'a Value>> {
    let mut taken = vec![false; submitted.len()];
    failures
        .iter()
        .map(|failure| {
            let index = (0..submitted.len())
                .find(|&i| !taken[i] && failure.matches(&submitted[i]))?;
            taken[index] = true;
            Some(&submitted[index])
        })
        .collect()
}

/// Parse a `failedResults` CSV.
///
/// Each row carries `sf__Id`, `sf__Error` and the submitted columns.
/// `sf__Error` reads `CODE:message`, optionally followed by `:fields --`.
pub fn parse_failed_results(csv_data: &str) -> Result<Vec<FailedRecord>> {
    if csv_data.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let headers = reader.headers()?.clone();

    let error_idx = headers.iter().position(|h| h == "sf__Error").ok_or_else(|| {
        Error::new(ErrorKind::Csv(
            "failed results have no sf__Error column".to_string(),
        ))
    })?;
    let id_idx = headers.iter().position(|h| h == "sf__Id");

    let mut failures = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (error_code, message, fields) = split_bulk_error(record.get(error_idx).unwrap_or(""));
        let id = id_idx
            .and_then(|i| record.get(i))
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let columns = headers
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.starts_with("sf__"))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        failures.push(FailedRecord {
            id,
            error_code,
            message,
            fields,
            columns,
        });
    }
    Ok(failures)
}

fn split_bulk_error(raw: &str) -> (String, String, Vec<String>) {
    let Some((code, rest)) = raw.split_once(':') else {
        return (raw.to_string(), String::new(), Vec::new());
    };

    if let Some((message, tail)) = rest.rsplit_once(':') {
        let tail = tail.trim_end();
        let fields = if tail == "--" {
            Some("")
        } else {
            tail.strip_suffix(" --")
        };
        if let Some(fields) = fields {
            let fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
            return (code.to_string(), message.to_string(), fields);
        }
    }
    (code.to_string(), rest.to_string(), Vec::new())
}
