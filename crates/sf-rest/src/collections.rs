//! sObject Collections request and result types.

use crate::sobject::SalesforceError;
use serde::{Deserialize, Serialize};

/// Records accepted by one sObject Collections call.
pub const MAX_COLLECTION_SIZE: usize = 200;

/// Body of `POST composite/sobjects`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: Vec<serde_json::Value>,
}

/// Outcome for one record, in submission order.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SalesforceError>,
    pub created: Option<bool>,
}
