use serde::Serialize;
use tracing::instrument;

use crate::collections::{CollectionRequest, CollectionResult, MAX_COLLECTION_SIZE};
use crate::error::{Error, ErrorKind, Result};

use super::crud::check_sobject;

impl super::SalesforceRestClient {
    /// Create up to 200 records in one request.
    ///
    /// Results come back in submission order. With `all_or_none` false a
    /// failing record does not roll back the others.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn create_multiple<T: Serialize>(
        &self,
        sobject: &str,
        records: &[T],
        all_or_none: bool,
    ) -> Result<Vec<CollectionResult>> {
        check_sobject(sobject)?;
        if records.len() > MAX_COLLECTION_SIZE {
            return Err(Error::new(ErrorKind::Salesforce {
                error_code: "EXCEEDED_ID_LIMIT".to_string(),
                message: format!(
                    "{} records given, at most {} allowed per request",
                    records.len(),
                    MAX_COLLECTION_SIZE
                ),
            }));
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let records = records
            .iter()
            .map(|r| -> Result<serde_json::Value> {
                let mut value = serde_json::to_value(r)?;
                if let serde_json::Value::Object(ref mut map) = value {
                    map.insert(
                        "attributes".to_string(),
                        serde_json::json!({"type": sobject}),
                    );
                }
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;

        let request = CollectionRequest {
            all_or_none,
            records,
        };
        self.client
            .rest_post("composite/sobjects", &request)
            .await
            .map_err(Into::into)
    }
}
