use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use tally_sf_client::security::{soql, url as url_security};

use crate::error::{Error, ErrorKind, Result};
use crate::sobject::CreateResult;

pub(super) fn check_sobject(sobject: &str) -> Result<()> {
    if soql::is_safe_sobject_name(sobject) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Salesforce {
            error_code: "INVALID_SOBJECT".to_string(),
            message: "Invalid SObject name".to_string(),
        }))
    }
}

fn check_id(id: &str) -> Result<()> {
    if url_security::is_valid_salesforce_id(id) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Salesforce {
            error_code: "INVALID_ID".to_string(),
            message: "Invalid Salesforce ID format".to_string(),
        }))
    }
}

impl super::SalesforceRestClient {
    /// Create a record and return its id.
    #[instrument(skip(self, record))]
    pub async fn create<T: Serialize>(&self, sobject: &str, record: &T) -> Result<String> {
        check_sobject(sobject)?;
        let path = format!("sobjects/{}", sobject);
        let result: CreateResult = self.client.rest_post(&path, record).await?;

        if result.success {
            Ok(result.id)
        } else {
            let (error_code, message) = match result.errors.first() {
                Some(first) => (first.status_code.clone(), first.message.clone()),
                None => ("CREATE_FAILED".to_string(), String::new()),
            };
            Err(Error::new(ErrorKind::Salesforce {
                error_code,
                message,
            }))
        }
    }

    /// Read a record, optionally limited to `fields`.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        sobject: &str,
        id: &str,
        fields: Option<&[&str]>,
    ) -> Result<T> {
        check_sobject(sobject)?;
        check_id(id)?;

        let path = match fields {
            Some(fields) => {
                if let Some(bad) = fields.iter().find(|f| !soql::is_safe_field_name(f)) {
                    return Err(Error::new(ErrorKind::Salesforce {
                        error_code: "INVALID_FIELD".to_string(),
                        message: format!("Invalid field name: {bad}"),
                    }));
                }
                format!("sobjects/{}/{}?fields={}", sobject, id, fields.join(","))
            }
            None => format!("sobjects/{}/{}", sobject, id),
        };
        self.client.rest_get(&path).await.map_err(Into::into)
    }

    /// Update fields of a record.
    #[instrument(skip(self, record))]
    pub async fn update<T: Serialize>(&self, sobject: &str, id: &str, record: &T) -> Result<()> {
        check_sobject(sobject)?;
        check_id(id)?;
        let path = format!("sobjects/{}/{}", sobject, id);
        self.client.rest_patch(&path, record).await.map_err(Into::into)
    }
}
