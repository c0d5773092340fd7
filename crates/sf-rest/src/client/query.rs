use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::Result;
use crate::query::QueryResult;

impl super::SalesforceRestClient {
    /// Execute a SOQL query and return the first page.
    ///
    /// Values interpolated into the query must be escaped with
    /// `tally_sf_client::security::soql::escape_string`.
    #[instrument(skip(self))]
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        self.client.query(soql).await.map_err(Into::into)
    }

    /// Execute a SOQL query and collect every page.
    #[instrument(skip(self))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        self.client.query_all(soql).await.map_err(Into::into)
    }

    /// Fetch the page behind a `nextRecordsUrl`.
    #[instrument(skip(self))]
    pub async fn query_more<T: DeserializeOwned>(
        &self,
        next_records_url: &str,
    ) -> Result<QueryResult<T>> {
        self.client
            .get_json(next_records_url)
            .await
            .map_err(Into::into)
    }
}
