//! Authenticated Salesforce client with typed JSON methods.
//!
//! `SalesforceClient` pairs an instance URL and session token with an
//! [`SfHttpClient`]. The API crates (`sf-rest`, `sf-bulk`) wrap it rather
//! than talking to reqwest directly.
//!
//! The session token is redacted in `Debug` output and skipped in tracing spans.

use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::RequestBuilder;
use crate::response::Response;
use crate::DEFAULT_API_VERSION;

/// Authenticated client for one org session.
///
/// # Example
///
/// ```rust,ignore
/// let client = SalesforceClient::new(instance_url, session_id)?;
/// let created: serde_json::Value = client
///     .rest_post("sobjects/Account", &serde_json::json!({"Name": "Acme"}))
///     .await?;
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(instance_url, access_token, ClientConfig::default())
    }

    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self::from_http(
            SfHttpClient::new(config)?,
            instance_url,
            access_token,
        ))
    }

    /// Reuse an existing connection pool, e.g. the one used to log in.
    pub fn from_http(
        http: SfHttpClient,
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Set the API version (e.g., "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn http(&self) -> &SfHttpClient {
        &self.http
    }

    /// Resolve a path against the instance URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.instance_url, path)
        } else {
            format!("{}/{}", self.instance_url, path)
        }
    }

    /// `rest_url("sobjects/Account")` -> `{instance}/services/data/v62.0/sobjects/Account`
    pub fn rest_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// `bulk_url("query/750xx")` -> `{instance}/services/data/v62.0/jobs/query/750xx`
    pub fn bulk_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/jobs/{}",
            self.instance_url, self.api_version, path
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.http.patch(url).bearer_auth(&self.access_token)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.http.put(url).bearer_auth(&self.access_token)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.http.delete(url).bearer_auth(&self.access_token)
    }

    /// Execute a request and return the raw response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        self.http.execute(request).await
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let request = self.get(&self.url(url));
        self.http.execute(request).await?.json().await
    }

    pub async fn rest_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json(&self.rest_url(path)).await
    }

    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.post(&self.url(url)).json(body)?;
        self.http.execute(request).await?.json().await
    }

    pub async fn rest_post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.post_json(&self.rest_url(path), body).await
    }

    /// PATCH with a JSON body. The platform answers 204 on success.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn patch_json<B: Serialize>(&self, url: &str, body: &B) -> Result<()> {
        let request = self.patch(&self.url(url)).json(body)?;
        self.http.execute(request).await?;
        Ok(())
    }

    pub async fn rest_patch<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.patch_json(&self.rest_url(path), body).await
    }

    /// Run a SOQL query and return the first page.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        let url = format!(
            "{}/services/data/v{}/query?q={}",
            self.instance_url,
            self.api_version,
            urlencoding::encode(soql)
        );
        self.get_json(&url).await
    }

    /// Run a SOQL query and follow `nextRecordsUrl` until done.
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let mut result: QueryResult<T> = self.query(soql).await?;
        let mut all_records = std::mem::take(&mut result.records);

        while let Some(next_url) = result.next_records_url.take() {
            result = self.get_json(&next_url).await?;
            all_records.append(&mut result.records);
        }

        Ok(all_records)
    }
}

/// One page of a REST SOQL query.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct QueryResult<T> {
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    pub done: bool,
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,
    pub records: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_building() {
        let client = SalesforceClient::new("https://na1.salesforce.com", "token123").unwrap();

        assert_eq!(
            client.url("/services/data"),
            "https://na1.salesforce.com/services/data"
        );
        assert_eq!(
            client.url("services/data"),
            "https://na1.salesforce.com/services/data"
        );
        assert_eq!(client.url("https://other.com/path"), "https://other.com/path");
        assert_eq!(
            client.rest_url("sobjects/Account"),
            "https://na1.salesforce.com/services/data/v62.0/sobjects/Account"
        );
        assert_eq!(
            client.bulk_url("query/750xx0000000001"),
            "https://na1.salesforce.com/services/data/v62.0/jobs/query/750xx0000000001"
        );
    }

    #[test]
    fn test_api_version_and_trailing_slash() {
        let client = SalesforceClient::new("https://na1.salesforce.com/", "token")
            .unwrap()
            .with_api_version("60.0");

        assert_eq!(client.instance_url(), "https://na1.salesforce.com");
        assert_eq!(
            client.rest_url("limits"),
            "https://na1.salesforce.com/services/data/v60.0/limits"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = SalesforceClient::new("https://na1.salesforce.com", "00Dsecret!abc").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("00Dsecret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_query_all_follows_next_records_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query"))
            .and(query_param("q", "SELECT Id FROM Account"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 3,
                "done": false,
                "nextRecordsUrl": "/services/data/v62.0/query/01gxx-2000",
                "records": [{"Id": "001A"}, {"Id": "001B"}]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query/01gxx-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 3,
                "done": true,
                "records": [{"Id": "001C"}]
            })))
            .mount(&mock_server)
            .await;

        let client = SalesforceClient::new(mock_server.uri(), "tok").unwrap();
        let records: Vec<serde_json::Value> =
            client.query_all("SELECT Id FROM Account").await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r["Id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["001A", "001B", "001C"]);
    }

    #[tokio::test]
    async fn test_patch_json_accepts_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/sobjects/Account/001A"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SalesforceClient::new(mock_server.uri(), "tok").unwrap();
        client
            .rest_patch("sobjects/Account/001A", &serde_json::json!({"Name": "Renamed"}))
            .await
            .unwrap();
    }
}
