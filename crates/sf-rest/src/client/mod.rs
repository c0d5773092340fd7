//! Salesforce REST API client.
//!
//! Wraps `SalesforceClient` from `sf-client` with typed methods for sObject
//! CRUD, SOQL queries and sObject Collections.

use tally_sf_auth::Credentials;
use tally_sf_client::{ClientConfig, SalesforceClient};

use crate::error::Result;

mod collections;
mod crud;
mod query;

/// Salesforce REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use tally_sf_rest::SalesforceRestClient;
///
/// let client = SalesforceRestClient::new(instance_url, session_id)?;
/// let id = client.create("IntegrationLog__c", &json!({"Message__c": "started"})).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient {
    client: SalesforceClient,
}

impl SalesforceRestClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, access_token)?;
        Ok(Self { client })
    }

    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let client = SalesforceClient::with_config(instance_url, access_token, config)?;
        Ok(Self { client })
    }

    /// Build a client for a logged-in session.
    pub fn from_credentials(creds: &impl Credentials, config: ClientConfig) -> Result<Self> {
        let client = SalesforceClient::with_config(creds.instance_url(), creds.access_token(), config)?
            .with_api_version(creds.api_version());
        Ok(Self { client })
    }

    /// Wrap an existing client, sharing its connection pool.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self { client }
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
}
