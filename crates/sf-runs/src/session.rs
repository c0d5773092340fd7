//! One logged-in org session shared by the REST and Bulk clients.

use std::time::Duration;

use tally_sf_auth::{Credentials, LoginConfig, PasswordLogin};
use tally_sf_bulk::BulkApiClient;
use tally_sf_client::{ClientConfig, SalesforceClient};
use tally_sf_rest::SalesforceRestClient;
use tracing::{info, instrument};

use crate::error::Result;

/// REST and Bulk clients over a single connection pool.
#[derive(Debug, Clone)]
pub struct Session {
    rest: SalesforceRestClient,
    bulk: BulkApiClient,
}

impl Session {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client(SalesforceClient::new(
            instance_url,
            access_token,
        )?))
    }

    pub fn from_client(client: SalesforceClient) -> Self {
        Self {
            rest: SalesforceRestClient::from_client(client.clone()),
            bulk: BulkApiClient::from_client(client),
        }
    }

    pub fn from_credentials(creds: &impl Credentials, config: ClientConfig) -> Result<Self> {
        let client =
            SalesforceClient::with_config(creds.instance_url(), creds.access_token(), config)?
                .with_api_version(creds.api_version());
        Ok(Self::from_client(client))
    }

    /// Log in with username, password and security token.
    ///
    /// The session keeps using the connection pool of `login`.
    #[instrument(skip_all, fields(domain = %config.domain))]
    pub async fn login(login: &PasswordLogin, config: &LoginConfig) -> Result<Self> {
        let creds = login.login(config).await?;
        info!(instance_url = %creds.instance_url(), "logged in");
        let client = SalesforceClient::from_http(
            login.http().clone(),
            creds.instance_url(),
            creds.access_token(),
        )
        .with_api_version(creds.api_version());
        Ok(Self::from_client(client))
    }

    /// Poll bulk jobs at `interval` instead of the default.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.bulk = self.bulk.with_poll_interval(interval);
        self
    }

    pub fn rest(&self) -> &SalesforceRestClient {
        &self.rest
    }

    pub fn bulk(&self) -> &BulkApiClient {
        &self.bulk
    }
}
