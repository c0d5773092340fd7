//! Credentials trait and the session credentials produced by login.
//!
//! Debug output redacts the session id.

use crate::error::{Error, ErrorKind, Result};

/// An authenticated org session.
pub trait Credentials: Send + Sync {
    fn instance_url(&self) -> &str;

    /// Session id or OAuth access token, sent as a bearer token.
    fn access_token(&self) -> &str;

    /// API version (e.g., "62.0").
    fn api_version(&self) -> &str;

    fn is_valid(&self) -> bool {
        !self.instance_url().is_empty() && !self.access_token().is_empty()
    }
}

/// Instance URL, session token and API version for one org.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl SalesforceCredentials {
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_version: api_version.into(),
        }
    }

    /// Load an existing session from the environment.
    ///
    /// Required: `SF_INSTANCE_URL`, `SF_ACCESS_TOKEN`.
    /// Optional: `SF_API_VERSION` (default: the client's default version).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let instance_url = lookup("SF_INSTANCE_URL")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_INSTANCE_URL".to_string())))?;
        let access_token = lookup("SF_ACCESS_TOKEN")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_ACCESS_TOKEN".to_string())))?;
        let api_version = lookup("SF_API_VERSION")
            .unwrap_or_else(|| tally_sf_client::DEFAULT_API_VERSION.to_string());

        let creds = Self::new(instance_url, access_token, api_version);
        if !creds.is_valid() {
            return Err(Error::new(ErrorKind::InvalidCredentials(
                "instance URL and access token must not be empty".to_string(),
            )));
        }
        Ok(creds)
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// `{instance}/services/data/v{version}`
    pub fn rest_api_url(&self) -> String {
        format!("{}/services/data/v{}", self.instance_url, self.api_version)
    }

    /// `{instance}/services/data/v{version}/jobs`
    pub fn bulk_api_url(&self) -> String {
        format!("{}/services/data/v{}/jobs", self.instance_url, self.api_version)
    }
}

impl Credentials for SalesforceCredentials {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}
