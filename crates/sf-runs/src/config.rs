//! Configuration for the ledger and the purge.

use tally_sf_client::security::soql;

use crate::error::{Error, ErrorKind, Result};
use crate::schema::{self, Schema, MANAGED_NAMESPACE};

/// How a [`RunLedger`](crate::RunLedger) finds its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// `""` or the managed package prefix.
    pub namespace: String,
    /// Create the Integration record when no record has the requested name.
    pub create_missing_integration: bool,
    /// Launcher name stored on an Integration created on demand.
    pub launcher_name: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            namespace: MANAGED_NAMESPACE.to_string(),
            create_missing_integration: false,
            launcher_name: None,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_create_missing_integration(mut self, create: bool) -> Self {
        self.create_missing_integration = create;
        self
    }

    pub fn with_launcher_name(mut self, launcher: impl Into<String>) -> Self {
        self.launcher_name = Some(launcher.into());
        self
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.namespace.clone())
    }
}

/// What the aged-error purge deletes and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeConfig {
    pub namespace: String,
    /// Error rows created before the start of this many months ago go.
    pub older_than_months: u32,
    /// Rows read per query pass.
    pub query_limit: usize,
    /// Ids per bulk delete job.
    pub delete_batch_size: usize,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            namespace: MANAGED_NAMESPACE.to_string(),
            older_than_months: 4,
            query_limit: 100_000,
            delete_batch_size: 10_000,
        }
    }
}

impl PurgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_older_than_months(mut self, months: u32) -> Self {
        self.older_than_months = months;
        self
    }

    pub fn with_query_limit(mut self, limit: usize) -> Self {
        self.query_limit = limit;
        self
    }

    pub fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size;
        self
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.namespace.clone())
    }

    /// Reject settings that would build a bad query or never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.delete_batch_size == 0 || self.query_limit == 0 {
            return Err(Error::new(ErrorKind::Config(
                "query limit and delete batch size must be positive".to_string(),
            )));
        }
        let object = self.schema().name(schema::ERROR);
        if !soql::is_safe_sobject_name(&object) {
            return Err(Error::new(ErrorKind::Config(format!(
                "invalid namespace for {object}"
            ))));
        }
        Ok(())
    }

    /// The SOQL of one purge pass, oldest rows first.
    pub fn query(&self) -> String {
        let schema = self.schema();
        format!(
            "SELECT Id, CreatedDate, {} FROM {} WHERE CreatedDate < LAST_N_MONTHS:{} ORDER BY CreatedDate ASC LIMIT {}",
            schema.name(schema::ERROR_EXECUTION),
            schema.name(schema::ERROR),
            self.older_than_months,
            self.query_limit
        )
    }
}
