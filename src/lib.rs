//! # tally-sf
//!
//! Salesforce tooling for serverless integration jobs: run bookkeeping
//! (Execution, Log and Error records) and bulk maintenance of those records.
//!
//! ## Security
//!
//! - Passwords, security tokens and session ids are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Error messages built from response bodies are sanitized
//!
//! ## Crates
//!
//! - **tally-sf-client** - HTTP core: requests, responses, errors
//! - **tally-sf-auth** - Credentials and username/password login
//! - **tally-sf-rest** - sObject CRUD, SOQL query, sObject Collections
//! - **tally-sf-bulk** - Bulk API 2.0 exports and ingest jobs
//! - **tally-sf-runs** - Run ledger and aged error purge
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tally_sf::{LedgerConfig, LogLevel, LoginConfig, PasswordLogin, RunLedger, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::login(&PasswordLogin::new()?, &LoginConfig::from_env()?).await?;
//!     let mut ledger = RunLedger::start(
//!         session,
//!         &LedgerConfig::default().with_create_missing_integration(true),
//!         "orders-sync",
//!         &serde_json::json!({"start_date": "2021-10-12"}),
//!     )
//!     .await?;
//!
//!     ledger.log("synced", LogLevel::Info).await?;
//!     ledger.complete_execution(None).await?;
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use tally_sf_auth as auth;
#[cfg(feature = "bulk")]
pub use tally_sf_bulk as bulk;
#[cfg(feature = "client")]
pub use tally_sf_client as client;
#[cfg(feature = "rest")]
pub use tally_sf_rest as rest;
#[cfg(feature = "runs")]
pub use tally_sf_runs as runs;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use tally_sf_auth::{Credentials, LoginConfig, PasswordLogin, SalesforceCredentials};
#[cfg(feature = "bulk")]
pub use tally_sf_bulk::{BulkApiClient, BulkExportReader, ExportSource};
#[cfg(feature = "client")]
pub use tally_sf_client::{ClientConfig, SalesforceClient};
#[cfg(feature = "rest")]
pub use tally_sf_rest::SalesforceRestClient;
#[cfg(feature = "runs")]
pub use tally_sf_runs::{
    purge_aged_errors, LedgerConfig, LogLevel, PurgeConfig, PurgeSummary, RunLedger, Session,
};
