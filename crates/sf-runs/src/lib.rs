//! # tally-sf-runs
//!
//! Bookkeeping for serverless integration jobs and maintenance of the
//! records it leaves behind.
//!
//! - [`RunLedger`] - one Execution record per run, with Log rows and one
//!   Error row per record the platform rejected
//! - [`purge_aged_errors`] - bulk deletes Error rows older than a few months
//!
//! Object and field names resolve through a [`Schema`], so the same code
//! works against unmanaged objects and the `KicksawEng__` package.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_sf_auth::{LoginConfig, PasswordLogin};
//! use tally_sf_runs::{LedgerConfig, LogLevel, RunLedger, Session};
//!
//! let session = Session::login(&PasswordLogin::new()?, &LoginConfig::from_env()?).await?;
//! let mut ledger = RunLedger::start(
//!     session,
//!     &LedgerConfig::default(),
//!     "orders-sync",
//!     &serde_json::json!({"start_date": "2021-10-12"}),
//! )
//! .await?;
//!
//! ledger.log("starting", LogLevel::Info).await?;
//! match run(&ledger).await {
//!     Ok(summary) => ledger.complete_execution(Some(&summary)).await?,
//!     Err(e) => ledger.handle_exception(&e.to_string()).await?,
//! }
//! ```

mod config;
mod error;
mod ledger;
mod payload;
mod purge;
pub mod schema;
mod session;

pub use config::{LedgerConfig, PurgeConfig};
pub use error::{Error, ErrorKind, Result};
pub use ledger::{LogLevel, RecordFailure, RunLedger};
pub use payload::to_payload_text;
pub use purge::{purge_aged_errors, PurgeSummary};
pub use schema::Schema;
pub use session::Session;
