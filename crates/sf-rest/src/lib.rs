//! # tally-sf-rest
//!
//! The slice of the Salesforce REST API the bookkeeping client needs.
//!
//! - **sObject CRUD** - create, read and update single records
//! - **sObject Collections** - create up to 200 records per call
//! - **SOQL Query** - first page or every page via `nextRecordsUrl`
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_sf_rest::SalesforceRestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tally_sf_rest::Error> {
//!     let client = SalesforceRestClient::new(
//!         "https://myorg.my.salesforce.com",
//!         "session_id_here",
//!     )?;
//!
//!     let id = client
//!         .create("Integration__c", &serde_json::json!({"Name": "orders-sync"}))
//!         .await?;
//!
//!     client
//!         .update("Integration__c", &id, &serde_json::json!({"LambdaName__c": "orders"}))
//!         .await?;
//!
//!     let rows: Vec<serde_json::Value> = client
//!         .query_all("SELECT Id, Name FROM Integration__c")
//!         .await?;
//!     println!("{} integrations", rows.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod collections;
mod error;
mod query;
mod sobject;

pub use client::SalesforceRestClient;
pub use collections::{CollectionRequest, CollectionResult, MAX_COLLECTION_SIZE};
pub use error::{Error, ErrorKind, Result};
pub use query::QueryResult;
pub use sobject::{CreateResult, SalesforceError};

pub use tally_sf_client::{ClientConfig, ClientConfigBuilder};
