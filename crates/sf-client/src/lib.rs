//! # tally-sf-client
//!
//! Core HTTP client infrastructure shared by the tally-sf crates.
//!
//! This crate provides:
//! - A request builder for JSON, CSV and SOAP bodies
//! - A response wrapper exposing Salesforce headers (`Sforce-Locator`, limits)
//! - Error mapping for Salesforce error payloads, with message sanitizing
//! - `SalesforceClient`, which pairs a session with typed JSON helpers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │        (sf-rest, sf-bulk, sf-runs, purge binary)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - Holds instance URL, session token, API version           │
//! │  - Typed JSON methods (get_json, post_json, patch_json)     │
//! │  - REST / Bulk 2.0 / SOAP URL builders                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SfHttpClient                             │
//! │  - One pooled reqwest client per session                    │
//! │  - Status mapping, one attempt per request                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_sf_client::SalesforceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tally_sf_client::Error> {
//!     let client = SalesforceClient::new("https://na1.salesforce.com", "00D...")?;
//!
//!     let limits: serde_json::Value = client.rest_get("limits").await?;
//!     println!("{limits}");
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod salesforce_client;
pub mod security;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder, CompressionConfig};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBody, RequestBuilder, RequestMethod};
pub use response::{sanitize_error_message, ApiUsage, Response};
pub use salesforce_client::{QueryResult, SalesforceClient};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("tally-sf/", env!("CARGO_PKG_VERSION"));
