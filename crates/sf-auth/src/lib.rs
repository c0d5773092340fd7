//! # tally-sf-auth
//!
//! Session credentials and login for the tally-sf crates.
//!
//! ## Security
//!
//! - Passwords, security tokens and session ids are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Login faults carry the platform's fault code and message, never the request
//!
//! ## Example
//!
//! ```rust,ignore
//! use tally_sf_auth::{LoginConfig, PasswordLogin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tally_sf_auth::Error> {
//!     let config = LoginConfig::from_env()?;
//!     let creds = PasswordLogin::new()?.login(&config).await?;
//!     println!("logged in to {}", creds.instance_url());
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;
mod login;

pub use credentials::{Credentials, SalesforceCredentials};
pub use error::{Error, ErrorKind, Result};
pub use login::{LoginConfig, PasswordLogin, DEFAULT_LOGIN_DOMAIN};
