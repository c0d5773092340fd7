//! SOQL query result type, shared with `sf-client`.

pub use tally_sf_client::QueryResult;
