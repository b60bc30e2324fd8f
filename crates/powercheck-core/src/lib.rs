// Public fallible APIs in this crate share one concrete error contract
// (`PowercheckError`); per-function `# Errors` boilerplate would only repeat it.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type"
)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod query;
pub mod store;

pub use error::{PowercheckError, Result};
