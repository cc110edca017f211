//! Catalog + stock snapshot import into the inventory tables.
//!
//! `source` reads the CSVs, `shape` types and cleans them, `patch` applies
//! the one-off quantity correction, `join` pairs catalog with stock,
//! `tables` splits the result per target table and `job` drives it all.
pub mod config;
pub mod error;
pub mod job;
pub mod join;
pub mod patch;
pub mod shape;
pub mod source;
pub mod tables;

pub use config::ImportConfig;
pub use error::ImportError;
pub use job::{CleanedSources, ImportJob, ImportReport, PreparedImport, TableOutcome};
