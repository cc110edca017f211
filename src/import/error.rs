use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{0} is not set; refusing to start the import")]
    MissingDatabaseUrl(&'static str),
    #[error("{}: cannot open: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: csv: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: required column `{column}` missing from header", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{}:{line}: column `{column}` has invalid {expected} value {raw:?}", path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: &'static str,
        expected: &'static str,
        raw: String,
    },
    #[error("no warehouse in database")]
    NoWarehouse,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}
