use std::str::FromStr;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgConnection, PgPool, QueryBuilder,
};
use tracing::{info, instrument, warn};

use crate::import::error::ImportError;
use crate::import::tables::InsertRow;
use crate::util::env as env_util;

/// Source of the warehouse id stamped on every stock row.
pub const WAREHOUSE_QUERY: &str = r#"SELECT id FROM public."Warehouse""#;

/// Single-connection handle. The import runs its lookup and inserts serially.
#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, ImportError> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !env_util::env_flag("USE_PREPARED", false) {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// First row of `Warehouse`; the import assumes exactly one exists.
    #[instrument(skip(self))]
    pub async fn fetch_warehouse_id(&self) -> Result<String, ImportError> {
        let id: Option<String> = sqlx::query_scalar(WAREHOUSE_QUERY)
            .persistent(false)
            .fetch_optional(&self.pool)
            .await?;
        let id = require_warehouse(id)?;
        info!(warehouse_id = %id, "warehouse resolved");
        Ok(id)
    }

    /// Insert every row of one table inside its own transaction.
    ///
    /// Rows go out in multi-row INSERT statements of at most
    /// `rows_per_statement` rows. Any failure rolls the whole table back and
    /// is returned to the caller; nothing is retried.
    #[instrument(skip(self, rows), fields(table = T::TABLE, row_count = rows.len()))]
    pub async fn insert_table<T: InsertRow>(
        &self,
        rows: &[T],
        rows_per_statement: usize,
    ) -> Result<u64, sqlx::Error> {
        info!("{}", statement_template(T::TABLE, T::COLUMNS));
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        match insert_chunks(&mut tx, rows, rows_per_statement).await {
            Ok(inserted) => {
                tx.commit().await?;
                Ok(inserted)
            }
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn insert_chunks<T: InsertRow>(
    conn: &mut PgConnection,
    rows: &[T],
    rows_per_statement: usize,
) -> Result<u64, sqlx::Error> {
    let prefix = insert_prefix(T::TABLE, T::COLUMNS);
    let mut inserted = 0u64;
    for chunk in rows.chunks(rows_per_statement.max(1)) {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(&prefix);
        qb.push_values(chunk, |mut b, r| r.push_binds(&mut b));
        let res = qb.build().persistent(false).execute(&mut *conn).await?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}

fn require_warehouse(id: Option<String>) -> Result<String, ImportError> {
    id.ok_or(ImportError::NoWarehouse)
}

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `INSERT INTO "T" ("a","b") `; `push_values` appends the VALUES list.
pub fn insert_prefix(table: &str, columns: &[&str]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("INSERT INTO {} ({}) ", quote_ident(table), cols.join(","))
}

/// Single-row form of the statement, for logs.
pub fn statement_template(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "{}VALUES({});",
        insert_prefix(table, columns),
        placeholders.join(",")
    )
}
