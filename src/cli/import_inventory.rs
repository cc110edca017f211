use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::import::{ImportConfig, ImportJob, ImportReport, PreparedImport, TableOutcome};
use crate::util::db::Db;
use crate::util::env::{self as env_util, DATABASE_URL_KEY};

#[derive(Debug, Clone, Default)]
pub struct RunCommandConfig {
    /// Override for the catalog export path.
    pub catalog: Option<PathBuf>,
    /// Override for the stock/price export path.
    pub stock: Option<PathBuf>,
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreviewCommandConfig {
    pub catalog: Option<PathBuf>,
    pub stock: Option<PathBuf>,
    /// Warehouse id stamped on the previewed rows.
    pub warehouse_id: String,
    /// Sample rows printed per table.
    pub limit: usize,
}

impl Default for PreviewCommandConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            stock: None,
            warehouse_id: "preview-warehouse".to_string(),
            limit: 5,
        }
    }
}

fn import_config(catalog: Option<PathBuf>, stock: Option<PathBuf>) -> ImportConfig {
    let mut cfg = ImportConfig::from_env();
    if let Some(p) = catalog {
        cfg.catalog_path = p;
    }
    if let Some(p) = stock {
        cfg.stock_path = p;
    }
    cfg
}

/// Full import: connect, resolve the warehouse, load all three tables.
pub async fn run(cfg: RunCommandConfig) -> Result<ImportReport> {
    env_util::init_env();
    let database_url = match cfg.database_url {
        Some(url) => url,
        None => {
            env_util::preflight_check(
                "inventory-import",
                &[DATABASE_URL_KEY],
                &["USE_PREPARED", "IMPORT_INSERT_CHUNK"],
            )?;
            env_util::db_url()?
        }
    };

    let job = ImportJob::new(import_config(cfg.catalog, cfg.stock));
    info!(
        catalog = %job.config().catalog_path.display(),
        stock = %job.config().stock_path.display(),
        "starting import"
    );
    let db = Db::connect(&database_url)
        .await
        .context("Db::connect failed")?;
    let report = job.run(&db).await?;
    db.pool.close().await;
    Ok(report)
}

/// Offline dry run: everything up to the inserts, rendered as text.
pub fn preview(cfg: PreviewCommandConfig) -> Result<String> {
    let job = ImportJob::new(import_config(cfg.catalog, cfg.stock));
    let prepared = job.prepare(&cfg.warehouse_id)?;
    Ok(render_preview(&prepared, cfg.limit))
}

pub fn render_preview(prepared: &PreparedImport, limit: usize) -> String {
    let t = &prepared.tables;
    let mut out = String::new();
    writeln!(
        out,
        "catalog rows (with barcode): {}\nstock rows: {}\nquantity overrides applied: {}\njoined rows: {}",
        prepared.catalog_rows,
        prepared.stock_rows,
        prepared.overridden,
        t.len()
    )
    .ok();
    writeln!(out, "\nInventoryItem (first {limit}):").ok();
    for item in t.items.iter().take(limit) {
        writeln!(
            out,
            "  {} | {} | {} | {} | {} | {} | {}",
            item.id,
            item.barcode,
            item.name.as_deref().unwrap_or(""),
            item.brand,
            item.sub_brand,
            item.tags,
            item.price.as_ref().map(|p| p.to_string()).unwrap_or_default()
        )
        .ok();
    }
    writeln!(out, "\nInventoryStock (first {limit}):").ok();
    for s in t.stock.iter().take(limit) {
        writeln!(
            out,
            "  {} | {} | {}",
            s.warehouse_id,
            s.item_id,
            s.quantity.as_deref().unwrap_or("")
        )
        .ok();
    }
    if let Some(h) = t.history.first() {
        writeln!(out, "\nInventoryStockHistory date: {}", h.date).ok();
    }
    out
}

pub fn render_report(report: &ImportReport) -> String {
    let mut out = String::new();
    writeln!(out, "warehouse: {}", report.warehouse_id).ok();
    for t in &report.tables {
        match &t.outcome {
            TableOutcome::Committed { rows } => {
                writeln!(out, "  {:<22} committed   {rows} rows", t.table).ok();
            }
            TableOutcome::RolledBack { error } => {
                writeln!(out, "  {:<22} rolled back ({error})", t.table).ok();
            }
        }
    }
    if report.is_partial() {
        writeln!(out, "PARTIAL LOAD: some tables were not inserted").ok();
    }
    out
}
