//! The one-shot catalog + stock import.
use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use super::config::ImportConfig;
use super::join::{join_catalog_stock, new_item_id};
use super::patch::apply_quantity_override;
use super::shape::{shape_catalog, shape_stock, CatalogRow, StockRow};
use super::source::{load_catalog, load_stock};
use super::tables::{
    ImportTables, InsertRow, InventoryItem, InventoryStock, InventoryStockHistory,
};
use crate::util::db::Db;

/// Both exports after Load, Shape and Patch; not yet joined.
#[derive(Debug, Clone)]
pub struct CleanedSources {
    pub catalog: Vec<CatalogRow>,
    pub stock: Vec<StockRow>,
    pub overridden: usize,
}

/// Everything the load needs, computed without touching the database.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub warehouse_id: String,
    pub tables: ImportTables,
    pub catalog_rows: usize,
    pub stock_rows: usize,
    pub overridden: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Committed { rows: u64 },
    RolledBack { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub warehouse_id: String,
    pub tables: Vec<TableReport>,
}

impl ImportReport {
    /// True when at least one table rolled back.
    pub fn is_partial(&self) -> bool {
        self.tables
            .iter()
            .any(|t| matches!(t.outcome, TableOutcome::RolledBack { .. }))
    }

    fn record<T: InsertRow>(&mut self, result: std::result::Result<u64, sqlx::Error>) {
        let outcome = match result {
            Ok(rows) => {
                info!(table = T::TABLE, rows, "committed");
                TableOutcome::Committed { rows }
            }
            Err(err) => {
                error!(table = T::TABLE, error = %err, "insert failed; table rolled back");
                TableOutcome::RolledBack {
                    error: err.to_string(),
                }
            }
        };
        self.tables.push(TableReport {
            table: T::TABLE,
            outcome,
        });
    }
}

pub struct ImportJob {
    config: ImportConfig,
}

impl ImportJob {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Load, shape and patch both exports. Fails on unreadable files, a
    /// missing column, a bad product id or a bad price.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<CleanedSources> {
        let cfg = &self.config;
        let catalog = load_catalog(cfg)?;
        let stock = load_stock(cfg)?;

        let catalog = shape_catalog(&catalog)?;
        let mut stock = shape_stock(&stock)?;
        let overridden = match &cfg.quantity_override {
            Some(fix) => apply_quantity_override(&mut stock, fix),
            None => 0,
        };
        Ok(CleanedSources {
            catalog,
            stock,
            overridden,
        })
    }

    /// Join and split. Each call mints new item ids.
    pub fn assemble(&self, sources: CleanedSources, warehouse_id: &str) -> PreparedImport {
        let catalog_rows = sources.catalog.len();
        let stock_rows = sources.stock.len();
        let joined = join_catalog_stock(sources.catalog, &sources.stock, warehouse_id, new_item_id);
        PreparedImport {
            warehouse_id: warehouse_id.to_string(),
            tables: ImportTables::split(joined, self.config.snapshot_at),
            catalog_rows,
            stock_rows,
            overridden: sources.overridden,
        }
    }

    /// `load` then `assemble` against a known warehouse id.
    pub fn prepare(&self, warehouse_id: &str) -> Result<PreparedImport> {
        Ok(self.assemble(self.load()?, warehouse_id))
    }

    /// Load the exports, resolve the warehouse, then insert each table in its
    /// own transaction. A failed table is rolled back and the next one still
    /// runs. CSV errors surface before the database is queried.
    pub async fn run(&self, db: &Db) -> Result<ImportReport> {
        let sources = self.load()?;
        let warehouse_id = db
            .fetch_warehouse_id()
            .await
            .context("warehouse lookup failed")?;
        let prepared = self.assemble(sources, &warehouse_id);
        info!(
            rows = prepared.tables.len(),
            warehouse_id = %warehouse_id,
            "snapshot prepared; inserting"
        );
        Ok(self.persist(db, &prepared).await)
    }

    pub async fn persist(&self, db: &Db, prepared: &PreparedImport) -> ImportReport {
        let tables = &prepared.tables;
        let mut report = ImportReport {
            warehouse_id: prepared.warehouse_id.clone(),
            tables: Vec::with_capacity(3),
        };

        report.record::<InventoryItem>(
            db.insert_table(&tables.items, self.chunk_for::<InventoryItem>())
                .await,
        );
        report.record::<InventoryStock>(
            db.insert_table(&tables.stock, self.chunk_for::<InventoryStock>())
                .await,
        );
        report.record::<InventoryStockHistory>(
            db.insert_table(&tables.history, self.chunk_for::<InventoryStockHistory>())
                .await,
        );

        if report.is_partial() {
            error!("import finished with rolled-back tables; the load is partial");
        }
        report
    }

    fn chunk_for<T: InsertRow>(&self) -> usize {
        self.config.rows_per_statement(T::COLUMNS.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::config::snapshot_timestamp;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    fn job() -> ImportJob {
        ImportJob::new(ImportConfig {
            catalog_path: fixture("20220922stock.csv"),
            stock_path: fixture("20220922prices.csv"),
            ..ImportConfig::default()
        })
    }

    #[test]
    fn fixture_snapshot_joins_inner_and_drops_blank_barcodes() {
        let prepared = job().prepare("wh-1").unwrap();
        let barcodes: Vec<&str> = prepared
            .tables
            .items
            .iter()
            .map(|i| i.barcode.as_str())
            .collect();
        // 104 has no barcode, 105 has no stock row, 900 has no catalog row
        assert_eq!(
            barcodes,
            vec!["5601111111111", "5602222222222", "0003333333333"]
        );
        assert_eq!(prepared.catalog_rows, 4);
        assert_eq!(prepared.stock_rows, 4);
    }

    #[test]
    fn product_238_always_gets_the_corrected_quantity() {
        let prepared = job().prepare("wh-1").unwrap();
        assert_eq!(prepared.overridden, 1);
        let tables = &prepared.tables;
        let idx = tables
            .items
            .iter()
            .position(|i| i.barcode == "5602222222222")
            .unwrap();
        assert_eq!(tables.stock[idx].quantity.as_deref(), Some("6"));
    }

    #[test]
    fn product_238_is_corrected_even_when_its_source_quantity_is_garbage() {
        let job = ImportJob::new(ImportConfig {
            stock_path: fixture("malformed_qtd_prices.csv"),
            ..job().config().clone()
        });
        let prepared = job.prepare("wh-1").unwrap();
        let t = &prepared.tables;
        let idx = t
            .items
            .iter()
            .position(|i| i.barcode == "5602222222222")
            .unwrap();
        assert_eq!(t.stock[idx].quantity.as_deref(), Some("6"));
        assert_eq!(t.history[idx].quantity.as_deref(), Some("6"));
    }

    #[test]
    fn malformed_quantities_do_not_abort_preparation() {
        let job = ImportJob::new(ImportConfig {
            stock_path: fixture("malformed_qtd_prices.csv"),
            ..job().config().clone()
        });
        let prepared = job.prepare("wh-1").unwrap();
        assert_eq!(prepared.tables.len(), 3);
        let quantities: Vec<_> = prepared
            .tables
            .stock
            .iter()
            .map(|s| s.quantity.as_deref())
            .collect();
        assert_eq!(quantities, vec![Some("3,5"), Some("6"), Some("abc")]);
    }

    #[test]
    fn load_leaves_warehouse_stamping_to_assemble() {
        let job = job();
        let sources = job.load().unwrap();
        assert_eq!(sources.overridden, 1);
        let prepared = job.assemble(sources, "wh-late");
        assert!(prepared
            .tables
            .stock
            .iter()
            .all(|s| s.warehouse_id == "wh-late"));
    }

    #[tokio::test]
    async fn csv_errors_surface_before_the_database_is_queried() {
        // lazy pool: any query would fail with a connection error instead
        let db = Db {
            pool: sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://nobody@127.0.0.1:1/none")
                .unwrap(),
        };
        let job = ImportJob::new(ImportConfig {
            catalog_path: fixture("missing.csv"),
            ..job().config().clone()
        });
        let err = job.run(&db).await.unwrap_err();
        assert!(err.to_string().contains("missing.csv"), "{err:#}");
    }

    #[test]
    fn override_can_be_switched_off() {
        let mut cfg = job().config().clone();
        cfg.quantity_override = None;
        let prepared = ImportJob::new(cfg).prepare("wh-1").unwrap();
        assert_eq!(prepared.overridden, 0);
        assert!(prepared
            .tables
            .stock
            .iter()
            .any(|s| s.quantity.as_deref() == Some("41")));
    }

    #[test]
    fn stock_and_history_reference_items_and_warehouse() {
        let prepared = job().prepare("wh-7").unwrap();
        let t = &prepared.tables;
        assert_eq!(t.items.len(), t.stock.len());
        assert_eq!(t.items.len(), t.history.len());
        for ((item, stock), hist) in t.items.iter().zip(&t.stock).zip(&t.history) {
            assert_eq!(stock.item_id, item.id);
            assert_eq!(stock.warehouse_id, "wh-7");
            assert_eq!(hist.item_id, stock.item_id);
            assert_eq!(hist.quantity, stock.quantity);
            assert_eq!(hist.date, snapshot_timestamp());
        }
    }

    #[test]
    fn tags_and_brands_are_cleaned() {
        let prepared = job().prepare("wh-1").unwrap();
        let first = &prepared.tables.items[0];
        assert_eq!(first.tags, "{cabelo}");
        assert_eq!(first.brand, "L'Oreal");
        let third = &prepared.tables.items[2];
        assert_eq!(third.tags, "{}");
        assert_eq!(third.sub_brand, "");
    }

    #[test]
    fn preparing_twice_mints_disjoint_ids() {
        let job = job();
        let first: HashSet<String> = job
            .prepare("wh-1")
            .unwrap()
            .tables
            .items
            .into_iter()
            .map(|i| i.id)
            .collect();
        let second: HashSet<String> = job
            .prepare("wh-1")
            .unwrap()
            .tables
            .items
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(first.len(), 3);
        assert!(first.is_disjoint(&second));
    }

    #[test]
    fn partial_report_is_flagged() {
        let report = ImportReport {
            warehouse_id: "wh-1".into(),
            tables: vec![
                TableReport {
                    table: "InventoryItem",
                    outcome: TableOutcome::Committed { rows: 3 },
                },
                TableReport {
                    table: "InventoryStock",
                    outcome: TableOutcome::RolledBack {
                        error: "duplicate key".into(),
                    },
                },
            ],
        };
        assert!(report.is_partial());
        assert!(!ImportReport::default().is_partial());
    }
}
