use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::util::env as env_util;

pub const DEFAULT_CATALOG_PATH: &str = "scripts/20220922stock.csv";
pub const DEFAULT_STOCK_PATH: &str = "scripts/20220922prices.csv";

/// Source cells carrying any of these are read as missing.
pub const NULL_MARKERS: &[&str] = &["...", "null"];

/// Postgres caps a statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;
const INSERT_CHUNK_DEFAULT: usize = 1_000;

/// One-off data correction: the 2022-09-22 export carries a wrong count for
/// product 238. Set `ImportConfig::quantity_override` to `None` to drop it.
pub const PRODUCT_238_QUANTITY_FIX: QuantityOverride = QuantityOverride {
    product_id: 238,
    quantity: 6,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityOverride {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Product catalog export (`idproduto;codigobarras;...`).
    pub catalog_path: PathBuf,
    /// Stock and cost export (`idproduto;qtd;custo`).
    pub stock_path: PathBuf,
    pub null_markers: Vec<String>,
    /// Timestamp stamped on every `InventoryStockHistory` row.
    pub snapshot_at: NaiveDateTime,
    pub quantity_override: Option<QuantityOverride>,
    /// Rows per INSERT statement; clamped by column count at insert time.
    pub insert_chunk: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            stock_path: PathBuf::from(DEFAULT_STOCK_PATH),
            null_markers: NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
            snapshot_at: snapshot_timestamp(),
            quantity_override: Some(PRODUCT_238_QUANTITY_FIX),
            insert_chunk: INSERT_CHUNK_DEFAULT,
        }
    }
}

impl ImportConfig {
    /// Defaults, with `IMPORT_INSERT_CHUNK` honoured when set.
    pub fn from_env() -> Self {
        Self {
            insert_chunk: env_util::env_parse("IMPORT_INSERT_CHUNK", INSERT_CHUNK_DEFAULT).max(1),
            ..Self::default()
        }
    }

    pub fn is_null_marker(&self, raw: &str) -> bool {
        raw.is_empty() || self.null_markers.iter().any(|m| m == raw)
    }

    /// Rows per statement for a table of `columns` width.
    pub fn rows_per_statement(&self, columns: usize) -> usize {
        let cap = MAX_BIND_PARAMS / columns.max(1);
        self.insert_chunk.clamp(1, cap)
    }
}

/// 2022-09-22 10:00:00, the moment both exports were taken.
pub fn snapshot_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 9, 22)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid snapshot constant")
}
