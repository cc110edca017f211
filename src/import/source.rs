//! CSV loading for the two snapshot exports.
//!
//! Both files are `;`-delimited with a header row. Columns are looked up by
//! name, so extra or reordered columns are fine; a missing one is an error.
//! Cells are kept as text here and typed later in `shape`.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info};

use super::config::ImportConfig;
use super::error::ImportError;

pub const CATALOG_COLUMNS: [&str; 7] = [
    "idproduto",
    "codigobarras",
    "referencia",
    "descritivo",
    "classe",
    "classes",
    "classet",
];
pub const STOCK_COLUMNS: [&str; 3] = ["idproduto", "qtd", "custo"];

/// One catalog line, cells already null-normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCatalogRecord {
    pub line: u64,
    pub idproduto: Option<String>,
    pub codigobarras: Option<String>,
    pub referencia: Option<String>,
    pub descritivo: Option<String>,
    pub classe: Option<String>,
    pub classes: Option<String>,
    pub classet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStockRecord {
    pub line: u64,
    pub idproduto: Option<String>,
    pub qtd: Option<String>,
    pub custo: Option<String>,
}

/// A loaded file: where it came from plus its records.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub path: PathBuf,
    pub records: Vec<T>,
}

pub fn load_catalog(cfg: &ImportConfig) -> Result<Loaded<RawCatalogRecord>, ImportError> {
    let file = open(&cfg.catalog_path)?;
    read_catalog(&cfg.catalog_path, file, cfg)
}

pub fn load_stock(cfg: &ImportConfig) -> Result<Loaded<RawStockRecord>, ImportError> {
    let file = open(&cfg.stock_path)?;
    read_stock(&cfg.stock_path, file, cfg)
}

fn open(path: &Path) -> Result<BufReader<File>, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::with_capacity(1 << 20, file))
}

pub fn read_catalog<R: Read>(
    path: &Path,
    reader: R,
    cfg: &ImportConfig,
) -> Result<Loaded<RawCatalogRecord>, ImportError> {
    let records = read_rows(path, reader, &CATALOG_COLUMNS, cfg, |line, mut cells| {
        RawCatalogRecord {
            line,
            idproduto: cells[0].take(),
            codigobarras: cells[1].take(),
            referencia: cells[2].take(),
            descritivo: cells[3].take(),
            classe: cells[4].take(),
            classes: cells[5].take(),
            classet: cells[6].take(),
        }
    })?;
    info!(path = %path.display(), rows = records.len(), "catalog loaded");
    Ok(Loaded {
        path: path.to_path_buf(),
        records,
    })
}

pub fn read_stock<R: Read>(
    path: &Path,
    reader: R,
    cfg: &ImportConfig,
) -> Result<Loaded<RawStockRecord>, ImportError> {
    let records = read_rows(path, reader, &STOCK_COLUMNS, cfg, |line, mut cells| {
        RawStockRecord {
            line,
            idproduto: cells[0].take(),
            qtd: cells[1].take(),
            custo: cells[2].take(),
        }
    })?;
    info!(path = %path.display(), rows = records.len(), "stock loaded");
    Ok(Loaded {
        path: path.to_path_buf(),
        records,
    })
}

fn read_rows<R, T, F>(
    path: &Path,
    reader: R,
    columns: &[&'static str],
    cfg: &ImportConfig,
    mut build: F,
) -> Result<Vec<T>, ImportError>
where
    R: Read,
    F: FnMut(u64, Vec<Option<String>>) -> T,
{
    let csv_err = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers = rdr.byte_headers().map_err(csv_err)?.clone();
    let mut idx = Vec::with_capacity(columns.len());
    for &column in columns {
        let pos = headers
            .iter()
            .position(|h| header_name(h) == column)
            .ok_or_else(|| ImportError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })?;
        idx.push(pos);
    }
    debug!(path = %path.display(), ?idx, "column positions resolved");

    let mut rec = ByteRecord::new();
    let mut out = Vec::new();
    while rdr.read_byte_record(&mut rec).map_err(csv_err)? {
        let line = rec.position().map(|p| p.line()).unwrap_or_default();
        let cells = idx
            .iter()
            .map(|&i| {
                rec.get(i)
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .filter(|s| !cfg.is_null_marker(s))
            })
            .collect();
        out.push(build(line, cells));
    }
    Ok(out)
}

fn header_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_start_matches('\u{feff}')
        .trim()
        .to_string()
}
