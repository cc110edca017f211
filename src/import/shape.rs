//! Typing and cleanup of the raw CSV records.
use std::path::Path;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing::{debug, info};

use super::error::ImportError;
use super::source::{Loaded, RawCatalogRecord, RawStockRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub product_id: Option<i64>,
    pub barcode: String,
    pub reference: Option<String>,
    pub name: Option<String>,
    pub brand: String,
    pub sub_brand: String,
    /// Postgres array literal, e.g. `{cabelo}`.
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub product_id: Option<i64>,
    /// `qtd` as exported. Postgres casts it to int at insert time, so a bad
    /// value only fails the stock tables.
    pub quantity: Option<String>,
    pub price: Option<BigDecimal>,
}

/// Rename and clean catalog columns. Rows without a barcode are dropped.
pub fn shape_catalog(loaded: &Loaded<RawCatalogRecord>) -> Result<Vec<CatalogRow>, ImportError> {
    let mut out = Vec::with_capacity(loaded.records.len());
    let mut dropped = 0usize;
    for rec in &loaded.records {
        let Some(barcode) = rec.codigobarras.clone() else {
            dropped += 1;
            continue;
        };
        out.push(CatalogRow {
            product_id: parse_cell(&loaded.path, rec.line, "idproduto", rec.idproduto.as_deref())?,
            barcode,
            reference: rec.referencia.clone(),
            name: rec.descritivo.clone(),
            brand: rec.classe.clone().unwrap_or_default(),
            sub_brand: rec.classes.clone().unwrap_or_default(),
            tags: tags_literal(rec.classet.as_deref()),
        });
    }
    info!(kept = out.len(), dropped, "catalog shaped (rows without barcode dropped)");
    Ok(out)
}

pub fn shape_stock(loaded: &Loaded<RawStockRecord>) -> Result<Vec<StockRow>, ImportError> {
    let rows = loaded
        .records
        .iter()
        .map(|rec| {
            Ok(StockRow {
                product_id: parse_cell(&loaded.path, rec.line, "idproduto", rec.idproduto.as_deref())?,
                quantity: rec.qtd.clone(),
                price: parse_price(&loaded.path, rec.line, rec.custo.as_deref())?,
            })
        })
        .collect::<Result<Vec<_>, ImportError>>()?;
    debug!(rows = rows.len(), "stock shaped");
    Ok(rows)
}

/// `Cabelo` -> `{cabelo}`; missing -> `{}`.
pub fn tags_literal(category: Option<&str>) -> String {
    match category {
        Some(c) => format!("{{{}}}", c.to_lowercase()),
        None => "{}".to_string(),
    }
}

/// Cost cells use a comma as the decimal separator (`12,50`).
pub fn parse_comma_decimal(raw: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(raw.trim().replacen(',', ".", 1).as_str()).ok()
}

fn parse_price(path: &Path, line: u64, raw: Option<&str>) -> Result<Option<BigDecimal>, ImportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_comma_decimal(raw)
        .map(Some)
        .ok_or_else(|| invalid(path, line, "custo", "decimal", raw))
}

fn parse_cell<T: FromStr>(
    path: &Path,
    line: u64,
    column: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ImportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| invalid(path, line, column, "integer", raw))
}

fn invalid(path: &Path, line: u64, column: &'static str, expected: &'static str, raw: &str) -> ImportError {
    ImportError::InvalidValue {
        path: path.to_path_buf(),
        line,
        column,
        expected,
        raw: raw.to_string(),
    }
}
