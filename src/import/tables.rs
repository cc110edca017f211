//! The three target tables and how their rows bind into a bulk INSERT.
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use sqlx::query_builder::Separated;
use sqlx::Postgres;

use super::join::JoinedRow;

/// A row type that maps onto one target table.
pub trait InsertRow {
    const TABLE: &'static str;
    /// Column names, in bind order.
    const COLUMNS: &'static [&'static str];

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub barcode: String,
    pub name: Option<String>,
    pub brand: String,
    pub sub_brand: String,
    pub tags: String,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryStock {
    pub warehouse_id: String,
    pub item_id: String,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryStockHistory {
    pub warehouse_id: String,
    pub item_id: String,
    pub quantity: Option<String>,
    pub date: NaiveDateTime,
}

impl InsertRow for InventoryItem {
    const TABLE: &'static str = "InventoryItem";
    const COLUMNS: &'static [&'static str] =
        &["id", "barcode", "name", "brand", "subBrand", "tags", "price"];

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id.clone())
            .push_bind(self.barcode.clone())
            .push_bind(self.name.clone())
            .push_bind(self.brand.clone())
            .push_bind(self.sub_brand.clone())
            .push_bind(self.tags.clone())
            // tags arrive as a `{a,b}` literal
            .push_unseparated("::text[]")
            .push_bind(self.price.clone());
    }
}

impl InsertRow for InventoryStock {
    const TABLE: &'static str = "InventoryStock";
    const COLUMNS: &'static [&'static str] = &["warehouseId", "itemId", "quantity"];

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.warehouse_id.clone())
            .push_bind(self.item_id.clone())
            .push_bind(self.quantity.clone())
            .push_unseparated("::int");
    }
}

impl InsertRow for InventoryStockHistory {
    const TABLE: &'static str = "InventoryStockHistory";
    const COLUMNS: &'static [&'static str] = &["warehouseId", "itemId", "quantity", "date"];

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.warehouse_id.clone())
            .push_bind(self.item_id.clone())
            .push_bind(self.quantity.clone())
            .push_unseparated("::int")
            .push_bind(self.date);
    }
}

/// The joined snapshot split per target table. Index `i` of each vector
/// describes the same product.
#[derive(Debug, Clone, Default)]
pub struct ImportTables {
    pub items: Vec<InventoryItem>,
    pub stock: Vec<InventoryStock>,
    pub history: Vec<InventoryStockHistory>,
}

impl ImportTables {
    pub fn split(joined: Vec<JoinedRow>, snapshot_at: NaiveDateTime) -> Self {
        let mut tables = Self {
            items: Vec::with_capacity(joined.len()),
            stock: Vec::with_capacity(joined.len()),
            history: Vec::with_capacity(joined.len()),
        };
        for row in joined {
            let stock = InventoryStock {
                warehouse_id: row.warehouse_id,
                item_id: row.id.clone(),
                quantity: row.quantity,
            };
            tables.history.push(InventoryStockHistory {
                warehouse_id: stock.warehouse_id.clone(),
                item_id: stock.item_id.clone(),
                quantity: stock.quantity.clone(),
                date: snapshot_at,
            });
            tables.stock.push(stock);
            tables.items.push(InventoryItem {
                id: row.id,
                barcode: row.barcode,
                name: row.name,
                brand: row.brand,
                sub_brand: row.sub_brand,
                tags: row.tags,
                price: row.price,
            });
        }
        tables
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
