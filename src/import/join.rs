use std::collections::HashMap;

use bigdecimal::BigDecimal;
use tracing::info;
use uuid::Uuid;

use super::shape::{CatalogRow, StockRow};

/// A catalog row matched with one stock row, keyed by a fresh surrogate id.
/// The source product id does not survive the join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub warehouse_id: String,
    pub id: String,
    pub barcode: String,
    pub reference: Option<String>,
    pub name: Option<String>,
    pub brand: String,
    pub sub_brand: String,
    pub tags: String,
    pub quantity: Option<String>,
    pub price: Option<BigDecimal>,
}

/// Fresh primary key for an `InventoryItem`.
pub fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Inner join on product id. Left order is kept; a key repeated on both
/// sides yields every pairing. Rows whose product id is missing never match.
pub fn join_catalog_stock<F>(
    catalog: Vec<CatalogRow>,
    stock: &[StockRow],
    warehouse_id: &str,
    mut next_id: F,
) -> Vec<JoinedRow>
where
    F: FnMut() -> String,
{
    let mut by_product: HashMap<i64, Vec<&StockRow>> = HashMap::with_capacity(stock.len());
    for s in stock {
        if let Some(pid) = s.product_id {
            by_product.entry(pid).or_default().push(s);
        }
    }

    let catalog_len = catalog.len();
    let mut out = Vec::with_capacity(catalog_len.min(stock.len()));
    for item in catalog {
        let Some(matches) = item.product_id.and_then(|pid| by_product.get(&pid)) else {
            continue;
        };
        for s in matches {
            out.push(JoinedRow {
                warehouse_id: warehouse_id.to_string(),
                id: next_id(),
                barcode: item.barcode.clone(),
                reference: item.reference.clone(),
                name: item.name.clone(),
                brand: item.brand.clone(),
                sub_brand: item.sub_brand.clone(),
                tags: item.tags.clone(),
                quantity: s.quantity.clone(),
                price: s.price.clone(),
            });
        }
    }
    info!(
        catalog = catalog_len,
        stock = stock.len(),
        joined = out.len(),
        "catalog joined with stock"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn item(id: Option<i64>, barcode: &str) -> CatalogRow {
        CatalogRow {
            product_id: id,
            barcode: barcode.to_string(),
            reference: None,
            name: Some(format!("item {barcode}")),
            brand: String::new(),
            sub_brand: String::new(),
            tags: "{}".into(),
        }
    }

    fn stock(id: Option<i64>, quantity: i32) -> StockRow {
        StockRow {
            product_id: id,
            quantity: Some(quantity.to_string()),
            price: None,
        }
    }

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("id-{n}")
        }
    }

    #[test]
    fn join_is_inner_on_both_sides() {
        let joined = join_catalog_stock(
            vec![item(Some(1), "a"), item(Some(2), "b")],
            &[stock(Some(2), 5), stock(Some(3), 9)],
            "wh-1",
            counter(),
        );
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].barcode, "b");
        assert_eq!(joined[0].quantity.as_deref(), Some("5"));
    }

    #[test]
    fn missing_keys_never_match() {
        let joined = join_catalog_stock(
            vec![item(None, "a")],
            &[stock(None, 1)],
            "wh-1",
            counter(),
        );
        assert!(joined.is_empty());
    }

    #[test]
    fn every_row_carries_the_warehouse_and_a_distinct_id() {
        let joined = join_catalog_stock(
            vec![item(Some(1), "a"), item(Some(2), "b"), item(Some(3), "c")],
            &[stock(Some(3), 1), stock(Some(1), 1), stock(Some(2), 1)],
            "wh-42",
            new_item_id,
        );
        assert_eq!(joined.len(), 3);
        assert!(joined.iter().all(|r| r.warehouse_id == "wh-42"));
        let ids: HashSet<&str> = joined.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn duplicate_keys_yield_every_pairing() {
        let joined = join_catalog_stock(
            vec![item(Some(1), "a")],
            &[stock(Some(1), 2), stock(Some(1), 3)],
            "wh-1",
            counter(),
        );
        let quantities: Vec<_> = joined.iter().map(|r| r.quantity.as_deref()).collect();
        assert_eq!(quantities, vec![Some("2"), Some("3")]);
        assert_ne!(joined[0].id, joined[1].id);
    }
}
