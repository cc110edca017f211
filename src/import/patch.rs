use tracing::{info, warn};

use super::config::QuantityOverride;
use super::shape::StockRow;

/// Force `quantity` on every stock row for the override's product.
/// Returns how many rows were touched.
pub fn apply_quantity_override(rows: &mut [StockRow], fix: &QuantityOverride) -> usize {
    let mut touched = 0;
    for row in rows
        .iter_mut()
        .filter(|r| r.product_id == Some(fix.product_id))
    {
        info!(
            product_id = fix.product_id,
            from = ?row.quantity,
            to = fix.quantity,
            "quantity override applied"
        );
        row.quantity = Some(fix.quantity.to_string());
        touched += 1;
    }
    if touched == 0 {
        warn!(product_id = fix.product_id, "quantity override matched no stock row");
    }
    touched
}
