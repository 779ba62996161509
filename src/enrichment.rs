//! C3: enrichment.
//!
//! Computes each order's derived fields (`total_weight`, `total_volume`,
//! `unique_locations`) as a pure function of `items` and the product
//! catalog. Re-enriching is idempotent: the fields are recomputed from
//! scratch, never accumulated.

use std::collections::HashSet;

use crate::error::InputError;
use crate::model::{Catalog, Order};

/// Enriches `order` in place. Fails with [`InputError::UnknownProduct`]
/// if any item references an id not present in `catalog`.
pub fn enrich_order(order: &mut Order, catalog: &Catalog) -> Result<(), InputError> {
    let mut total_weight = 0.0;
    let mut total_volume = 0.0;
    let mut seen = HashSet::new();
    let mut locations = Vec::new();

    for item in &order.items {
        let product = catalog
            .get(&item.product_id)
            .ok_or_else(|| InputError::UnknownProduct {
                product_id: item.product_id.clone(),
                order_id: order.id.clone(),
            })?;
        total_weight += product.weight * item.quantity as f64;
        total_volume += product.volume * item.quantity as f64;
        if seen.insert((product.location.x, product.location.y)) {
            locations.push(product.location);
        }
    }

    order.total_weight = total_weight;
    order.total_volume = total_volume;
    order.unique_locations = locations;
    Ok(())
}

/// Enriches every order in `orders`, aborting on the first unknown
/// product reference.
pub fn enrich_orders(orders: &mut [Order], catalog: &Catalog) -> Result<(), InputError> {
    for order in orders {
        enrich_order(order, catalog)?;
    }
    Ok(())
}
