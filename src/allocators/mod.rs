//! C4-C7: allocators. Each takes owned, freshly-cloned agents — an
//! allocator always works on a fresh clone, never the caller's
//! original list — and returns an [`Assignment`] plus the mutated
//! clones so the caller can inspect final usage.

pub mod cp;
pub mod cpsat;
pub mod first_fit;

use crate::model::{Agent, Order};

/// Why an order has no feasible agent in the *entire* fleet, used to
/// pick between [`UnassignedReason::IncompatibleProducts`] and
/// [`UnassignedReason::Capacity`]/[`UnassignedReason::Restriction`]/
/// [`UnassignedReason::NoFeasibleAgent`].
///
/// [`UnassignedReason::IncompatibleProducts`]: crate::model::UnassignedReason::IncompatibleProducts
/// [`UnassignedReason::Capacity`]: crate::model::UnassignedReason::Capacity
/// [`UnassignedReason::Restriction`]: crate::model::UnassignedReason::Restriction
/// [`UnassignedReason::NoFeasibleAgent`]: crate::model::UnassignedReason::NoFeasibleAgent
pub(crate) fn classify_unassigned(
    order: &Order,
    fleet: &[Agent],
    catalog: &crate::model::Catalog,
    zones: &crate::grid::ZoneIndex,
) -> crate::model::UnassignedReason {
    use crate::feasibility::can_take_with_fleet;
    use crate::model::UnassignedReason;

    if !intra_order_compatible(order, catalog) {
        return UnassignedReason::IncompatibleProducts;
    }

    let any_capacity_room = fleet.iter().any(|a| {
        a.used_weight + order.total_weight <= a.capacity_weight
            && a.used_volume + order.total_volume <= a.capacity_volume
    });
    if !any_capacity_room {
        return UnassignedReason::Capacity;
    }

    let any_restriction_clear = fleet
        .iter()
        .any(|a| can_take_with_fleet(a, order, catalog, zones, fleet) || {
            // even agents that fail on capacity alone still count as
            // "restriction-clear" for this classification; re-check
            // ignoring capacity by zeroing usage on a scratch clone.
            let mut scratch = a.clone();
            scratch.used_weight = 0.0;
            scratch.used_volume = 0.0;
            can_take_with_fleet(&scratch, order, catalog, zones, fleet)
        });
    if !any_restriction_clear {
        return UnassignedReason::Restriction;
    }

    UnassignedReason::NoFeasibleAgent
}

fn intra_order_compatible(order: &Order, catalog: &crate::model::Catalog) -> bool {
    let ids: Vec<&str> = order.items.iter().map(|i| i.product_id.as_str()).collect();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if catalog.incompatible(ids[i], ids[j]) {
                return false;
            }
        }
    }
    true
}
