//! C2: feasibility checker.
//!
//! `can_take` is the single predicate every allocator (C4-C7) consults.
//! It is pure and never fails: it always returns a bool, even when the
//! input is degenerate (an order with no items, an agent with zero
//! capacity, ...).

use crate::error::InternalInvariantError;
use crate::grid::ZoneIndex;
use crate::model::{Agent, AgentKind, Catalog, Order};

/// Rule 6: cart coupling is checked against fleet *composition* (a
/// human whose own capacity alone suffices), not against any human's
/// currently free capacity — a conservative approximation, preserved
/// as-is rather than tightened.
pub fn can_take(agent: &Agent, order: &Order, catalog: &Catalog, zones: &ZoneIndex) -> bool {
    capacity_ok(agent, order)
        && intra_order_compatible(order, catalog)
        && zone_ok(agent, order, zones)
        && fragility_ok(agent, order, catalog)
        && per_item_weight_ok(agent, order, catalog)
        && cart_coupling_ok(agent, order, &[])
}

/// Same predicate, but rule 6 (cart coupling) is checked against the
/// actual fleet roster rather than assumed absent. Allocators that have
/// the fleet in scope should call this variant.
pub fn can_take_with_fleet(
    agent: &Agent,
    order: &Order,
    catalog: &Catalog,
    zones: &ZoneIndex,
    fleet: &[Agent],
) -> bool {
    capacity_ok(agent, order)
        && intra_order_compatible(order, catalog)
        && zone_ok(agent, order, zones)
        && fragility_ok(agent, order, catalog)
        && per_item_weight_ok(agent, order, catalog)
        && cart_coupling_ok(agent, order, fleet)
}

/// P1: post-allocation invariant check. Every allocator is expected to
/// uphold `used_weight <= capacity_weight` and `used_volume <=
/// capacity_volume` for every agent by construction; this is the
/// §7 `InternalInvariant` backstop a caller runs once after an
/// allocator returns, fatal to the call if it ever trips.
pub fn check_capacity_invariant(agents: &[Agent]) -> Result<(), InternalInvariantError> {
    for agent in agents {
        if agent.used_weight > agent.capacity_weight {
            return Err(InternalInvariantError::CapacityOverrun {
                agent_id: agent.id.clone(),
                used: agent.used_weight.round() as i64,
                capacity: agent.capacity_weight.round() as i64,
            });
        }
        if agent.used_volume > agent.capacity_volume {
            return Err(InternalInvariantError::CapacityOverrun {
                agent_id: agent.id.clone(),
                used: agent.used_volume.round() as i64,
                capacity: agent.capacity_volume.round() as i64,
            });
        }
    }
    Ok(())
}

fn capacity_ok(agent: &Agent, order: &Order) -> bool {
    agent.used_weight + order.total_weight <= agent.capacity_weight
        && agent.used_volume + order.total_volume <= agent.capacity_volume
}

/// Rule 2: no two distinct products referenced by the order may be
/// mutually incompatible, read symmetrically regardless of which side
/// of the pair recorded the edge.
fn intra_order_compatible(order: &Order, catalog: &Catalog) -> bool {
    let ids: Vec<&str> = order
        .items
        .iter()
        .map(|i| i.product_id.as_str())
        .collect();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if catalog.incompatible(ids[i], ids[j]) {
                return false;
            }
        }
    }
    true
}

/// Rule 3: unzoned cells are always permitted.
fn zone_ok(agent: &Agent, order: &Order, zones: &ZoneIndex) -> bool {
    order.unique_locations.iter().all(|loc| match zones.zone_of(loc) {
        Some(zone) => !agent.restrictions.forbidden_zones.contains(zone),
        None => true,
    })
}

/// Rule 4.
fn fragility_ok(agent: &Agent, order: &Order, catalog: &Catalog) -> bool {
    if !agent.restrictions.no_fragile {
        return true;
    }
    !order
        .items
        .iter()
        .filter_map(|i| catalog.get(&i.product_id))
        .any(|p| p.fragile)
}

/// Rule 5: `max_item_weight == 0` means no limit.
fn per_item_weight_ok(agent: &Agent, order: &Order, catalog: &Catalog) -> bool {
    let limit = agent.restrictions.max_item_weight;
    if limit <= 0.0 {
        return true;
    }
    order
        .items
        .iter()
        .filter_map(|i| catalog.get(&i.product_id))
        .all(|p| p.weight <= limit)
}

/// Rule 6: a cart requires at least one human in the fleet whose own
/// capacity alone suffices for the order.
fn cart_coupling_ok(agent: &Agent, order: &Order, fleet: &[Agent]) -> bool {
    if agent.kind != AgentKind::Cart {
        return true;
    }
    fleet.iter().any(|a| {
        a.kind == AgentKind::Human
            && order.total_weight <= a.capacity_weight
            && order.total_volume <= a.capacity_volume
    })
}
