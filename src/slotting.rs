//! C11: slotting optimizer.
//!
//! Three ordered rules over a fresh `product_id -> Location` map,
//! grounded on `day5_storage.py`'s `compute_optimized_placement`, plus
//! a before/after simulator grounded on `day5_simulation.py`'s
//! `run_simulation`/`generate_test_orders` (seeded via `rand` for
//! reproducibility).

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::grid::ZoneIndex;
use crate::model::{Agent, Catalog, Location, Order, OrderItem, Priority, Product, SimTime, Warehouse};
use crate::patterns::product_frequency;

const FOOD_ZONE: &str = "C";
const CHEMICAL_ZONE: &str = "D";
const TOP_FREQUENCY_PERCENT: usize = 20;

/// Proposes `product_id -> Location` for every product currently
/// placed in `catalog`, following category placement, then
/// frequency-near-entry, then filling the remaining flexible cells by
/// distance. Affinity grouping is left best-effort, matching
/// the source: orders are not reshuffled within a pool to satisfy
/// co-ordering beyond what frequency placement already achieves.
pub fn compute_optimized_placement(
    orders: &[Order],
    catalog: &Catalog,
    warehouse: &Warehouse,
    zones: &ZoneIndex,
) -> BTreeMap<String, Location> {
    let freq = product_frequency(orders);

    let mut food_ids = Vec::new();
    let mut chemical_ids = Vec::new();
    let mut other_ids = Vec::new();
    for product in catalog.iter() {
        if product.is_food() {
            food_ids.push(product.id.clone());
        } else if product.is_chemical() {
            chemical_ids.push(product.id.clone());
        } else {
            other_ids.push(product.id.clone());
        }
    }
    food_ids.sort();
    chemical_ids.sort();

    let mut other_sorted = other_ids.clone();
    other_sorted.sort_by(|a, b| {
        freq.get(b)
            .unwrap_or(&0)
            .cmp(freq.get(a).unwrap_or(&0))
            .then_with(|| a.cmp(b))
    });
    let n_top = (other_sorted.len() * TOP_FREQUENCY_PERCENT / 100).max(1.min(other_sorted.len()));
    let top_frequent: BTreeSet<&str> = other_sorted[..n_top.min(other_sorted.len())]
        .iter()
        .map(String::as_str)
        .collect();

    let slots_c: Vec<Location> = warehouse.zones.get(FOOD_ZONE).cloned().unwrap_or_default();
    let slots_d: Vec<Location> = warehouse.zones.get(CHEMICAL_ZONE).cloned().unwrap_or_default();

    let all_locations: Vec<Location> = catalog.iter().map(|p| p.location).collect();
    let mut flexible: Vec<Location> = all_locations
        .iter()
        .filter(|loc| !matches!(zones.zone_of(loc), Some(FOOD_ZONE) | Some(CHEMICAL_ZONE)))
        .copied()
        .collect();
    dedup_by_coords(&mut flexible);
    flexible.sort_by_key(|loc| (warehouse.entry.manhattan(loc), loc.x, loc.y));

    let n_zone_a = (flexible.len() * TOP_FREQUENCY_PERCENT / 100).max(1.min(flexible.len()));
    let zone_a_slots: Vec<Location> = flexible[..n_zone_a.min(flexible.len())].to_vec();
    let rest_flexible: Vec<Location> = flexible[n_zone_a.min(flexible.len())..].to_vec();

    let mut placement = BTreeMap::new();
    let mut used: BTreeSet<(i64, i64)> = BTreeSet::new();

    let assign = |pid: &str,
                       pool: &[Location],
                       placement: &mut BTreeMap<String, Location>,
                       used: &mut BTreeSet<(i64, i64)>| {
        for loc in pool.iter().chain(rest_flexible.iter()) {
            let key = (loc.x, loc.y);
            if used.contains(&key) {
                continue;
            }
            placement.insert(pid.to_string(), *loc);
            used.insert(key);
            return;
        }
    };

    for pid in &food_ids {
        assign(pid, &slots_c, &mut placement, &mut used);
    }
    for pid in &chemical_ids {
        assign(pid, &slots_d, &mut placement, &mut used);
    }
    for pid in &other_sorted {
        if placement.contains_key(pid) {
            continue;
        }
        if top_frequent.contains(pid.as_str()) {
            assign(pid, &zone_a_slots, &mut placement, &mut used);
        } else {
            assign(pid, &rest_flexible, &mut placement, &mut used);
        }
    }

    placement
}

fn dedup_by_coords(locations: &mut Vec<Location>) {
    let mut seen = BTreeSet::new();
    locations.retain(|loc| seen.insert((loc.x, loc.y)));
}

/// Applies a placement map to `catalog`, returning a new catalog with
/// each product's location replaced (products absent from the map keep
/// their original location).
pub fn apply_placement(catalog: &Catalog, placement: &BTreeMap<String, Location>) -> Catalog {
    let products: Vec<Product> = catalog
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if let Some(&loc) = placement.get(&p.id) {
                p.location = loc;
            }
            p
        })
        .collect();
    Catalog::new(products)
}

/// Generates `n_orders` random orders by sampling from `catalog`'s
/// product ids, seeded for reproducibility.
pub fn generate_test_orders(catalog: &Catalog, n_orders: usize, seed: u64) -> Vec<Order> {
    let product_ids: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
    if product_ids.is_empty() {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut orders = Vec::with_capacity(n_orders);

    for i in 0..n_orders {
        let n_items = rng.random_range(1..=5usize).min(product_ids.len());
        let chosen: Vec<&str> = product_ids
            .choose_multiple(&mut rng, n_items)
            .copied()
            .collect();

        let mut items = Vec::new();
        let mut seen = BTreeSet::new();
        for pid in chosen {
            if !seen.insert(pid) {
                continue;
            }
            let qty = rng.random_range(1..=3i64);
            items.push(OrderItem {
                product_id: pid.to_string(),
                quantity: qty,
            });
        }
        if items.is_empty() {
            items.push(OrderItem {
                product_id: product_ids[0].to_string(),
                quantity: 1,
            });
        }

        orders.push(Order::new(
            format!("Sim_Order_{:03}", i + 1),
            SimTime::parse("09:00").unwrap(),
            SimTime::parse("12:00").unwrap(),
            Priority::Standard,
            items,
        ));
    }

    orders
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulationMetrics {
    pub n_orders: usize,
    pub distance_current: i64,
    pub distance_optimized: i64,
    pub reduction_percent: f64,
    pub n_assigned_current: usize,
    pub n_assigned_optimized: usize,
}

/// Runs the before/after simulator: enrich+allocate the same test
/// orders first under `catalog_current`, then `catalog_optimized`,
/// comparing total entry-to-location distance.
pub fn run_before_after(
    warehouse: &Warehouse,
    zones: &ZoneIndex,
    test_orders: &[Order],
    agents: &[Agent],
    catalog_current: &Catalog,
    catalog_optimized: &Catalog,
) -> SimulationMetrics {
    let mut orders_current = test_orders.to_vec();
    crate::enrichment::enrich_orders(&mut orders_current, catalog_current)
        .expect("test orders reference only catalog products");
    let (assignment_current, _) = crate::allocators::first_fit::allocate(
        &orders_current,
        agents.to_vec(),
        catalog_current,
        zones,
    );
    let distance_current: i64 = orders_current
        .iter()
        .map(|o| estimate_order_distance(warehouse.entry, o))
        .sum();

    let mut orders_optimized = test_orders.to_vec();
    crate::enrichment::enrich_orders(&mut orders_optimized, catalog_optimized)
        .expect("test orders reference only catalog products");
    let (assignment_optimized, _) = crate::allocators::first_fit::allocate(
        &orders_optimized,
        agents.to_vec(),
        catalog_optimized,
        zones,
    );
    let distance_optimized: i64 = orders_optimized
        .iter()
        .map(|o| estimate_order_distance(warehouse.entry, o))
        .sum();

    let reduction_percent = if distance_current > 0 {
        (distance_current - distance_optimized) as f64 / distance_current as f64 * 100.0
    } else {
        0.0
    };

    SimulationMetrics {
        n_orders: test_orders.len(),
        distance_current,
        distance_optimized,
        reduction_percent: (reduction_percent * 100.0).round() / 100.0,
        n_assigned_current: assignment_current.n_assigned(),
        n_assigned_optimized: assignment_optimized.n_assigned(),
    }
}

fn estimate_order_distance(entry: Location, order: &Order) -> i64 {
    order.unique_locations.iter().map(|loc| entry.manhattan(loc)).sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::AgentKind;

    fn product(id: &str, category: &str, loc: Location) -> Product {
        Product {
            id: id.into(),
            name: String::new(),
            category: category.into(),
            weight: 1.0,
            volume: 1.0,
            location: loc,
            fragile: false,
            incompatible_with: Default::default(),
        }
    }

    #[test]
    fn food_products_are_placed_in_zone_c() {
        let mut warehouse = Warehouse::new(10, 10, Location::new(0, 0));
        warehouse.add_zone("C", vec![Location::new(5, 5), Location::new(5, 6)]);
        let zones = ZoneIndex::build(&warehouse);
        let catalog = Catalog::new(vec![product("P1", "food", Location::new(1, 1))]);
        let placement = compute_optimized_placement(&[], &catalog, &warehouse, &zones);
        assert_eq!(placement.get("P1"), Some(&Location::new(5, 5)));
    }

    #[test]
    fn chemical_products_are_placed_in_zone_d() {
        let mut warehouse = Warehouse::new(10, 10, Location::new(0, 0));
        warehouse.add_zone("D", vec![Location::new(7, 7)]);
        let zones = ZoneIndex::build(&warehouse);
        let catalog = Catalog::new(vec![product("P1", "chemical", Location::new(1, 1))]);
        let placement = compute_optimized_placement(&[], &catalog, &warehouse, &zones);
        assert_eq!(placement.get("P1"), Some(&Location::new(7, 7)));
    }

    #[test]
    fn generate_test_orders_is_deterministic_for_a_given_seed() {
        let catalog = Catalog::new(vec![
            product("P1", "misc", Location::new(1, 1)),
            product("P2", "misc", Location::new(2, 2)),
            product("P3", "misc", Location::new(3, 3)),
        ]);
        let a = generate_test_orders(&catalog, 10, 42);
        let b = generate_test_orders(&catalog, 10, 42);
        assert_eq!(a.len(), b.len());
        for (oa, ob) in a.iter().zip(b.iter()) {
            assert_eq!(oa.items.len(), ob.items.len());
        }
    }

    #[test]
    fn before_after_simulation_reports_nonnegative_counts() {
        let mut warehouse = Warehouse::new(10, 10, Location::new(0, 0));
        warehouse.add_zone("C", vec![Location::new(1, 1)]);
        let zones = ZoneIndex::build(&warehouse);
        let catalog = Catalog::new(vec![product("P1", "misc", Location::new(5, 5))]);
        let optimized_catalog = Catalog::new(vec![product("P1", "misc", Location::new(1, 0))]);
        let agent = Agent {
            id: "R1".into(),
            kind: AgentKind::Robot,
            capacity_weight: 100.0,
            capacity_volume: 100.0,
            speed: 1.0,
            cost_per_hour: 10.0,
            restrictions: Default::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        };
        let orders = generate_test_orders(&catalog, 5, 1);
        let metrics = run_before_after(&warehouse, &zones, &orders, &[agent], &catalog, &optimized_catalog);
        assert_eq!(metrics.n_orders, 5);
        assert!(metrics.distance_optimized <= metrics.distance_current);
    }
}
