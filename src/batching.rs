//! C7: batching module.
//!
//! Groups enriched orders into batches treated as meta-orders for
//! allocation. Greedy and deterministic, mirroring the original
//! `build_batches`: orders sorted by deadline, each placed into the
//! first existing batch whose four invariants all hold, else a new
//! singleton batch is opened.

use std::collections::BTreeMap;

use crate::model::{Assignment, Batch, Catalog, Order};

/// Builds batches from `orders`. `max_batch_weight`/`max_batch_volume`
/// are typically the fleet's maximum per-agent capacity so every batch
/// remains transportable by at least one agent.
pub fn build_batches(
    orders: &[Order],
    catalog: &Catalog,
    max_batch_weight: f64,
    max_batch_volume: f64,
    window_minutes: i64,
) -> Vec<Batch> {
    if orders.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by_key(|o| o.deadline.minutes());

    let mut batches: Vec<Batch> = Vec::new();

    for &order in &sorted {
        let mut placed = false;
        for batch in &mut batches {
            if batch.total_weight + order.total_weight > max_batch_weight {
                continue;
            }
            if batch.total_volume + order.total_volume > max_batch_volume {
                continue;
            }
            let min_deadline = batch
                .orders
                .iter()
                .map(|o| o.deadline.minutes())
                .min()
                .expect("a batch is never empty")
                .min(order.deadline.minutes());
            let max_deadline = batch
                .orders
                .iter()
                .map(|o| o.deadline.minutes())
                .max()
                .expect("a batch is never empty")
                .max(order.deadline.minutes());
            if max_deadline - min_deadline > window_minutes {
                continue;
            }
            if !jointly_compatible(&batch.orders, order, catalog) {
                continue;
            }

            batch.orders.push(order.clone());
            batch.total_weight += order.total_weight;
            batch.total_volume += order.total_volume;
            let mut seen: std::collections::HashSet<(i64, i64)> = batch
                .unique_locations
                .iter()
                .map(|l| (l.x, l.y))
                .collect();
            for loc in &order.unique_locations {
                if seen.insert((loc.x, loc.y)) {
                    batch.unique_locations.push(*loc);
                }
            }
            if order.deadline.minutes() < batch.deadline.minutes() {
                batch.deadline = order.deadline;
            }
            placed = true;
            break;
        }

        if !placed {
            batches.push(batch_from_orders(vec![order.clone()]));
        }
    }

    batches
}

fn batch_from_orders(orders: Vec<Order>) -> Batch {
    let total_weight = orders.iter().map(|o| o.total_weight).sum();
    let total_volume = orders.iter().map(|o| o.total_volume).sum();
    let mut seen = std::collections::HashSet::new();
    let mut locations = Vec::new();
    for order in &orders {
        for loc in &order.unique_locations {
            if seen.insert((loc.x, loc.y)) {
                locations.push(*loc);
            }
        }
    }
    let deadline = orders
        .iter()
        .min_by_key(|o| o.deadline.minutes())
        .expect("non-empty batch")
        .deadline;
    Batch {
        orders,
        total_weight,
        total_volume,
        unique_locations: locations,
        deadline,
    }
}

/// The union of products across the batch-so-far plus the candidate
/// order must be jointly compatible, using the same product
/// compatibility rule as a single order's own items.
fn jointly_compatible(batch_orders: &[Order], candidate: &Order, catalog: &Catalog) -> bool {
    let mut ids: Vec<&str> = batch_orders
        .iter()
        .flat_map(|o| o.items.iter().map(|i| i.product_id.as_str()))
        .collect();
    ids.extend(candidate.items.iter().map(|i| i.product_id.as_str()));
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if catalog.incompatible(ids[i], ids[j]) {
                return false;
            }
        }
    }
    true
}

/// Expands a `batch index -> agent id` map into an `order id -> agent
/// id` assignment by propagation.
pub fn batches_to_assignment(batches: &[Batch], batch_assignment: &BTreeMap<usize, String>) -> Assignment {
    let mut assignment = Assignment::new();
    for (idx, batch) in batches.iter().enumerate() {
        if let Some(agent_id) = batch_assignment.get(&idx) {
            for order in &batch.orders {
                assignment.assign(order.id.clone(), agent_id.clone());
            }
        }
    }
    assignment
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Location, OrderItem, Priority, Product, SimTime};

    fn order(id: &str, deadline: &str, weight: f64, loc: Location) -> Order {
        let mut o = Order::new(
            id,
            SimTime::parse("08:00").unwrap(),
            SimTime::parse(deadline).unwrap(),
            Priority::Standard,
            vec![OrderItem {
                product_id: "P1".into(),
                quantity: 1,
            }],
        );
        o.total_weight = weight;
        o.total_volume = weight;
        o.unique_locations = vec![loc];
        o
    }

    #[test]
    fn orders_within_window_and_capacity_merge_into_one_batch() {
        let orders = vec![
            order("O1", "10:00", 5.0, Location::new(1, 1)),
            order("O2", "10:30", 5.0, Location::new(1, 2)),
        ];
        let catalog = Catalog::new(vec![]);
        let batches = build_batches(&orders, &catalog, 100.0, 100.0, 60);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].orders.len(), 2);
    }

    #[test]
    fn capacity_overflow_opens_a_new_batch() {
        let orders = vec![
            order("O1", "10:00", 8.0, Location::new(1, 1)),
            order("O2", "10:05", 8.0, Location::new(1, 2)),
        ];
        let catalog = Catalog::new(vec![]);
        let batches = build_batches(&orders, &catalog, 10.0, 10.0, 60);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn deadline_window_violation_opens_a_new_batch() {
        let orders = vec![
            order("O1", "09:00", 5.0, Location::new(1, 1)),
            order("O2", "11:00", 5.0, Location::new(1, 2)),
        ];
        let catalog = Catalog::new(vec![]);
        let batches = build_batches(&orders, &catalog, 100.0, 100.0, 60);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn incompatible_products_stay_in_separate_batches() {
        let catalog = Catalog::new(vec![
            Product {
                id: "P1".into(),
                name: String::new(),
                category: String::new(),
                weight: 1.0,
                volume: 1.0,
                location: Location::new(1, 1),
                fragile: false,
                incompatible_with: ["P2".into()].into_iter().collect(),
            },
            Product {
                id: "P2".into(),
                name: String::new(),
                category: String::new(),
                weight: 1.0,
                volume: 1.0,
                location: Location::new(2, 2),
                fragile: false,
                incompatible_with: Default::default(),
            },
        ]);
        let mut o1 = order("O1", "10:00", 5.0, Location::new(1, 1));
        let mut o2 = order("O2", "10:00", 5.0, Location::new(2, 2));
        o2.items = vec![OrderItem {
            product_id: "P2".into(),
            quantity: 1,
        }];
        o1.items = vec![OrderItem {
            product_id: "P1".into(),
            quantity: 1,
        }];
        let batches = build_batches(&[o1, o2], &catalog, 100.0, 100.0, 60);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn batches_to_assignment_propagates_to_every_order_in_the_batch() {
        let orders = vec![
            order("O1", "10:00", 5.0, Location::new(1, 1)),
            order("O2", "10:05", 5.0, Location::new(1, 2)),
        ];
        let catalog = Catalog::new(vec![]);
        let batches = build_batches(&orders, &catalog, 100.0, 100.0, 60);
        let mut batch_assignment = BTreeMap::new();
        batch_assignment.insert(0, "R1".to_string());
        let assignment = batches_to_assignment(&batches, &batch_assignment);
        assert_eq!(assignment.agent_of("O1"), Some("R1"));
        assert_eq!(assignment.agent_of("O2"), Some("R1"));
    }
}
