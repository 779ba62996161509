//! C4: First-Fit allocator.
//!
//! Deterministic, greedy, no external solver. Orders are sorted by
//! `received_time`; agents by kind priority (robot < human < cart),
//! stable within kind. For each order in turn, the first agent for
//! which `can_take` holds wins it.

use crate::feasibility::can_take_with_fleet;
use crate::grid::ZoneIndex;
use crate::model::{Agent, Assignment, Catalog, Order};

use super::classify_unassigned;

/// Runs First-Fit over `orders`/`agents`. `agents` is consumed and
/// returned with usage mutated so callers see the final state without
/// a second lookup pass.
pub fn allocate(
    orders: &[Order],
    mut agents: Vec<Agent>,
    catalog: &Catalog,
    zones: &ZoneIndex,
) -> (Assignment, Vec<Agent>) {
    let mut order_indices: Vec<usize> = (0..orders.len()).collect();
    order_indices.sort_by_key(|&i| orders[i].received_time.minutes());

    let mut agent_indices: Vec<usize> = (0..agents.len()).collect();
    agent_indices.sort_by_key(|&i| agents[i].kind.priority());

    let mut assignment = Assignment::new();

    for &oi in &order_indices {
        let order = &orders[oi];
        let fleet_snapshot = agents.clone();
        let mut picked = None;
        for &ai in &agent_indices {
            if can_take_with_fleet(&agents[ai], order, catalog, zones, &fleet_snapshot) {
                picked = Some(ai);
                break;
            }
        }
        match picked {
            Some(ai) => {
                agents[ai].assign(order.id.clone(), order.total_weight, order.total_volume);
                assignment.assign(order.id.clone(), agents[ai].id.clone());
            }
            None => {
                let reason = classify_unassigned(order, &fleet_snapshot, catalog, zones);
                assignment.mark_unassigned(order.id.clone(), reason);
            }
        }
    }

    (assignment, agents)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AgentKind, Location, OrderItem, Priority, Restriction, SimTime, Warehouse};
    use proptest::prelude::*;

    fn agent(id: &str, kind: AgentKind, cap: f64) -> Agent {
        Agent {
            id: id.into(),
            kind,
            capacity_weight: cap,
            capacity_volume: cap,
            speed: 1.0,
            cost_per_hour: 10.0,
            restrictions: Restriction::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        }
    }

    fn order(id: &str, received: &str, weight: f64) -> Order {
        let mut o = Order::new(
            id,
            SimTime::parse(received).unwrap(),
            SimTime::parse("23:00").unwrap(),
            Priority::Standard,
            vec![OrderItem {
                product_id: "P1".into(),
                quantity: 1,
            }],
        );
        o.total_weight = weight;
        o.total_volume = weight;
        o.unique_locations = vec![Location::new(1, 1)];
        o
    }

    #[test]
    fn assigns_to_first_feasible_agent_by_kind_priority() {
        let orders = vec![order("O1", "08:00", 5.0)];
        let agents = vec![
            agent("CART1", AgentKind::Cart, 100.0),
            agent("ROBOT1", AgentKind::Robot, 100.0),
        ];
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let catalog = Catalog::new(vec![]);
        let (assignment, _) = allocate(&orders, agents, &catalog, &zones);
        assert_eq!(assignment.agent_of("O1"), Some("ROBOT1"));
    }

    #[test]
    fn processes_orders_in_received_time_order() {
        let orders = vec![order("LATE", "10:00", 8.0), order("EARLY", "08:00", 8.0)];
        let agents = vec![agent("R1", AgentKind::Robot, 10.0)];
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let catalog = Catalog::new(vec![]);
        let (assignment, _) = allocate(&orders, agents, &catalog, &zones);
        // Only 10 capacity total: the earlier-received order wins it.
        assert_eq!(assignment.agent_of("EARLY"), Some("R1"));
        assert!(assignment.agent_of("LATE").is_none());
    }

    #[test]
    fn no_feasible_agent_is_recorded_unassigned() {
        let orders = vec![order("O1", "08:00", 500.0)];
        let agents = vec![agent("R1", AgentKind::Robot, 10.0)];
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let catalog = Catalog::new(vec![]);
        let (assignment, _) = allocate(&orders, agents, &catalog, &zones);
        assert!(assignment.agent_of("O1").is_none());
        assert!(assignment.unassigned.contains_key("O1"));
    }

    #[test]
    fn deterministic_given_identical_inputs() {
        let orders = vec![order("O1", "08:00", 5.0), order("O2", "09:00", 5.0)];
        let agents = vec![agent("R1", AgentKind::Robot, 100.0)];
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let catalog = Catalog::new(vec![]);
        let (a1, _) = allocate(&orders, agents.clone(), &catalog, &zones);
        let (a2, _) = allocate(&orders, agents, &catalog, &zones);
        assert_eq!(a1.assigned, a2.assigned);
    }

    proptest! {
        /// For any mix of order weights against a single agent's
        /// capacity, First-Fit never lets used capacity exceed it.
        #[test]
        fn used_capacity_never_exceeds_agent_capacity(
            capacity in 1.0_f64..200.0,
            weights in proptest::collection::vec(0.1_f64..50.0, 0..12),
        ) {
            let orders: Vec<Order> = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| order(&format!("O{i}"), "08:00", w))
                .collect();
            let agents = vec![agent("R1", AgentKind::Robot, capacity)];
            let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
            let catalog = Catalog::new(vec![]);
            let (_, agents) = allocate(&orders, agents, &catalog, &zones);
            prop_assert!(agents[0].used_weight <= agents[0].capacity_weight + 1e-9);
            prop_assert!(agents[0].used_volume <= agents[0].capacity_volume + 1e-9);
        }
    }
}
