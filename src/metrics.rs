//! C9: metrics evaluator.
//!
//! Groups an [`Assignment`]'s orders by agent, derives per-order
//! distance/time/cost/deadline-compliance using the tour planner's
//! timing model, and rolls up fleet totals. Pure; never fails.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Agent, Assignment, Location, Order};
use crate::tour;

#[derive(Debug, Clone, Serialize)]
pub struct OrderMetric {
    pub order_id: String,
    pub agent_id: String,
    pub distance: i64,
    pub time_min: f64,
    pub cost_euros: f64,
    pub deadline_ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetTotals {
    pub n_orders_assigned: usize,
    pub n_orders_unassigned: usize,
    pub total_distance: i64,
    pub total_time_min: f64,
    pub total_cost_euros: f64,
    pub n_late: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub orders: Vec<OrderMetric>,
    pub totals: FleetTotals,
    pub late_order_ids: Vec<String>,
}

/// Evaluates `assignment` against `orders`/`agents`, building each
/// order's individual tour (a singleton tour over just its own
/// locations) to derive distance/time/cost — the same timing model
/// the tour planner uses for a full agent tour, applied per order so
/// this module stays independent of whichever allocator produced the
/// assignment.
pub fn evaluate(
    assignment: &Assignment,
    orders: &[Order],
    agents: &[Agent],
    entry: Location,
) -> MetricsReport {
    let agents_by_id: BTreeMap<&str, &Agent> = agents.iter().map(|a| (a.id.as_str(), a)).collect();
    let orders_by_id: BTreeMap<&str, &Order> = orders.iter().map(|o| (o.id.as_str(), o)).collect();

    let mut rows = Vec::new();
    let mut late_ids = Vec::new();

    let mut order_ids: Vec<&String> = assignment.assigned.keys().collect();
    order_ids.sort();

    for order_id in order_ids {
        let Some(&order) = orders_by_id.get(order_id.as_str()) else {
            continue;
        };
        let agent_id = assignment.agent_of(order_id).unwrap_or_default();
        let Some(&agent) = agents_by_id.get(agent_id) else {
            continue;
        };

        let route = tour::plan_tour(
            entry,
            std::slice::from_ref(order),
            false,
            std::time::Duration::from_secs(1),
        );
        let distance = route.total_distance();
        let time_s = tour::total_time_seconds(&route, agent, std::slice::from_ref(order));
        let cost = tour::cost_euros(time_s, agent);
        let finish_minutes = order.received_time.minutes() as f64 + time_s / 60.0;
        let deadline_ok = finish_minutes <= order.deadline.minutes() as f64;
        if !deadline_ok {
            late_ids.push(order.id.clone());
        }

        rows.push(OrderMetric {
            order_id: order.id.clone(),
            agent_id: agent.id.clone(),
            distance,
            time_min: time_s / 60.0,
            cost_euros: cost,
            deadline_ok,
        });
    }

    let totals = FleetTotals {
        n_orders_assigned: assignment.n_assigned(),
        n_orders_unassigned: assignment.unassigned.len(),
        total_distance: rows.iter().map(|r| r.distance).sum(),
        total_time_min: rows.iter().map(|r| r.time_min).sum(),
        total_cost_euros: rows.iter().map(|r| r.cost_euros).sum(),
        n_late: late_ids.len(),
    };

    MetricsReport {
        orders: rows,
        totals,
        late_order_ids: late_ids,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AgentKind, OrderItem, Priority, Restriction, SimTime};

    fn agent(id: &str) -> Agent {
        Agent {
            id: id.into(),
            kind: AgentKind::Robot,
            capacity_weight: 100.0,
            capacity_volume: 100.0,
            speed: 1.0,
            cost_per_hour: 36.0,
            restrictions: Restriction::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        }
    }

    fn order(id: &str, received: &str, deadline: &str, loc: Location) -> Order {
        let mut o = Order::new(
            id,
            SimTime::parse(received).unwrap(),
            SimTime::parse(deadline).unwrap(),
            Priority::Standard,
            vec![OrderItem {
                product_id: "P1".into(),
                quantity: 1,
            }],
        );
        o.unique_locations = vec![loc];
        o
    }

    #[test]
    fn on_time_order_is_not_flagged_late() {
        let entry = Location::new(0, 0);
        let orders = vec![order("O1", "08:00", "20:00", Location::new(2, 0))];
        let agents = vec![agent("R1")];
        let mut assignment = Assignment::new();
        assignment.assign("O1", "R1");
        let report = evaluate(&assignment, &orders, &agents, entry);
        assert_eq!(report.totals.n_late, 0);
        assert!(report.orders[0].deadline_ok);
    }

    #[test]
    fn impossible_deadline_is_flagged_late() {
        let entry = Location::new(0, 0);
        let orders = vec![order("O1", "08:00", "08:01", Location::new(2, 0))];
        let agents = vec![agent("R1")];
        let mut assignment = Assignment::new();
        assignment.assign("O1", "R1");
        let report = evaluate(&assignment, &orders, &agents, entry);
        assert_eq!(report.totals.n_late, 1);
        assert_eq!(report.late_order_ids, vec!["O1".to_string()]);
    }

    #[test]
    fn totals_sum_the_per_order_rows() {
        let entry = Location::new(0, 0);
        let orders = vec![
            order("O1", "08:00", "20:00", Location::new(2, 0)),
            order("O2", "08:00", "20:00", Location::new(0, 3)),
        ];
        let agents = vec![agent("R1")];
        let mut assignment = Assignment::new();
        assignment.assign("O1", "R1");
        assignment.assign("O2", "R1");
        let report = evaluate(&assignment, &orders, &agents, entry);
        let manual: i64 = report.orders.iter().map(|r| r.distance).sum();
        assert_eq!(report.totals.total_distance, manual);
        assert_eq!(report.totals.n_orders_assigned, 2);
    }
}
