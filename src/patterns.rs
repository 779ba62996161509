//! C10: pattern analyzer, plus the supplemented fleet-mix report.
//!
//! `run_pattern_analysis` computes frequency/co-ordering/zone-visit
//! counters. `fleet_mix_report` adds a robot/human/cart share breakdown
//! and textual recommendations alongside it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CONFIG;
use crate::grid::ZoneIndex;
use crate::model::{Agent, AgentKind, Assignment, Catalog, Order};

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub product_frequency: BTreeMap<String, u32>,
    pub top_products: Vec<(String, u32)>,
    pub co_ordered_pairs: BTreeMap<(String, String), u32>,
    pub top_co_ordered_pairs: Vec<((String, String), u32)>,
    pub zone_visits: BTreeMap<String, u32>,
    pub n_orders: usize,
}

pub fn product_frequency(orders: &[Order]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for order in orders {
        let seen: std::collections::BTreeSet<&str> =
            order.items.iter().map(|i| i.product_id.as_str()).collect();
        for pid in seen {
            *counts.entry(pid.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn top_products(orders: &[Order], n: usize) -> Vec<(String, u32)> {
    top_n(product_frequency(orders), n)
}

pub fn co_ordered_pairs(orders: &[Order]) -> BTreeMap<(String, String), u32> {
    let mut counts = BTreeMap::new();
    for order in orders {
        let mut pids: Vec<&str> = order
            .items
            .iter()
            .map(|i| i.product_id.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        pids.sort();
        for i in 0..pids.len() {
            for j in (i + 1)..pids.len() {
                *counts
                    .entry((pids[i].to_string(), pids[j].to_string()))
                    .or_insert(0) += 1;
            }
        }
    }
    counts
}

pub fn top_co_ordered_pairs(orders: &[Order], n: usize) -> Vec<((String, String), u32)> {
    top_n(co_ordered_pairs(orders), n)
}

pub fn zone_visits(orders: &[Order], catalog: &Catalog, zones: &ZoneIndex) -> BTreeMap<String, u32> {
    let _ = catalog;
    let mut counts = BTreeMap::new();
    for order in orders {
        let mut seen = std::collections::BTreeSet::new();
        for loc in &order.unique_locations {
            if let Some(zone) = zones.zone_of(loc) {
                seen.insert(zone.to_string());
            }
        }
        for zone in seen {
            *counts.entry(zone).or_insert(0) += 1;
        }
    }
    counts
}

fn top_n<K: Ord + Clone>(counts: BTreeMap<K, u32>, n: usize) -> Vec<(K, u32)> {
    let mut items: Vec<(K, u32)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(n);
    items
}

pub fn run_pattern_analysis(orders: &[Order], catalog: &Catalog, zones: &ZoneIndex) -> PatternReport {
    let top_n_size = CONFIG.pattern_top_n;
    PatternReport {
        product_frequency: product_frequency(orders),
        top_products: top_products(orders, top_n_size),
        co_ordered_pairs: co_ordered_pairs(orders),
        top_co_ordered_pairs: top_co_ordered_pairs(orders, top_n_size),
        zone_visits: zone_visits(orders, catalog, zones),
        n_orders: orders.len(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentTypeStats {
    pub n_orders: usize,
    pub agent_ids: Vec<String>,
    pub share_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetMixReport {
    pub stats_by_kind: BTreeMap<AgentKind, AgentTypeStats>,
    pub total_orders: usize,
    pub total_assigned: usize,
    pub recommendations: Vec<String>,
}

/// Supplemented from `day5_human_robot.py`: robot/human/cart assignment
/// share plus textual recommendations driven by the robot share
/// threshold. Kept in English rather than translated verbatim.
pub fn fleet_mix_report(assignment: &Assignment, agents: &[Agent]) -> FleetMixReport {
    let mut ids_by_kind: BTreeMap<AgentKind, Vec<String>> = BTreeMap::new();
    for agent in agents {
        ids_by_kind.entry(agent.kind).or_default().push(agent.id.clone());
    }

    let total_assigned = assignment.n_assigned();
    let total_orders = assignment.assigned.len() + assignment.unassigned.len();

    let mut stats_by_kind = BTreeMap::new();
    for (kind, ids) in &ids_by_kind {
        let id_set: std::collections::BTreeSet<&str> = ids.iter().map(String::as_str).collect();
        let n_orders = assignment
            .assigned
            .values()
            .filter(|agent_id| id_set.contains(agent_id.as_str()))
            .count();
        let share_percent = if total_assigned > 0 {
            (n_orders as f64 / total_assigned as f64 * 100.0 * 10.0).round() / 10.0
        } else {
            0.0
        };
        stats_by_kind.insert(
            *kind,
            AgentTypeStats {
                n_orders,
                agent_ids: ids.clone(),
                share_percent,
            },
        );
    }

    let robot_share = stats_by_kind
        .get(&AgentKind::Robot)
        .map(|s| s.share_percent)
        .unwrap_or(0.0);

    let mut recommendations = Vec::new();
    if robot_share > 60.0 {
        recommendations.push(
            "Robots already handle a large share of orders; check robot capacity headroom before adding more.".to_string(),
        );
    } else if robot_share < 30.0 && total_orders > 20 {
        recommendations.push(
            "Consider adding robots for light, standard-priority orders to cut hourly cost and free humans for higher-value work.".to_string(),
        );
    } else {
        recommendations.push(
            "Fleet mix is currently balanced; watch for load spikes before rebalancing.".to_string(),
        );
    }
    recommendations.push(
        "Prioritize automating low-line-count, moderate-weight, standard-priority orders, where robots are most effective.".to_string(),
    );
    recommendations.push(
        "Train humans on express, fragile, or high-value orders, and on robot supervision.".to_string(),
    );

    FleetMixReport {
        stats_by_kind,
        total_orders,
        total_assigned,
        recommendations,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Location, OrderItem, Priority, Restriction, SimTime, Warehouse};

    fn order(id: &str, pids: &[&str]) -> Order {
        Order::new(
            id,
            SimTime::parse("08:00").unwrap(),
            SimTime::parse("20:00").unwrap(),
            Priority::Standard,
            pids.iter()
                .map(|p| OrderItem {
                    product_id: p.to_string(),
                    quantity: 1,
                })
                .collect(),
        )
    }

    #[test]
    fn product_frequency_counts_each_order_at_most_once() {
        let orders = vec![order("O1", &["P1", "P1"]), order("O2", &["P1"])];
        let freq = product_frequency(&orders);
        assert_eq!(freq.get("P1"), Some(&2));
    }

    #[test]
    fn co_ordered_pairs_are_unordered_and_deduped() {
        let orders = vec![order("O1", &["P2", "P1"])];
        let pairs = co_ordered_pairs(&orders);
        assert_eq!(pairs.get(&("P1".to_string(), "P2".to_string())), Some(&1));
    }

    #[test]
    fn top_n_breaks_ties_by_id_order() {
        let orders = vec![order("O1", &["P2"]), order("O2", &["P1"])];
        let top = top_products(&orders, 10);
        assert_eq!(top, vec![("P1".to_string(), 1), ("P2".to_string(), 1)]);
    }

    fn agent(id: &str, kind: AgentKind) -> Agent {
        Agent {
            id: id.into(),
            kind,
            capacity_weight: 100.0,
            capacity_volume: 100.0,
            speed: 1.0,
            cost_per_hour: 10.0,
            restrictions: Restriction::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        }
    }

    #[test]
    fn fleet_mix_shares_sum_to_roughly_one_hundred() {
        let agents = vec![
            agent("R1", AgentKind::Robot),
            agent("H1", AgentKind::Human),
        ];
        let mut assignment = Assignment::new();
        assignment.assign("O1", "R1");
        assignment.assign("O2", "R1");
        assignment.assign("O3", "H1");
        let report = fleet_mix_report(&assignment, &agents);
        let total: f64 = report.stats_by_kind.values().map(|s| s.share_percent).sum();
        assert!((total - 100.0).abs() < 0.5);
    }

    #[test]
    fn zone_visits_counts_each_order_once_per_zone() {
        let mut warehouse = Warehouse::new(10, 10, Location::new(0, 0));
        warehouse.add_zone("A", vec![Location::new(1, 1), Location::new(1, 2)]);
        let zones = ZoneIndex::build(&warehouse);
        let mut o = order("O1", &["P1", "P2"]);
        o.unique_locations = vec![Location::new(1, 1), Location::new(1, 2)];
        let visits = zone_visits(&[o], &Catalog::new(vec![]), &zones);
        assert_eq!(visits.get("A"), Some(&1));
    }
}
