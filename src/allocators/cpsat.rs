//! C6: native CP-SAT allocator.
//!
//! One-hot boolean encoding `x[i][s]` (s=0 unassigned, s=1..=n_agents
//! picks that agent), modeled directly rather than handed to an
//! external SAT/CP backend — there is no Rust CP-SAT binding in this
//! ecosystem, so "native" here means a hand-rolled branch-and-bound
//! search over those boolean variables, time-limited like any of the
//! external-solver allocators.
//!
//! The search order within each order's candidate agents is seeded by
//! a Kuhn-Munkres (Hungarian) assignment computed with
//! [`pathfinding::kuhn_munkres`] over an approximate cost matrix — the
//! same crate and algorithm `sim_core`'s Hungarian matcher uses for
//! rider-driver assignment — so the incumbent found early in the
//! search is usually close to optimal, and the time-limited branch and
//! bound mostly spends its budget proving or improving on it.

use std::time::{Duration, Instant};

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::error::StrategyError;
use crate::feasibility::can_take_with_fleet;
use crate::grid::ZoneIndex;
use crate::model::{Agent, Assignment, Catalog, Location, Order};

use super::classify_unassigned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    MaximizeAssigned,
    MinimizeCost,
}

const SCALE: f64 = 100.0;

struct CostMatrix(Vec<Vec<i64>>);

impl Weights<i64> for CostMatrix {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        CostMatrix(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

struct Problem<'a> {
    orders: &'a [Order],
    allowed: Vec<Vec<bool>>,
    incompatible_pairs: Vec<(usize, usize)>,
    cost: Vec<Vec<i64>>, // cost[i][a], scaled, only meaningful where allowed
    objective: Objective,
    deadline: Instant,
}

/// Runs the native allocator. Time-limited; if the search
/// exhausts `time_limit` before converging, the best feasible solution
/// found so far is returned (possibly the all-unassigned fallback).
pub fn allocate(
    orders: &[Order],
    mut agents: Vec<Agent>,
    catalog: &Catalog,
    zones: &ZoneIndex,
    entry: Location,
    objective: Objective,
    time_limit: Duration,
) -> (Assignment, Vec<Agent>, Option<StrategyError>) {
    let n_orders = orders.len();
    let n_agents = agents.len();

    if n_orders == 0 || n_agents == 0 {
        let mut assignment = Assignment::new();
        for order in orders {
            assignment.mark_unassigned(
                order.id.clone(),
                classify_unassigned(order, &agents, catalog, zones),
            );
        }
        return (assignment, agents, None);
    }

    let allowed: Vec<Vec<bool>> = orders
        .iter()
        .map(|order| {
            agents
                .iter()
                .map(|agent| can_take_with_fleet(agent, order, catalog, zones, &agents))
                .collect()
        })
        .collect();

    let mut incompatible_pairs = Vec::new();
    for i in 0..n_orders {
        for j in (i + 1)..n_orders {
            if jointly_incompatible(&orders[i], &orders[j], catalog) {
                incompatible_pairs.push((i, j));
            }
        }
    }

    let cost: Vec<Vec<i64>> = orders
        .iter()
        .map(|order| {
            let dist = distance_from_entry(entry, order);
            let picking_sec = 30.0 * order.total_quantity() as f64;
            agents
                .iter()
                .map(|agent| {
                    let travel_sec = if agent.speed > 0.0 {
                        dist as f64 / agent.speed
                    } else {
                        0.0
                    };
                    let total_sec = travel_sec + picking_sec;
                    (total_sec * agent.cost_per_hour / 3600.0 * SCALE).round() as i64
                })
                .collect()
        })
        .collect();

    let problem = Problem {
        orders,
        allowed: allowed.clone(),
        incompatible_pairs,
        cost: cost.clone(),
        objective,
        deadline: Instant::now() + time_limit,
    };

    let seed = hungarian_seed(&allowed, &cost, n_agents);
    let incumbent = greedy_from_seed(&problem, &agents, &seed, catalog, zones);

    let mut used_weight: Vec<f64> = agents.iter().map(|a| a.used_weight).collect();
    let mut used_volume: Vec<f64> = agents.iter().map(|a| a.used_volume).collect();
    let mut current: Vec<Option<usize>> = vec![None; n_orders];
    let mut best = incumbent;

    search(
        &problem,
        &agents,
        0,
        &mut current,
        &mut used_weight,
        &mut used_volume,
        &mut best,
    );

    let mut assignment = Assignment::new();
    for (i, slot) in best.iter().enumerate() {
        let order = &problem.orders[i];
        match slot {
            Some(a) => {
                agents[*a].assign(order.id.clone(), order.total_weight, order.total_volume);
                assignment.assign(order.id.clone(), agents[*a].id.clone());
            }
            None => {
                let reason = classify_unassigned(order, &agents, catalog, zones);
                assignment.mark_unassigned(order.id.clone(), reason);
            }
        }
    }

    (assignment, agents, None)
}

/// Hungarian assignment used purely to order branch-and-bound candidate
/// agents; it ignores cross-order capacity interaction so its output is
/// a hint, never trusted directly as a feasible solution.
fn hungarian_seed(allowed: &[Vec<bool>], cost: &[Vec<i64>], n_agents: usize) -> Vec<Option<usize>> {
    let n_orders = allowed.len();
    if n_orders == 0 || n_agents == 0 {
        return vec![None; n_orders];
    }
    const INFEASIBLE: i64 = 1_000_000_000;
    let n_dummy = n_orders; // guarantees columns >= rows for kuhn_munkres
    let columns = n_agents + n_dummy;
    let matrix: Vec<Vec<i64>> = (0..n_orders)
        .map(|i| {
            let mut row = Vec::with_capacity(columns);
            for a in 0..n_agents {
                row.push(if allowed[i][a] { -cost[i][a] } else { -INFEASIBLE });
            }
            for _ in 0..n_dummy {
                row.push(0);
            }
            row
        })
        .collect();
    let weights = CostMatrix(matrix);
    let (_total, assignment) = kuhn_munkres(&weights);
    assignment
        .into_iter()
        .map(|col| if col < n_agents { Some(col) } else { None })
        .collect()
}

/// Commits the Hungarian hint order-by-order, skipping any pick that
/// isn't actually feasible given capacity/incompatibility so far, to
/// produce a guaranteed-feasible starting incumbent.
fn greedy_from_seed(
    problem: &Problem,
    agents: &[Agent],
    seed: &[Option<usize>],
    catalog: &Catalog,
    zones: &ZoneIndex,
) -> Vec<Option<usize>> {
    let mut used_weight: Vec<f64> = agents.iter().map(|a| a.used_weight).collect();
    let mut used_volume: Vec<f64> = agents.iter().map(|a| a.used_volume).collect();
    let mut result = vec![None; problem.orders.len()];
    let fleet_snapshot: Vec<Agent> = agents.to_vec();

    for i in 0..problem.orders.len() {
        let order = &problem.orders[i];
        let candidate = seed[i].into_iter().chain(0..agents.len());
        for a in candidate {
            if a >= agents.len() || !problem.allowed[i][a] {
                continue;
            }
            if used_weight[a] + order.total_weight > agents[a].capacity_weight {
                continue;
            }
            if used_volume[a] + order.total_volume > agents[a].capacity_volume {
                continue;
            }
            if conflicts_with_committed(problem, &result, i, a) {
                continue;
            }
            if !can_take_with_fleet(&agents[a], order, catalog, zones, &fleet_snapshot) {
                continue;
            }
            result[i] = Some(a);
            used_weight[a] += order.total_weight;
            used_volume[a] += order.total_volume;
            break;
        }
    }
    result
}

fn conflicts_with_committed(
    problem: &Problem,
    current: &[Option<usize>],
    order_idx: usize,
    agent_idx: usize,
) -> bool {
    problem.incompatible_pairs.iter().any(|&(x, y)| {
        let other = if x == order_idx {
            Some(y)
        } else if y == order_idx {
            Some(x)
        } else {
            None
        };
        match other {
            Some(o) => current.get(o).copied().flatten() == Some(agent_idx),
            None => false,
        }
    })
}

fn objective_value(problem: &Problem, assignment: &[Option<usize>]) -> i64 {
    match problem.objective {
        Objective::MaximizeAssigned => assignment.iter().filter(|s| s.is_some()).count() as i64,
        Objective::MinimizeCost => {
            let total: i64 = assignment
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.map(|a| problem.cost[i][a]))
                .sum();
            -total
        }
    }
}

/// Upper bound on the best any completion of `current` (decided through
/// index `next`) could achieve, used to prune.
fn bound(problem: &Problem, current: &[Option<usize>], next: usize) -> i64 {
    let committed = objective_value(problem, &current[..next]);
    let remaining = problem.orders.len() - next;
    match problem.objective {
        Objective::MaximizeAssigned => committed + remaining as i64,
        // Every undecided order could in principle stay unassigned at
        // zero cost, which is always an upper bound on -total_cost.
        Objective::MinimizeCost => committed,
    }
}

#[allow(clippy::too_many_arguments)]
fn search(
    problem: &Problem,
    agents: &[Agent],
    order_idx: usize,
    current: &mut Vec<Option<usize>>,
    used_weight: &mut [f64],
    used_volume: &mut [f64],
    best: &mut Vec<Option<usize>>,
) {
    if Instant::now() >= problem.deadline {
        return;
    }

    if order_idx == problem.orders.len() {
        if objective_value(problem, current) > objective_value(problem, best) {
            *best = current.clone();
        }
        return;
    }

    if bound(problem, current, order_idx) <= objective_value(problem, best) {
        return;
    }

    let order = &problem.orders[order_idx];
    let mut candidates: Vec<usize> = (0..agents.len())
        .filter(|&a| problem.allowed[order_idx][a])
        .collect();
    candidates.sort_by_key(|&a| problem.cost[order_idx][a]);

    for a in candidates {
        if Instant::now() >= problem.deadline {
            return;
        }
        if used_weight[a] + order.total_weight > agents[a].capacity_weight {
            continue;
        }
        if used_volume[a] + order.total_volume > agents[a].capacity_volume {
            continue;
        }
        if conflicts_with_committed(problem, current, order_idx, a) {
            continue;
        }

        current[order_idx] = Some(a);
        used_weight[a] += order.total_weight;
        used_volume[a] += order.total_volume;

        search(
            problem,
            agents,
            order_idx + 1,
            current,
            used_weight,
            used_volume,
            best,
        );

        used_weight[a] -= order.total_weight;
        used_volume[a] -= order.total_volume;
    }

    current[order_idx] = None;
    search(
        problem,
        agents,
        order_idx + 1,
        current,
        used_weight,
        used_volume,
        best,
    );
}

fn distance_from_entry(entry: Location, order: &Order) -> i64 {
    order
        .unique_locations
        .iter()
        .map(|loc| entry.manhattan(loc))
        .sum()
}

fn jointly_incompatible(a: &Order, b: &Order, catalog: &Catalog) -> bool {
    for ia in &a.items {
        for ib in &b.items {
            if catalog.incompatible(&ia.product_id, &ib.product_id) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AgentKind, OrderItem, Priority, Restriction, SimTime, Warehouse};

    fn agent(id: &str, cap: f64) -> Agent {
        Agent {
            id: id.into(),
            kind: AgentKind::Robot,
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

    fn order(id: &str, weight: f64) -> Order {
        let mut o = Order::new(
            id,
            SimTime::parse("08:00").unwrap(),
            SimTime::parse("20:00").unwrap(),
            Priority::Standard,
            vec![OrderItem {
                product_id: "P1".into(),
                quantity: 1,
            }],
        );
        o.total_weight = weight;
        o.total_volume = weight;
        o.unique_locations = vec![Location::new(2, 2)];
        o
    }

    #[test]
    fn assigns_all_when_capacity_allows() {
        let orders = vec![order("O1", 5.0), order("O2", 5.0)];
        let agents = vec![agent("R1", 100.0), agent("R2", 100.0)];
        let catalog = Catalog::new(vec![]);
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let (assignment, _, err) = allocate(
            &orders,
            agents,
            &catalog,
            &zones,
            Location::new(0, 0),
            Objective::MaximizeAssigned,
            Duration::from_secs(1),
        );
        assert!(err.is_none());
        assert_eq!(assignment.n_assigned(), 2);
    }

    #[test]
    fn incompatible_orders_never_share_an_agent() {
        let catalog = Catalog::new(vec![
            crate::model::Product {
                id: "P1".into(),
                name: String::new(),
                category: String::new(),
                weight: 1.0,
                volume: 1.0,
                location: Location::new(2, 2),
                fragile: false,
                incompatible_with: ["P2".into()].into_iter().collect(),
            },
            crate::model::Product {
                id: "P2".into(),
                name: String::new(),
                category: String::new(),
                weight: 1.0,
                volume: 1.0,
                location: Location::new(3, 3),
                fragile: false,
                incompatible_with: Default::default(),
            },
        ]);
        let mut o1 = order("O1", 5.0);
        let mut o2 = order("O2", 5.0);
        o2.items = vec![OrderItem {
            product_id: "P2".into(),
            quantity: 1,
        }];
        o1.unique_locations = vec![Location::new(2, 2)];
        o2.unique_locations = vec![Location::new(3, 3)];

        let agents = vec![agent("R1", 100.0)];
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let (assignment, _, _) = allocate(
            &[o1, o2],
            agents,
            &catalog,
            &zones,
            Location::new(0, 0),
            Objective::MaximizeAssigned,
            Duration::from_secs(1),
        );
        assert_eq!(assignment.n_assigned(), 1);
    }

    #[test]
    fn empty_input_is_trivially_ok() {
        let agents = vec![agent("R1", 10.0)];
        let catalog = Catalog::new(vec![]);
        let zones = ZoneIndex::build(&Warehouse::new(10, 10, Location::new(0, 0)));
        let (assignment, _, err) = allocate(
            &[],
            agents,
            &catalog,
            &zones,
            Location::new(0, 0),
            Objective::MaximizeAssigned,
            Duration::from_secs(1),
        );
        assert!(err.is_none());
        assert_eq!(assignment.n_assigned(), 0);
    }
}
