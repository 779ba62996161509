//! C5: declarative CP/MILP allocator.
//!
//! Builds the assignment problem with [`good_lp`], the abstraction the
//! broader example pack reaches for when it needs a solver-agnostic LP
//! front end (mirrors `gat-algo`'s `dc_opf` module: `variables!()`,
//! `vars.minimise(...).using(clarabel)`, `constraint!`, `solution.value`).
//!
//! `clarabel` is a continuous conic solver with no integer/binary
//! variable support, so the one-hot `assignment[order][agent]`
//! variables are relaxed to `0.0..=1.0` and solved as an LP. The
//! relaxed solution is then rounded by a deterministic greedy pass
//! (highest LP value first, re-checking capacity and compatibility as
//! it commits each order) so the final result is always an integral,
//! feasible assignment. This rounding step is this crate's resolution
//! of the CP allocator's "external backend" requirement given the
//! solver actually available (see DESIGN.md).

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};

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

/// Runs the declarative allocator. On solver failure, every order is
/// reported unassigned and the error is returned alongside.
pub fn allocate(
    orders: &[Order],
    mut agents: Vec<Agent>,
    catalog: &Catalog,
    zones: &ZoneIndex,
    entry: Location,
    objective: Objective,
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

    let mut vars = variables!();
    let mut x: Vec<Vec<Variable>> = Vec::with_capacity(n_orders);
    for i in 0..n_orders {
        let mut row = Vec::with_capacity(n_agents);
        for a in 0..n_agents {
            let bound = if allowed[i][a] { (0.0, 1.0) } else { (0.0, 0.0) };
            row.push(vars.add(variable().min(bound.0).max(bound.1)));
        }
        x.push(row);
    }

    let objective_expr = match objective {
        Objective::MaximizeAssigned => {
            let mut expr = Expression::from(0.0);
            for row in &x {
                for &v in row {
                    expr += v;
                }
            }
            expr
        }
        Objective::MinimizeCost => {
            let mut expr = Expression::from(0.0);
            for (i, order) in orders.iter().enumerate() {
                let dist = distance_from_entry(entry, order);
                let picking_sec = 30.0 * order.total_quantity() as f64;
                for (a, agent) in agents.iter().enumerate() {
                    let travel_sec = if agent.speed > 0.0 {
                        dist as f64 / agent.speed
                    } else {
                        0.0
                    };
                    let cost = (travel_sec + picking_sec) * (agent.cost_per_hour / 3600.0);
                    expr += cost * x[i][a];
                }
            }
            expr
        }
    };

    let mut problem = match objective {
        Objective::MaximizeAssigned => vars.maximise(objective_expr).using(clarabel),
        Objective::MinimizeCost => vars.minimise(objective_expr).using(clarabel),
    };

    for i in 0..n_orders {
        let mut sum = Expression::from(0.0);
        for a in 0..n_agents {
            sum += x[i][a];
        }
        problem = problem.with(constraint!(sum <= 1.0));
    }

    for (a, agent) in agents.iter().enumerate() {
        let mut weight_sum = Expression::from(0.0);
        let mut volume_sum = Expression::from(0.0);
        for (i, order) in orders.iter().enumerate() {
            weight_sum += order.total_weight * x[i][a];
            volume_sum += order.total_volume * x[i][a];
        }
        problem = problem.with(constraint!(weight_sum <= agent.remaining_weight()));
        problem = problem.with(constraint!(volume_sum <= agent.remaining_volume()));
    }

    for i in 0..n_orders {
        for j in (i + 1)..n_orders {
            if jointly_incompatible(&orders[i], &orders[j], catalog) {
                for a in 0..n_agents {
                    problem = problem.with(constraint!(x[i][a] + x[j][a] <= 1.0));
                }
            }
        }
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(_) => {
            let mut assignment = Assignment::new();
            for order in orders {
                assignment.mark_unassigned(
                    order.id.clone(),
                    classify_unassigned(order, &agents, catalog, zones),
                );
            }
            return (
                assignment,
                agents,
                Some(StrategyError::SolverUnavailable {
                    backend: "clarabel".into(),
                }),
            );
        }
    };

    // Greedy, deterministic rounding: orders in input order, each takes
    // the highest-LP-value feasible agent with remaining room.
    let mut order_ranking: Vec<usize> = (0..n_orders).collect();
    order_ranking.sort_by(|&i, &j| {
        let best_i = (0..n_agents)
            .map(|a| solution.value(x[i][a]))
            .fold(f64::MIN, f64::max);
        let best_j = (0..n_agents)
            .map(|a| solution.value(x[j][a]))
            .fold(f64::MIN, f64::max);
        best_j
            .partial_cmp(&best_i)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut assignment = Assignment::new();
    for &i in &order_ranking {
        let order = &orders[i];
        let fleet_snapshot = agents.clone();
        let mut ranked_agents: Vec<usize> = (0..n_agents).collect();
        ranked_agents.sort_by(|&a, &b| {
            solution
                .value(x[i][b])
                .partial_cmp(&solution.value(x[i][a]))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut picked = None;
        for a in ranked_agents {
            if allowed[i][a]
                && can_take_with_fleet(&agents[a], order, catalog, zones, &fleet_snapshot)
            {
                picked = Some(a);
                break;
            }
        }

        match picked {
            Some(a) => {
                agents[a].assign(order.id.clone(), order.total_weight, order.total_volume);
                assignment.assign(order.id.clone(), agents[a].id.clone());
            }
            None => {
                let reason = classify_unassigned(order, &fleet_snapshot, catalog, zones);
                assignment.mark_unassigned(order.id.clone(), reason);
            }
        }
    }

    (assignment, agents, None)
}

/// Cost-formula distance term: sum of entry-to-location Manhattan
/// distances over the order's deduped locations.
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
