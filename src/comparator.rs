//! C12: strategy comparator.
//!
//! Runs each requested allocator on a fresh clone of the agent fleet
//! (independent usage state per strategy), gathers its assignment,
//! evaluates metrics, and keys the results by strategy name. A strategy
//! whose backend errors reports the error but never aborts the others.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::allocators::{cp, cpsat, first_fit};
use crate::config::CONFIG;
use crate::error::StrategyError;
use crate::grid::ZoneIndex;
use crate::metrics::{self, MetricsReport};
use crate::model::{Agent, Assignment, Catalog, Location, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    FirstFit,
    Cp,
    CpSat,
    BatchingCpSat,
}

impl Strategy {
    fn name(self) -> &'static str {
        match self {
            Strategy::FirstFit => "first_fit",
            Strategy::Cp => "cp",
            Strategy::CpSat => "cpsat",
            Strategy::BatchingCpSat => "batching_cpsat",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub assignment: Assignment,
    pub metrics: MetricsReport,
    pub error: Option<StrategyError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub by_strategy: BTreeMap<String, StrategyResult>,
}

/// Runs every strategy in `strategies` and returns the keyed report.
pub fn compare(
    strategies: &[Strategy],
    orders: &[Order],
    agents: &[Agent],
    catalog: &Catalog,
    zones: &ZoneIndex,
    entry: Location,
) -> ComparisonReport {
    let mut by_strategy = BTreeMap::new();

    for &strategy in strategies {
        let fresh_agents = agents.to_vec();
        let (assignment, final_agents, error) = match strategy {
            Strategy::FirstFit => {
                let (assignment, agents) = first_fit::allocate(orders, fresh_agents, catalog, zones);
                (assignment, agents, None)
            }
            Strategy::Cp => cp::allocate(
                orders,
                fresh_agents,
                catalog,
                zones,
                entry,
                cp::Objective::MaximizeAssigned,
            ),
            Strategy::CpSat => cpsat::allocate(
                orders,
                fresh_agents,
                catalog,
                zones,
                entry,
                cpsat::Objective::MaximizeAssigned,
                CONFIG.solver_time_limit,
            ),
            Strategy::BatchingCpSat => run_batching_cpsat(orders, fresh_agents, catalog, zones, entry),
        };

        // P1 backstop: every allocator is expected to uphold this by
        // construction, so a trip here means a strategy has a bug, not
        // that the input was infeasible. Reported as this strategy's
        // error rather than unwinding, so one buggy allocator can't
        // take the rest of the comparison down with it.
        let error = error.or_else(|| {
            crate::feasibility::check_capacity_invariant(&final_agents)
                .err()
                .map(StrategyError::from)
        });

        let report = metrics::evaluate(&assignment, orders, &final_agents, entry);
        by_strategy.insert(
            strategy.name().to_string(),
            StrategyResult {
                assignment,
                metrics: report,
                error,
            },
        );
    }

    ComparisonReport { by_strategy }
}

/// Batches are built, then assigned as meta-orders via the native
/// CP-SAT allocator, and the `batch -> agent` map expands to
/// `order -> agent` by propagation.
fn run_batching_cpsat(
    orders: &[Order],
    agents: Vec<Agent>,
    catalog: &Catalog,
    zones: &ZoneIndex,
    entry: Location,
) -> (Assignment, Vec<Agent>, Option<StrategyError>) {
    let max_batch_weight = agents
        .iter()
        .map(|a| a.capacity_weight)
        .fold(0.0_f64, f64::max);
    let max_batch_volume = agents
        .iter()
        .map(|a| a.capacity_volume)
        .fold(0.0_f64, f64::max);

    let batches = crate::batching::build_batches(
        orders,
        catalog,
        max_batch_weight,
        max_batch_volume,
        CONFIG.batching_window_minutes,
    );

    let batch_orders: Vec<Order> = batches
        .iter()
        .enumerate()
        .map(|(idx, batch)| {
            let mut meta = Order::new(
                format!("__batch_{idx}"),
                batch.orders.iter().map(|o| o.received_time).min().unwrap_or(batch.deadline),
                batch.deadline,
                crate::model::Priority::Standard,
                Vec::new(),
            );
            meta.total_weight = batch.total_weight;
            meta.total_volume = batch.total_volume;
            meta.unique_locations = batch.unique_locations.clone();
            meta
        })
        .collect();

    let (batch_assignment, final_agents, error) = cpsat::allocate(
        &batch_orders,
        agents,
        catalog,
        zones,
        entry,
        cpsat::Objective::MaximizeAssigned,
        Duration::from_secs(CONFIG.solver_time_limit.as_secs()),
    );

    let mut batch_to_agent = BTreeMap::new();
    for (idx, meta) in batch_orders.iter().enumerate() {
        if let Some(agent_id) = batch_assignment.agent_of(&meta.id) {
            batch_to_agent.insert(idx, agent_id.to_string());
        }
    }

    let mut assignment = crate::batching::batches_to_assignment(&batches, &batch_to_agent);
    for order in orders {
        if assignment.agent_of(&order.id).is_none() {
            assignment.mark_unassigned(
                order.id.clone(),
                crate::allocators::classify_unassigned(order, &final_agents, catalog, zones),
            );
        }
    }

    (assignment, final_agents, error)
}
