use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Why an order was left unassigned — data, never an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// The order's own items are mutually incompatible, so no agent in
    /// any fleet could ever take it.
    IncompatibleProducts,
    /// No agent had spare capacity.
    Capacity,
    /// A zone, fragility, per-item weight, or cart-coupling restriction
    /// excluded every agent.
    Restriction,
    /// None of the above individually excluded every agent, but no
    /// single agent satisfied all of them at once.
    NoFeasibleAgent,
}

/// Total mapping `order_id -> agent_id | unassigned`. Every order
/// id supplied to an allocator appears exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assignment {
    pub assigned: BTreeMap<String, String>,
    pub unassigned: BTreeMap<String, UnassignedReason>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, order_id: impl Into<String>, agent_id: impl Into<String>) {
        self.assigned.insert(order_id.into(), agent_id.into());
    }

    pub fn mark_unassigned(&mut self, order_id: impl Into<String>, reason: UnassignedReason) {
        self.unassigned.insert(order_id.into(), reason);
    }

    pub fn agent_of(&self, order_id: &str) -> Option<&str> {
        self.assigned.get(order_id).map(String::as_str)
    }

    pub fn n_assigned(&self) -> usize {
        self.assigned.len()
    }

    pub fn orders_for_agent<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.assigned
            .iter()
            .filter(move |(_, a)| a.as_str() == agent_id)
            .map(|(o, _)| o.as_str())
    }
}
