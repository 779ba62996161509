use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::Display;

/// The agent's behavioral class. Modeled as a tagged variant rather than
/// as an `Agent`/`Robot`/`Human`/`Cart` inheritance hierarchy, since the
/// three kinds differ only in capacity/cost/restriction data, never in
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentKind {
    Robot,
    Human,
    Cart,
}

impl AgentKind {
    /// First-Fit's agent scan order: robot < human < cart.
    pub fn priority(self) -> u8 {
        match self {
            AgentKind::Robot => 0,
            AgentKind::Human => 1,
            AgentKind::Cart => 2,
        }
    }
}

/// The explicit restriction bundle: named, typed fields in place of a
/// dynamic keyword-bag `restrictions` dict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(default, rename = "no_zones")]
    pub forbidden_zones: BTreeSet<String>,
    #[serde(default)]
    pub no_fragile: bool,
    /// 0 means "no limit".
    #[serde(default)]
    pub max_item_weight: f64,
}

/// A picker: robot, human, or cart, with capacity and restrictions.
///
/// `used_weight`/`used_volume`/`assigned_orders` are runtime state that
/// only ever grows within a planning call; there is
/// no "unassign" operation. Callers MUST clone the pre-call agents
/// before planning: the allocator always works on a fresh clone,
/// never the caller's original list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub capacity_weight: f64,
    pub capacity_volume: f64,
    pub speed: f64,
    pub cost_per_hour: f64,
    #[serde(default)]
    pub restrictions: Restriction,

    #[serde(default)]
    pub used_weight: f64,
    #[serde(default)]
    pub used_volume: f64,
    #[serde(default)]
    pub assigned_orders: Vec<String>,
}

impl Agent {
    pub fn remaining_weight(&self) -> f64 {
        self.capacity_weight - self.used_weight
    }

    pub fn remaining_volume(&self) -> f64 {
        self.capacity_volume - self.used_volume
    }

    /// Additive assignment: grows `used_weight`/`used_volume` and appends
    /// to `assigned_orders`. Never removes; there is no unassign.
    pub fn assign(&mut self, order_id: impl Into<String>, weight: f64, volume: f64) {
        self.assigned_orders.push(order_id.into());
        self.used_weight += weight;
        self.used_volume += volume;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn agent_kind_orders_robot_human_cart() {
        assert!(AgentKind::Robot.priority() < AgentKind::Human.priority());
        assert!(AgentKind::Human.priority() < AgentKind::Cart.priority());
    }

    #[test]
    fn assign_is_additive_and_monotonic() {
        let mut agent = Agent {
            id: "R1".into(),
            kind: AgentKind::Robot,
            capacity_weight: 50.0,
            capacity_volume: 50.0,
            speed: 1.0,
            cost_per_hour: 1.0,
            restrictions: Restriction::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        };
        agent.assign("O1", 10.0, 5.0);
        agent.assign("O2", 3.0, 2.0);
        assert_eq!(agent.used_weight, 13.0);
        assert_eq!(agent.used_volume, 7.0);
        assert_eq!(agent.assigned_orders, vec!["O1", "O2"]);
    }
}
