use serde::{Deserialize, Serialize};
use strum::Display;

use super::location::Location;
use super::time::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Standard,
    Express,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
}

/// A customer order: a list of product items plus derived totals filled
/// in by enrichment (C3). Enrichment is a pure function of `items` and
/// the catalog; re-enriching is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub received_time: SimTime,
    pub deadline: SimTime,
    pub priority: Priority,
    pub items: Vec<OrderItem>,

    #[serde(default)]
    pub total_weight: f64,
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default)]
    pub unique_locations: Vec<Location>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        received_time: SimTime,
        deadline: SimTime,
        priority: Priority,
        items: Vec<OrderItem>,
    ) -> Self {
        Order {
            id: id.into(),
            received_time,
            deadline,
            priority,
            items,
            total_weight: 0.0,
            total_volume: 0.0,
            unique_locations: Vec::new(),
        }
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
