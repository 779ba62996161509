use super::location::Location;
use super::order::Order;
use super::time::SimTime;

/// A group of orders jointly assignable to a single agent.
///
/// Invariants (enforced by [`crate::batching::build_batches`], checked
/// in tests): `total_weight <= max_batch_weight`, `total_volume <=
/// max_batch_volume`, `(max deadline - min deadline) <= window`, and the
/// union of member products is jointly compatible.
#[derive(Debug, Clone)]
pub struct Batch {
    pub orders: Vec<Order>,
    pub total_weight: f64,
    pub total_volume: f64,
    pub unique_locations: Vec<Location>,
    pub deadline: SimTime,
}

impl Batch {
    pub fn order_ids(&self) -> Vec<&str> {
        self.orders.iter().map(|o| o.id.as_str()).collect()
    }
}
