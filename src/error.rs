//! Error kinds.
//!
//! `InputError` and `InternalInvariantError` abort the call that raised
//! them. `InfeasibleAssignment` is *not* a variant here: a per-order
//! infeasibility is represented as data (see
//! [`crate::model::assignment::UnassignedReason`]), never as an `Err`.
//! `StrategyError` is scoped to a single allocator strategy and is
//! reported by the comparator (C12) without aborting the other
//! strategies.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("order {order_id} references unknown product {product_id}")]
    UnknownProduct { product_id: String, order_id: String },

    #[error("malformed time value: {value}")]
    MalformedTime { value: String },

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq, serde::Serialize)]
pub enum InternalInvariantError {
    #[error("agent {agent_id} capacity overrun: used {used} > capacity {capacity}")]
    CapacityOverrun {
        agent_id: String,
        used: i64,
        capacity: i64,
    },

    #[error("order {order_id} appears more than once in the assignment")]
    DuplicateOrderAssignment { order_id: String },
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Internal(#[from] InternalInvariantError),
}

/// A per-strategy failure. The strategy comparator records this for
/// one strategy and proceeds with the rest — including a tripped
/// `InternalInvariantError` (§7 says the kind aborts "the call that
/// raised it", which here is the one strategy's run, not the whole
/// comparison).
#[derive(Debug, Error, Clone, PartialEq, Eq, serde::Serialize)]
pub enum StrategyError {
    #[error("solver backend unavailable: {backend}")]
    SolverUnavailable { backend: String },

    #[error("solver timed out after {seconds}s with no feasible solution")]
    SolverTimeout { seconds: u64 },

    #[error(transparent)]
    InternalInvariant(#[from] InternalInvariantError),
}
