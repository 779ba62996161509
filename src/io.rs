//! JSON file I/O: loaders for the four input files and writers for
//! the three output files. Wire locations are `[x, y]` pairs; the
//! in-memory [`Location`] stays an `{x, y}` object everywhere else (the
//! HTTP route payloads in particular), so this module carries its own
//! array-shaped DTOs rather than reshaping [`Location`]'s own derive.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::model::{
    Agent, Assignment, Catalog, Location, Order, Product, UnassignedReason, Warehouse,
};

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, InputError> {
    let bytes = fs::read_to_string(path)
        .map_err(|e| InputError::MalformedJson(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&bytes).map_err(|e| InputError::MalformedJson(format!("{}: {e}", path.display())))
}

#[derive(Deserialize)]
struct WarehouseDto {
    dimensions: DimensionsDto,
    zones: BTreeMap<String, ZoneDto>,
    entry_point: [i64; 2],
}

#[derive(Deserialize)]
struct DimensionsDto {
    width: i64,
    height: i64,
}

#[derive(Deserialize)]
struct ZoneDto {
    coords: Vec<[i64; 2]>,
}

pub fn load_warehouse(path: &Path) -> Result<Warehouse, InputError> {
    let dto: WarehouseDto = read_json(path)?;
    let mut warehouse = Warehouse::new(
        dto.dimensions.width,
        dto.dimensions.height,
        Location::new(dto.entry_point[0], dto.entry_point[1]),
    );
    for (name, zone) in dto.zones {
        let cells = zone.coords.iter().map(|[x, y]| Location::new(*x, *y)).collect();
        warehouse.add_zone(name, cells);
    }
    Ok(warehouse)
}

#[derive(Deserialize)]
struct ProductDto {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    weight: f64,
    volume: f64,
    location: [i64; 2],
    #[serde(default)]
    fragile: bool,
    #[serde(default)]
    incompatible_with: Vec<String>,
    // `frequency` is source-provided pre-computed popularity; this crate
    // derives frequency from order history instead (see patterns.rs), so
    // the field is accepted but unused.
    #[serde(default)]
    #[allow(dead_code)]
    frequency: Option<f64>,
}

pub fn load_products(path: &Path) -> Result<Catalog, InputError> {
    let dtos: Vec<ProductDto> = read_json(path)?;
    let products = dtos
        .into_iter()
        .map(|dto| Product {
            id: dto.id,
            name: dto.name,
            category: dto.category,
            weight: dto.weight,
            volume: dto.volume,
            location: Location::new(dto.location[0], dto.location[1]),
            fragile: dto.fragile,
            incompatible_with: dto.incompatible_with.into_iter().collect(),
        })
        .collect();
    Ok(Catalog::new(products))
}

pub fn load_agents(path: &Path) -> Result<Vec<Agent>, InputError> {
    read_json(path)
}

#[derive(Deserialize)]
struct OrderDto {
    id: String,
    received_time: String,
    deadline: String,
    priority: crate::model::Priority,
    items: Vec<crate::model::OrderItem>,
}

pub fn load_orders(path: &Path) -> Result<Vec<Order>, InputError> {
    let dtos: Vec<OrderDto> = read_json(path)?;
    dtos.into_iter()
        .map(|dto| {
            Ok(Order::new(
                dto.id,
                crate::model::SimTime::parse(&dto.received_time)?,
                crate::model::SimTime::parse(&dto.deadline)?,
                dto.priority,
                dto.items,
            ))
        })
        .collect()
}

/// `allocation.json`: every agent present, even with an empty order list.
pub fn write_allocation(path: &Path, assignment: &Assignment, agents: &[Agent]) -> Result<(), InputError> {
    let mut out: BTreeMap<String, Vec<String>> = agents.iter().map(|a| (a.id.clone(), Vec::new())).collect();
    for (order_id, agent_id) in &assignment.assigned {
        out.entry(agent_id.clone()).or_default().push(order_id.clone());
    }
    for orders in out.values_mut() {
        orders.sort();
    }
    write_json(path, &out)
}

#[derive(Serialize)]
struct MetricsRow {
    agent: String,
    orders: usize,
    weight: f64,
    volume: f64,
}

#[derive(Serialize)]
struct MetricsFile {
    rows: Vec<MetricsRow>,
    total_orders_assigned: usize,
    total_weight: f64,
    total_volume: f64,
}

/// `metrics.json`: one row per agent plus fleet-wide totals, derived
/// from each agent's post-allocation usage state.
pub fn write_metrics(path: &Path, agents: &[Agent]) -> Result<(), InputError> {
    let rows: Vec<MetricsRow> = agents
        .iter()
        .map(|a| MetricsRow {
            agent: a.id.clone(),
            orders: a.assigned_orders.len(),
            weight: a.used_weight,
            volume: a.used_volume,
        })
        .collect();
    let file = MetricsFile {
        total_orders_assigned: rows.iter().map(|r| r.orders).sum(),
        total_weight: rows.iter().map(|r| r.weight).sum(),
        total_volume: rows.iter().map(|r| r.volume).sum(),
        rows,
    };
    write_json(path, &file)
}

#[derive(Serialize)]
struct UnassignedRow {
    order_id: String,
    reason: &'static str,
}

/// The wire reason tags don't match [`UnassignedReason`]'s derived
/// `snake_case` names one-for-one (`C2_incompatible_products` carries
/// the source rule-number prefix the others don't); mapped explicitly
/// rather than bending the enum's `Serialize` derive to an irregular
/// case.
fn reason_tag(reason: UnassignedReason) -> &'static str {
    match reason {
        UnassignedReason::IncompatibleProducts => "C2_incompatible_products",
        UnassignedReason::Capacity => "capacity",
        UnassignedReason::Restriction => "restriction",
        UnassignedReason::NoFeasibleAgent => "no_feasible_agent",
    }
}

/// `unassigned_orders.json`.
pub fn write_unassigned(path: &Path, assignment: &Assignment) -> Result<(), InputError> {
    let rows: Vec<UnassignedRow> = assignment
        .unassigned
        .iter()
        .map(|(order_id, reason)| UnassignedRow {
            order_id: order_id.clone(),
            reason: reason_tag(*reason),
        })
        .collect();
    write_json(path, &rows)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), InputError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| InputError::MalformedJson(format!("{}: {e}", path.display())))?;
    fs::write(path, body).map_err(|e| InputError::MalformedJson(format!("{}: {e}", path.display())))
}
