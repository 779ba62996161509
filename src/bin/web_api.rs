//! HTTP front-end — a dashboard-facing view over the planning core,
//! not part of it.
//!
//! An `axum::Router` over a shared `Arc<AppState>`, permissive CORS.
//! The in-memory POST-added order list is held behind a
//! `tokio::sync::RwLock`: readers snapshot it before calling into the
//! (synchronous, pure) planning core, `POST /api/orders` takes the
//! write lock only for the append.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::*;
use serde::Deserialize;
use tokio::sync::RwLock;

use optipick::allocators::{cp, cpsat, first_fit};
use optipick::config::CONFIG;
use optipick::error::InputError;
use optipick::grid::ZoneIndex;
use optipick::metrics;
use optipick::model::{Agent, Assignment, Catalog, Location, Order, OrderItem, Priority, SimTime, Warehouse};
use optipick::{enrichment, io, tour};

struct AppState {
    warehouse: Warehouse,
    catalog: Catalog,
    base_agents: Vec<Agent>,
    zones: ZoneIndex,
    loaded_orders: Vec<Order>,
    posted_orders: RwLock<Vec<Order>>,
    next_order_seq: AtomicU64,
}

impl AppState {
    async fn snapshot_orders(&self) -> Vec<Order> {
        let posted = self.posted_orders.read().await;
        self.loaded_orders.iter().chain(posted.iter()).cloned().collect()
    }
}

#[derive(Debug, Deserialize)]
struct AllocQuery {
    #[serde(default)]
    alloc: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    solver: Option<String>,
}

fn allocate_by_name(
    name: Option<&str>,
    orders: &[Order],
    agents: Vec<Agent>,
    catalog: &Catalog,
    zones: &ZoneIndex,
    entry: Location,
) -> (Assignment, Vec<Agent>) {
    match name.unwrap_or("first_fit") {
        "cp" => {
            let (assignment, agents, err) =
                cp::allocate(orders, agents, catalog, zones, entry, cp::Objective::MaximizeAssigned);
            if let Some(err) = err {
                warn!("cp allocator reported: {err}");
            }
            (assignment, agents)
        }
        "cpsat" => {
            let (assignment, agents, err) = cpsat::allocate(
                orders,
                agents,
                catalog,
                zones,
                entry,
                cpsat::Objective::MaximizeAssigned,
                CONFIG.solver_time_limit,
            );
            if let Some(err) = err {
                warn!("cpsat allocator reported: {err}");
            }
            (assignment, agents)
        }
        _ => first_fit::allocate(orders, agents, catalog, zones),
    }
}

async fn warehouse_handler(State(state): State<Arc<AppState>>) -> Json<Warehouse> {
    Json(state.warehouse.clone())
}

async fn products_handler(State(state): State<Arc<AppState>>) -> Json<Vec<optipick::model::Product>> {
    Json(state.catalog.iter().cloned().collect())
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Agent>> {
    Json(state.base_agents.clone())
}

#[derive(serde::Serialize)]
struct OrdersResponse {
    orders: Vec<Order>,
    allocation: std::collections::BTreeMap<String, String>,
    unassigned: std::collections::BTreeMap<String, optipick::model::UnassignedReason>,
}

async fn orders_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AllocQuery>,
) -> Json<OrdersResponse> {
    let orders = state.snapshot_orders().await;
    let (assignment, _) = allocate_by_name(
        q.alloc.as_deref(),
        &orders,
        state.base_agents.clone(),
        &state.catalog,
        &state.zones,
        state.warehouse.entry,
    );
    Json(OrdersResponse {
        orders,
        allocation: assignment.assigned,
        unassigned: assignment.unassigned,
    })
}

#[derive(serde::Serialize)]
struct RouteRow {
    agent_id: String,
    stops: Vec<Location>,
}

#[derive(serde::Serialize)]
struct StatsResponse {
    allocation: std::collections::BTreeMap<String, String>,
    unassigned: std::collections::BTreeMap<String, optipick::model::UnassignedReason>,
    routes: Vec<RouteRow>,
    metrics: metrics::MetricsReport,
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AllocQuery>,
) -> Json<StatsResponse> {
    let orders = state.snapshot_orders().await;
    let entry = state.warehouse.entry;
    let (assignment, final_agents) = allocate_by_name(
        q.alloc.as_deref(),
        &orders,
        state.base_agents.clone(),
        &state.catalog,
        &state.zones,
        entry,
    );

    let routes = final_agents
        .iter()
        .filter_map(|agent| {
            let assigned: Vec<Order> = orders
                .iter()
                .filter(|o| assignment.agent_of(&o.id) == Some(agent.id.as_str()))
                .cloned()
                .collect();
            if assigned.is_empty() {
                return None;
            }
            let route = tour::plan_tour(entry, &assigned, CONFIG.floor_locked_tours, CONFIG.solver_time_limit);
            Some(RouteRow {
                agent_id: agent.id.clone(),
                stops: route.stops,
            })
        })
        .collect();

    let report = metrics::evaluate(&assignment, &orders, &final_agents, entry);

    Json(StatsResponse {
        allocation: assignment.assigned,
        unassigned: assignment.unassigned,
        routes,
        metrics: report,
    })
}

#[derive(Debug, Deserialize)]
struct PostOrderItem {
    product_id: String,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct PostOrderBody {
    received_time: String,
    deadline: String,
    priority: Priority,
    items: Vec<PostOrderItem>,
}

/// `POST /api/orders`: 400 if `items` is empty, else 200 with the full
/// stats payload and the newly assigned `Order_W###` id.
async fn post_order_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostOrderBody>,
) -> Result<Json<StatsResponse>, StatusCode> {
    if body.items.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let received_time = SimTime::parse(&body.received_time).map_err(|_| StatusCode::BAD_REQUEST)?;
    let deadline = SimTime::parse(&body.deadline).map_err(|_| StatusCode::BAD_REQUEST)?;

    let seq = state.next_order_seq.fetch_add(1, Ordering::SeqCst) + 1;
    let order_id = format!("Order_W{seq:03}");

    let items: Vec<OrderItem> = body
        .items
        .into_iter()
        .map(|i| OrderItem {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect();

    let mut order = Order::new(order_id, received_time, deadline, body.priority, items);
    enrichment::enrich_order(&mut order, &state.catalog).map_err(|err: InputError| {
        warn!("rejected posted order: {err}");
        StatusCode::BAD_REQUEST
    })?;

    {
        let mut posted = state.posted_orders.write().await;
        posted.push(order);
    }

    let stats = stats_handler(State(state), Query(AllocQuery { alloc: None, solver: None })).await;
    Ok(stats)
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/warehouse", get(warehouse_handler))
        .route("/api/products", get(products_handler))
        .route("/api/agents", get(agents_handler))
        .route("/api/orders", get(orders_handler).post(post_order_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    let warehouse_path = std::env::var("OPTIPICK_WAREHOUSE").unwrap_or_else(|_| "warehouse.json".into());
    let products_path = std::env::var("OPTIPICK_PRODUCTS").unwrap_or_else(|_| "products.json".into());
    let agents_path = std::env::var("OPTIPICK_AGENTS").unwrap_or_else(|_| "agents.json".into());
    let orders_path = std::env::var("OPTIPICK_ORDERS").unwrap_or_else(|_| "orders.json".into());

    let warehouse = io::load_warehouse(&PathBuf::from(warehouse_path))?;
    let catalog = io::load_products(&PathBuf::from(products_path))?;
    let base_agents = io::load_agents(&PathBuf::from(agents_path))?;
    let mut loaded_orders = io::load_orders(&PathBuf::from(orders_path))?;
    enrichment::enrich_orders(&mut loaded_orders, &catalog)?;

    let zones = ZoneIndex::build(&warehouse);

    info!(
        "Loaded {} products, {} agents, {} orders",
        catalog.len(),
        base_agents.len(),
        loaded_orders.len()
    );

    let state = Arc::new(AppState {
        warehouse,
        catalog,
        base_agents,
        zones,
        loaded_orders,
        posted_orders: RwLock::new(Vec::new()),
        next_order_seq: AtomicU64::new(0),
    });

    let app = build_router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "5001".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
