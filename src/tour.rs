//! C8: TSP tour planner.
//!
//! Builds a closed tour over an agent's assigned orders' deduped
//! product locations: a cheapest-arc (nearest-neighbor) construction
//! followed by 2-opt local search, time-limited like the declarative
//! allocators. There is no external routing engine in this
//! ecosystem the way OR-Tools' `RoutingModel` is used upstream, so the
//! construction + local-search shape is reproduced directly rather
//! than handed to a solver crate.

use std::time::{Duration, Instant};

use crate::model::{Agent, Location, Order, Route};

/// Plans a closed tour for `agent` over `orders`' deduped locations.
/// `floor_locked` restricts visits to cells on the entry's row, a
/// dashboard-visualization heuristic exposed as an opt-in flag
/// (default off).
pub fn plan_tour(
    entry: Location,
    orders: &[Order],
    floor_locked: bool,
    time_limit: Duration,
) -> Route {
    let mut locations = unique_locations(orders);
    if floor_locked {
        locations.retain(|loc| loc.y == entry.y);
    }

    if locations.is_empty() {
        return Route::entry_only(entry);
    }

    let deadline = Instant::now() + time_limit;
    let order = nearest_neighbor(entry, &locations);
    let order = two_opt(entry, &locations, order, deadline);

    let mut stops = Vec::with_capacity(order.len() + 2);
    stops.push(entry);
    stops.extend(order.iter().map(|&i| locations[i]));
    stops.push(entry);

    Route { stops }
}

fn unique_locations(orders: &[Order]) -> Vec<Location> {
    let mut seen = std::collections::HashSet::new();
    let mut locations = Vec::new();
    for order in orders {
        for loc in &order.unique_locations {
            if seen.insert((loc.x, loc.y)) {
                locations.push(*loc);
            }
        }
    }
    locations
}

/// Cheapest-arc construction: repeatedly visit the nearest unvisited
/// location; ties broken by the lower original index.
fn nearest_neighbor(entry: Location, locations: &[Location]) -> Vec<usize> {
    let mut visited = vec![false; locations.len()];
    let mut tour = Vec::with_capacity(locations.len());
    let mut current = entry;

    for _ in 0..locations.len() {
        let mut best: Option<(usize, i64)> = None;
        for (idx, loc) in locations.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let dist = current.manhattan(loc);
            // Ascending idx order plus a strict `<` keeps the lowest
            // index on ties, so construction is deterministic.
            let better = match best {
                Some((_, best_dist)) => dist < best_dist,
                None => true,
            };
            if better {
                best = Some((idx, dist));
            }
        }
        let (idx, _) = best.expect("at least one unvisited location remains");
        visited[idx] = true;
        tour.push(idx);
        current = locations[idx];
    }

    tour
}

/// 2-opt local search over the constructed tour, time-limited. Each
/// pass considers edge-swaps in index order for determinism and
/// applies the first improving swap found, repeating until a full pass
/// yields no improvement or the deadline passes.
fn two_opt(entry: Location, locations: &[Location], mut tour: Vec<usize>, deadline: Instant) -> Vec<usize> {
    if tour.len() < 2 {
        return tour;
    }

    loop {
        if Instant::now() >= deadline {
            break;
        }
        let mut improved = false;

        for i in 0..tour.len() - 1 {
            if Instant::now() >= deadline {
                break;
            }
            for j in (i + 1)..tour.len() {
                let a_prev = if i == 0 { entry } else { locations[tour[i - 1]] };
                let a = locations[tour[i]];
                let b = locations[tour[j]];
                let b_next = if j + 1 < tour.len() {
                    locations[tour[j + 1]]
                } else {
                    entry
                };

                let before = a_prev.manhattan(&a) + b.manhattan(&b_next);
                let after = a_prev.manhattan(&b) + a.manhattan(&b_next);

                if after < before {
                    tour[i..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    tour
}

/// Timing model: total picking time is 30s per item across every
/// assigned order, added to travel time at the agent's speed.
pub fn total_time_seconds(route: &Route, agent: &Agent, orders: &[Order]) -> f64 {
    let total_items: i64 = orders.iter().map(|o| o.total_quantity()).sum();
    let travel = if agent.speed > 0.0 {
        route.total_distance() as f64 / agent.speed
    } else {
        0.0
    };
    travel + 30.0 * total_items as f64
}

pub fn cost_euros(total_time_s: f64, agent: &Agent) -> f64 {
    total_time_s * agent.cost_per_hour / 3600.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AgentKind, OrderItem, Priority, Restriction, SimTime};

    fn order_with_locations(id: &str, locs: Vec<Location>) -> Order {
        let items = locs
            .iter()
            .enumerate()
            .map(|(i, _)| OrderItem {
                product_id: format!("P{i}"),
                quantity: 1,
            })
            .collect();
        let mut o = Order::new(
            id,
            SimTime::parse("08:00").unwrap(),
            SimTime::parse("20:00").unwrap(),
            Priority::Standard,
            items,
        );
        o.unique_locations = locs;
        o
    }

    #[test]
    fn empty_assignment_returns_entry_only_route() {
        let entry = Location::new(0, 0);
        let route = plan_tour(entry, &[], false, Duration::from_millis(100));
        assert_eq!(route.stops, vec![entry, entry]);
    }

    #[test]
    fn tour_visits_every_unique_location_exactly_once() {
        let entry = Location::new(0, 0);
        let orders = vec![order_with_locations(
            "O1",
            vec![Location::new(1, 0), Location::new(2, 0), Location::new(0, 3)],
        )];
        let route = plan_tour(entry, &orders, false, Duration::from_millis(200));
        assert_eq!(route.interior().len(), 3);
        let mut visited: Vec<Location> = route.interior().to_vec();
        visited.sort();
        let mut expected = vec![Location::new(1, 0), Location::new(2, 0), Location::new(0, 3)];
        expected.sort();
        assert_eq!(visited, expected);
    }

    #[test]
    fn floor_locked_filters_to_entrys_row() {
        let entry = Location::new(0, 0);
        let orders = vec![order_with_locations(
            "O1",
            vec![Location::new(1, 0), Location::new(2, 5)],
        )];
        let route = plan_tour(entry, &orders, true, Duration::from_millis(100));
        assert_eq!(route.interior(), &[Location::new(1, 0)]);
    }

    #[test]
    fn total_time_combines_travel_and_picking() {
        let entry = Location::new(0, 0);
        let orders = vec![order_with_locations("O1", vec![Location::new(3, 0)])];
        let route = plan_tour(entry, &orders, false, Duration::from_millis(100));
        let agent = Agent {
            id: "R1".into(),
            kind: AgentKind::Robot,
            capacity_weight: 10.0,
            capacity_volume: 10.0,
            speed: 1.0,
            cost_per_hour: 36.0,
            restrictions: Restriction::default(),
            used_weight: 0.0,
            used_volume: 0.0,
            assigned_orders: vec![],
        };
        let time = total_time_seconds(&route, &agent, &orders);
        // distance there-and-back = 6, speed = 1 -> travel 6s; 1 item -> 30s picking.
        assert_eq!(time, 36.0);
        assert_eq!(cost_euros(time, &agent), 36.0 * 36.0 / 3600.0);
    }
}
