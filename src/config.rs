//! Planner-wide tunables, read once from the environment.
//!
//! A `lazy_static!` block parsing env vars into a single `Config`,
//! covering the solver, batching, and routing defaults.

use std::time::Duration;

use lazy_static::lazy_static;

#[derive(Debug, Clone)]
pub struct Config {
    /// Default time budget for the CP/CP-SAT allocators and the TSP
    /// tour planner. 30s unless overridden.
    pub solver_time_limit: Duration,
    /// Batching deadline window, 60 minutes by default.
    pub batching_window_minutes: i64,
    /// Whether tours are filtered to the entry's row for "floor-locked"
    /// agent kinds (robots, carts). Off by default: this is a
    /// display-layer heuristic, not a hard constraint, so it defaults
    /// to not affecting the planned route.
    pub floor_locked_tours: bool,
    /// Top-N bucket size used by the pattern analyzer's `top_products`
    /// / `top_co_ordered_pairs` style reports.
    pub pattern_top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            solver_time_limit: Duration::from_secs(30),
            batching_window_minutes: 60,
            floor_locked_tours: false,
            pattern_top_n: 20,
        }
    }
}

fn env_duration_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_i64(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_bool(var: &str, default: bool) -> bool {
    std::env::var(var)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_usize(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let defaults = Config::default();
        Config {
            solver_time_limit: env_duration_secs(
                "OPTIPICK_SOLVER_TIME_LIMIT_SECS",
                defaults.solver_time_limit,
            ),
            batching_window_minutes: env_i64(
                "OPTIPICK_BATCHING_WINDOW_MINUTES",
                defaults.batching_window_minutes,
            ),
            floor_locked_tours: env_bool(
                "OPTIPICK_FLOOR_LOCKED_TOURS",
                defaults.floor_locked_tours,
            ),
            pattern_top_n: env_usize("OPTIPICK_PATTERN_TOP_N", defaults.pattern_top_n),
        }
    };
}
