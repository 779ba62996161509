use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::location::Location;

/// The grid warehouse: its dimensions, zone partition, and entry point.
///
/// Built once per planning call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub width: i64,
    pub height: i64,
    pub entry: Location,
    pub zones: BTreeMap<String, Vec<Location>>,
}

impl Warehouse {
    pub fn new(width: i64, height: i64, entry: Location) -> Self {
        Warehouse {
            width,
            height,
            entry,
            zones: BTreeMap::new(),
        }
    }

    pub fn add_zone(&mut self, name: impl Into<String>, cells: Vec<Location>) {
        self.zones.insert(name.into(), cells);
    }
}
