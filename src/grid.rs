//! C1: grid & zone index.
//!
//! Builds a `Location -> zone name` lookup from a [`Warehouse`]'s zone
//! partition. Construction is O(total zone coordinate count); lookup is
//! O(1) (amortized). Pure; has no failure modes.

use std::collections::HashMap;

use crate::model::{Location, Warehouse};

#[derive(Debug, Clone)]
pub struct ZoneIndex {
    zone_of: HashMap<Location, String>,
}

impl ZoneIndex {
    pub fn build(warehouse: &Warehouse) -> Self {
        let mut zone_of = HashMap::new();
        for (zone_name, cells) in &warehouse.zones {
            for cell in cells {
                // A cell listed in more than one zone keeps the zone that
                // was inserted first in map iteration order; the data model
                // promises at most one zone per cell so this never triggers
                // in well-formed input.
                zone_of.entry(*cell).or_insert_with(|| zone_name.clone());
            }
        }
        ZoneIndex { zone_of }
    }

    /// The zone name owning `loc`, or `None` if the cell is unzoned.
    pub fn zone_of(&self, loc: &Location) -> Option<&str> {
        self.zone_of.get(loc).map(String::as_str)
    }
}

/// Manhattan distance between two locations. Free function wrapper kept
/// for call sites that don't otherwise need a `Location` in scope.
pub fn manhattan(a: &Location, b: &Location) -> i64 {
    a.manhattan(b)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_warehouse() -> Warehouse {
        let mut w = Warehouse::new(10, 10, Location::new(0, 0));
        w.add_zone("A", vec![Location::new(1, 1), Location::new(1, 2)]);
        w.add_zone("B", vec![Location::new(5, 5)]);
        w
    }

    #[test]
    fn zoned_cells_resolve() {
        let idx = ZoneIndex::build(&sample_warehouse());
        assert_eq!(idx.zone_of(&Location::new(1, 1)), Some("A"));
        assert_eq!(idx.zone_of(&Location::new(5, 5)), Some("B"));
    }

    #[test]
    fn unzoned_cells_are_none() {
        let idx = ZoneIndex::build(&sample_warehouse());
        assert_eq!(idx.zone_of(&Location::new(9, 9)), None);
    }
}
