use serde::Serialize;

use super::location::Location;

/// A closed tour: `[entry, L1, ..., Lk, entry]`. No two consecutive
/// entries are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub stops: Vec<Location>,
}

impl Route {
    pub fn entry_only(entry: Location) -> Self {
        Route {
            stops: vec![entry, entry],
        }
    }

    pub fn total_distance(&self) -> i64 {
        self.stops
            .windows(2)
            .map(|pair| pair[0].manhattan(&pair[1]))
            .sum()
    }

    /// The interior stops, i.e. every location between the opening and
    /// closing entry visit.
    pub fn interior(&self) -> &[Location] {
        if self.stops.len() <= 2 {
            &[]
        } else {
            &self.stops[1..self.stops.len() - 1]
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entry_only_route_has_zero_distance() {
        let r = Route::entry_only(Location::new(0, 0));
        assert_eq!(r.total_distance(), 0);
        assert!(r.interior().is_empty());
    }

    #[test]
    fn total_distance_sums_consecutive_hops() {
        let r = Route {
            stops: vec![
                Location::new(0, 0),
                Location::new(3, 0),
                Location::new(3, 4),
                Location::new(0, 0),
            ],
        };
        assert_eq!(r.total_distance(), 3 + 4 + 7);
    }
}
