use serde::{Deserialize, Serialize};

/// A single grid cell, identified by its integer `(x, y)` coordinates.
///
/// `Location` has value semantics: it is `Copy` and is freely passed
/// around by value rather than referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: i64,
    pub y: i64,
}

impl Location {
    pub fn new(x: i64, y: i64) -> Self {
        Location { x, y }
    }

    /// Manhattan (L1) distance to another location.
    pub fn manhattan(&self, other: &Location) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<(i64, i64)> for Location {
    fn from(pair: (i64, i64)) -> Self {
        Location::new(pair.0, pair.1)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Location::new(0, 0);
        let b = Location::new(3, 4);
        assert_eq!(a.manhattan(&b), 7);
        assert_eq!(b.manhattan(&a), 7);
    }

    #[test]
    fn manhattan_distance_to_self_is_zero() {
        let a = Location::new(5, -2);
        assert_eq!(a.manhattan(&a), 0);
    }
}
