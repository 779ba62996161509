use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// A wall-clock time of day, stored as minutes since midnight.
///
/// Parsed once from the `"HH:MM"` wire format and compared as a plain
/// integer from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SimTime(pub i64);

impl SimTime {
    pub fn minutes(self) -> i64 {
        self.0
    }

    pub fn parse(s: &str) -> Result<SimTime, InputError> {
        let t = NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| InputError::MalformedTime {
            value: s.to_string(),
        })?;
        Ok(SimTime((t.hour() as i64) * 60 + t.minute() as i64))
    }
}

// NaiveTime::hour/minute live on the Timelike trait.
use chrono::Timelike;

impl<'de> Deserialize<'de> for SimTime {
    fn deserialize<D>(deserializer: D) -> Result<SimTime, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SimTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_hh_mm() {
        assert_eq!(SimTime::parse("09:30").unwrap().minutes(), 570);
        assert_eq!(SimTime::parse("00:00").unwrap().minutes(), 0);
        assert_eq!(SimTime::parse("23:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn rejects_malformed_time() {
        assert!(SimTime::parse("not-a-time").is_err());
        assert!(SimTime::parse("25:99").is_err());
    }

    #[test]
    fn roundtrips_through_display() {
        let t = SimTime::parse("14:05").unwrap();
        assert_eq!(t.to_string(), "14:05");
    }
}
