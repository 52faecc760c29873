use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use fartmap_common::{Event, FartMapError};

/// Look-back window for stats. The cutoff is `now - window`; events at or
/// after the cutoff are inside.
///
/// Deserializes through [`FromStr`], so query strings and the CLI accept the
/// same spellings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeWindow {
    pub fn duration(&self) -> Option<TimeDelta> {
        match self {
            TimeWindow::Day => Some(TimeDelta::hours(24)),
            TimeWindow::Week => Some(TimeDelta::days(7)),
            TimeWindow::Month => Some(TimeDelta::days(30)),
            TimeWindow::Year => Some(TimeDelta::days(365)),
            TimeWindow::All => None,
        }
    }

    /// `None` means no lower bound.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration().map(|d| now - d)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).map_or(true, |cutoff| timestamp >= cutoff)
    }

    pub fn filter<'a>(
        self,
        events: &'a [Event],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Event> + 'a {
        events.iter().filter(move |e| self.contains(e.timestamp, now))
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::Day => write!(f, "day"),
            TimeWindow::Week => write!(f, "week"),
            TimeWindow::Month => write!(f, "month"),
            TimeWindow::Year => write!(f, "year"),
            TimeWindow::All => write!(f, "all"),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = FartMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "24h" => Ok(TimeWindow::Day),
            "week" | "7d" => Ok(TimeWindow::Week),
            "month" | "30d" => Ok(TimeWindow::Month),
            "year" | "365d" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(FartMapError::Validation(format!("unknown time window: {other}"))),
        }
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn day_window_boundary_is_inclusive() {
        let cutoff = now() - TimeDelta::hours(24);
        assert!(TimeWindow::Day.contains(cutoff, now()));
        assert!(!TimeWindow::Day.contains(cutoff - TimeDelta::milliseconds(1), now()));
    }

    #[test]
    fn all_has_no_cutoff() {
        assert_eq!(TimeWindow::All.cutoff(now()), None);
        let ancient = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();
        assert!(TimeWindow::All.contains(ancient, now()));
    }

    #[test]
    fn parses_names_and_shorthands() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert_eq!("30d".parse::<TimeWindow>().unwrap(), TimeWindow::Month);
        assert_eq!(" YEAR ".parse::<TimeWindow>().unwrap(), TimeWindow::Year);
        assert!("fortnight".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn deserializes_like_from_str() {
        for (raw, expected) in [
            ("\"24h\"", TimeWindow::Day),
            ("\"DAY\"", TimeWindow::Day),
            ("\" Year \"", TimeWindow::Year),
            ("\"all\"", TimeWindow::All),
        ] {
            let window: TimeWindow = serde_json::from_str(raw).unwrap();
            assert_eq!(window, expected, "{raw}");
        }
        assert!(serde_json::from_str::<TimeWindow>("\"fortnight\"").is_err());
    }

    #[test]
    fn serializes_as_display_name() {
        for window in [TimeWindow::Day, TimeWindow::Month, TimeWindow::All] {
            assert_eq!(
                serde_json::to_value(window).unwrap(),
                serde_json::Value::String(window.to_string())
            );
        }
    }
}
