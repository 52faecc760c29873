use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use fartmap_common::{Event, ANONYMOUS_LABEL};

use crate::window::TimeWindow;

pub const XP_PER_EVENT: u64 = 10;
pub const FIRST_EVENT_BONUS: u64 = 50;
pub const NEW_REGION_BONUS: u64 = 100;
pub const XP_PER_LEVEL: u64 = 200;

const MILESTONES: [usize; 3] = [10, 50, 100];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Achievement {
    /// First event inside a 1°×1° cell.
    NewRegion { lat_band: i32, lng_band: i32 },
    Milestone { events: usize },
}

impl std::fmt::Display for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Achievement::NewRegion { lat_band, lng_band } => {
                write!(f, "New region reached ({lat_band},{lng_band})")
            }
            Achievement::Milestone { events: 10 } => write!(f, "10 Farts Club!"),
            Achievement::Milestone { events: 50 } => write!(f, "Legendary Farters Guild"),
            Achievement::Milestone { events: 100 } => write!(f, "Farted Around the World!"),
            Achievement::Milestone { events } => write!(f, "{events} farts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub device_id: String,
    pub label: String,
    pub total: usize,
    pub xp: u64,
    pub level: u64,
    /// Fraction of the way to the next level, 0.0..1.0.
    pub level_progress: f64,
    pub achievements: Vec<Achievement>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub window: TimeWindow,
    /// The device's events inside `window`, newest first.
    pub events: Vec<Event>,
}

/// Build the profile for one device. XP, achievements and streaks cover
/// the whole history; `window` only narrows the returned event list.
pub fn profile(
    events: &[Event],
    device_id: &str,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> ProfileStats {
    let mut mine: Vec<&Event> = events
        .iter()
        .filter(|e| e.device_id.as_deref() == Some(device_id))
        .collect();
    mine.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut xp = 0;
    let mut achievements = Vec::new();
    let mut regions: HashSet<(i32, i32)> = HashSet::new();
    for event in &mine {
        xp += XP_PER_EVENT;
        let band = (event.latitude.floor() as i32, event.longitude.floor() as i32);
        if regions.insert(band) {
            xp += NEW_REGION_BONUS;
            achievements.push(Achievement::NewRegion {
                lat_band: band.0,
                lng_band: band.1,
            });
        }
    }
    if !mine.is_empty() {
        xp += FIRST_EVENT_BONUS;
    }
    for milestone in MILESTONES {
        if mine.len() >= milestone {
            achievements.push(Achievement::Milestone { events: milestone });
        }
    }

    let (current_streak, longest_streak) =
        streaks(mine.iter().map(|e| e.timestamp.date_naive()), now.date_naive());

    let label = mine
        .first()
        .map(|e| e.label())
        .unwrap_or(ANONYMOUS_LABEL)
        .to_string();

    ProfileStats {
        device_id: device_id.to_string(),
        label,
        total: mine.len(),
        xp,
        level: xp / XP_PER_LEVEL + 1,
        level_progress: (xp % XP_PER_LEVEL) as f64 / XP_PER_LEVEL as f64,
        achievements,
        current_streak,
        longest_streak,
        window,
        events: mine
            .into_iter()
            .filter(|e| window.contains(e.timestamp, now))
            .cloned()
            .collect(),
    }
}

/// `(current, longest)` runs of consecutive UTC days with activity. The
/// current run only counts if it reaches `today`.
pub fn streaks(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in &days {
        run = match previous {
            Some(prev) if *day - prev == TimeDelta::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let current = if days.last() == Some(&today) { run } else { 0 };
    (current, longest)
}
