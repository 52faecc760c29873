use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fartmap_common::{Event, ANONYMOUS_LABEL};

use crate::window::TimeWindow;

pub const LEADERBOARD_SIZE: usize = 10;

/// Who an event is counted for. Device ids are stable; display names are
/// mutable and not unique, so a name is only used for records that carry
/// no device id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Device(String),
    Name(String),
}

impl IdentityKey {
    pub fn of(event: &Event) -> Option<Self> {
        if let Some(device_id) = &event.device_id {
            return Some(IdentityKey::Device(device_id.clone()));
        }
        event.display_name.clone().map(IdentityKey::Name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub device_id: Option<String>,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub window: TimeWindow,
    pub entries: Vec<LeaderboardEntry>,
    pub my_count: usize,
    pub total: usize,
}

struct Tally<'a> {
    key: IdentityKey,
    count: usize,
    latest: &'a Event,
}

/// Rank identities by event count inside `window`.
///
/// Ties keep the order in which identities first appear in `events`. A
/// device is labelled with the display name on its most recent event.
pub fn leaderboard(
    events: &[Event],
    window: TimeWindow,
    now: DateTime<Utc>,
    my_device_id: Option<&str>,
) -> Leaderboard {
    let mut tallies: Vec<Tally<'_>> = Vec::new();
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();
    let mut total = 0;

    for event in window.filter(events, now) {
        total += 1;
        let Some(key) = IdentityKey::of(event) else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => {
                let tally = &mut tallies[slot];
                tally.count += 1;
                if event.timestamp >= tally.latest.timestamp {
                    tally.latest = event;
                }
            }
            None => {
                index.insert(key.clone(), tallies.len());
                tallies.push(Tally {
                    key,
                    count: 1,
                    latest: event,
                });
            }
        }
    }

    let my_count = my_device_id
        .and_then(|id| index.get(&IdentityKey::Device(id.to_string())))
        .map(|&slot| tallies[slot].count)
        .unwrap_or(0);

    // Stable sort keeps first-encounter order among equal counts.
    tallies.sort_by(|a, b| b.count.cmp(&a.count));

    let entries = tallies
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|tally| match tally.key {
            IdentityKey::Device(device_id) => LeaderboardEntry {
                device_id: Some(device_id),
                label: tally.latest.label().to_string(),
                count: tally.count,
            },
            IdentityKey::Name(name) => LeaderboardEntry {
                device_id: None,
                label: name,
                count: tally.count,
            },
        })
        .collect();

    Leaderboard {
        window,
        entries,
        my_count,
        total,
    }
}
