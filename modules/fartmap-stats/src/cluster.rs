use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fartmap_common::{BoundingBox, Event, GeoPoint};

use crate::window::TimeWindow;

/// Default absorb radius in degrees (~1.1 km at the equator).
pub const DEFAULT_THRESHOLD_DEG: f64 = 0.01;

/// Clusters smaller than this are not reported.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;

/// Geohash length used for a zone's display key (~150 m cells).
pub const HOT_ZONE_GEOHASH_PRECISION: usize = 7;

// Most cells the grid will lay across 180 degrees.
const MAX_GRID_CELLS: f64 = (1u64 << 40) as f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub threshold: f64,
    pub min_cluster_size: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD_DEG,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotZone {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    pub geohash: String,
}

/// Greedy single-pass clustering.
///
/// Points are visited in input order. Each unvisited point seeds a cluster
/// that absorbs every later unvisited point closer than `threshold` degrees
/// to the seed. Where two seeds' radii overlap, whichever comes first in the
/// input claims the shared points, so reordering the input can change the
/// result.
///
/// Candidates come from a uniform grid of `2 * threshold` cells; the output
/// is identical to [`find_hot_zones_naive`]. Thresholds too small for the
/// grid's integer cell indices use the naive scan instead.
pub fn find_hot_zones(points: &[GeoPoint], params: &ClusterParams) -> Vec<HotZone> {
    let cell_size = params.threshold * 2.0;
    if !(params.threshold.is_finite() && params.threshold > 0.0)
        || 180.0 / cell_size >= MAX_GRID_CELLS
    {
        return find_hot_zones_naive(points, params);
    }

    let cell_of = |p: &GeoPoint| {
        (
            (p.lat / cell_size).floor() as i64,
            (p.lng / cell_size).floor() as i64,
        )
    };

    // Buckets hold indices in ascending order.
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (idx, point) in points.iter().enumerate() {
        grid.entry(cell_of(point)).or_default().push(idx);
    }

    let mut visited = vec![false; points.len()];
    let mut zones = Vec::new();

    for seed in 0..points.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut members = vec![seed];

        let (row, col) = cell_of(&points[seed]);
        for d_row in -1..=1 {
            for d_col in -1..=1 {
                let neighbour = (row.saturating_add(d_row), col.saturating_add(d_col));
                let Some(bucket) = grid.get(&neighbour) else {
                    continue;
                };
                for &idx in bucket {
                    if idx > seed
                        && !visited[idx]
                        && points[seed].degree_distance(&points[idx]) < params.threshold
                    {
                        visited[idx] = true;
                        members.push(idx);
                    }
                }
            }
        }

        members.sort_unstable();
        if let Some(zone) = zone_from_members(points, &members, params) {
            zones.push(zone);
        }
    }

    zones
}

/// Reference O(n²) scan. Kept for cross-checking the grid version.
pub fn find_hot_zones_naive(points: &[GeoPoint], params: &ClusterParams) -> Vec<HotZone> {
    let mut visited = vec![false; points.len()];
    let mut zones = Vec::new();

    for seed in 0..points.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut members = vec![seed];

        for idx in (seed + 1)..points.len() {
            if !visited[idx] && points[seed].degree_distance(&points[idx]) < params.threshold {
                visited[idx] = true;
                members.push(idx);
            }
        }

        if let Some(zone) = zone_from_members(points, &members, params) {
            zones.push(zone);
        }
    }

    zones
}

/// Hot zones over events inside `window`, optionally limited to a viewport.
pub fn recent_hot_zones(
    events: &[Event],
    window: TimeWindow,
    now: DateTime<Utc>,
    viewport: Option<&BoundingBox>,
    params: &ClusterParams,
) -> Vec<HotZone> {
    let points: Vec<GeoPoint> = window
        .filter(events, now)
        .map(Event::point)
        .filter(|p| viewport.map_or(true, |bbox| bbox.contains(p)))
        .collect();
    let zones = find_hot_zones(&points, params);
    debug!(
        points = points.len(),
        zones = zones.len(),
        window = %window,
        "Computed hot zones"
    );
    zones
}

fn zone_from_members(
    points: &[GeoPoint],
    members: &[usize],
    params: &ClusterParams,
) -> Option<HotZone> {
    if members.len() < params.min_cluster_size {
        return None;
    }
    let n = members.len() as f64;
    let latitude = members.iter().map(|&i| points[i].lat).sum::<f64>() / n;
    let longitude = members.iter().map(|&i| points[i].lng).sum::<f64>() / n;
    let geohash = geohash::encode(
        geohash::Coord {
            x: longitude,
            y: latitude,
        },
        HOT_ZONE_GEOHASH_PRECISION,
    )
    .unwrap_or_default();

    Some(HotZone {
        latitude,
        longitude,
        count: members.len(),
        geohash,
    })
}
