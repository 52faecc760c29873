//! Derived views over the event list: time windows, hot zones,
//! leaderboards and per-device profiles. Everything here is pure and
//! recomputed per request.

pub mod cluster;
pub mod leaderboard;
pub mod profile;
pub mod window;

pub use cluster::{find_hot_zones, find_hot_zones_naive, recent_hot_zones, ClusterParams, HotZone};
pub use leaderboard::{leaderboard, IdentityKey, Leaderboard, LeaderboardEntry};
pub use profile::{profile, streaks, Achievement, ProfileStats};
pub use window::TimeWindow;
