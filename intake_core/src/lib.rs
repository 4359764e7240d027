#![forbid(unsafe_code)]

//! Core domain model and computation for the Halflife intake tracker.
//!
//! This crate provides:
//! - Domain types (intake events, kinds, absorption profiles, goals)
//! - The concentration engine (decay/absorption math, series sampling)
//! - Windowed aggregation (bloodstream stats, cost rollups, usage)
//! - Goal progress derivation
//! - Persistence (WAL, CSV, goal state)

pub mod types;
pub mod error;
pub mod profiles;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;
pub mod state;
pub mod history;
pub mod engine;
pub mod stats;
pub mod goals;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use profiles::{build_profile_table, get_default_profile_table, ProfileTable};
pub use config::Config;
pub use wal::{EventSink, JsonlSink};
pub use history::load_recent_events;
pub use engine::{build_series, contribution, level_at, total_level, LevelEstimate, SamplePoint, SeriesWindow};
pub use stats::{cost_stats, summarize, usage_by_hour, usage_by_kind, BloodstreamStats, CostStats, KindUsage, StatsOptions};
pub use goals::{goal_progress, GoalProgress};
