//! Windowed aggregation over intake history ("bloodstream stats").
//!
//! Folds engine outputs and raw event data into the summary objects the
//! calling layer serializes: current level, peak-today, time-to-baseline,
//! trailing cost rollups and usage histograms. Money and level values are
//! rounded to 2 decimal places here at the boundary, never inside the decay
//! math, so repeated aggregation does not compound rounding error.

use crate::engine::{self, SeriesWindow};
use crate::profiles::{ProfileTable, DEFAULT_BASELINE_LEVEL};
use crate::types::{IntakeEvent, IntakeKind};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Round to 2 decimal places at the serialization boundary
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tuning knobs for [`summarize`]
#[derive(Clone, Copy, Debug)]
pub struct StatsOptions {
    /// Trailing window scoping events for the level computation and totals
    pub window_hours: i64,
    /// Level treated as effectively zero for time-to-baseline
    pub baseline_level: f64,
    /// Sampling granularity for the peak and baseline scans
    pub step_minutes: u32,
    /// Stop scanning for the baseline crossing after this many hours
    pub baseline_cap_hours: i64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            window_hours: 24,
            baseline_level: DEFAULT_BASELINE_LEVEL,
            step_minutes: 5,
            baseline_cap_hours: 48,
        }
    }
}

/// Summary of the bloodstream model over a trailing window
#[derive(Clone, Debug, Serialize)]
pub struct BloodstreamStats {
    /// Estimated level at the reference "now"
    pub current_level: f64,
    pub entries_in_window: usize,
    pub total_amount_in_window: f64,
    /// Events logged since the UTC start of day
    pub today_usage_count: usize,
    /// Maximum sampled level between UTC start of day and now
    pub peak_level_today: f64,
    /// Hours until the level falls under the baseline: 0 when already
    /// at/under it, capped when no crossing is found
    pub time_to_baseline_hours: f64,
    pub last_intake_at: Option<DateTime<Utc>>,
    pub window_hours: i64,
}

/// Compute bloodstream stats for the trailing window ending at `now`.
///
/// Only events with `taken_at >= now - window_hours` enter the level
/// computation, matching the upstream trackers: at realistic half-lives,
/// contributions older than the window have decayed below display
/// resolution. Day boundaries ("today") are UTC.
pub fn summarize(
    events: &[IntakeEvent],
    now: DateTime<Utc>,
    profiles: &ProfileTable,
    opts: &StatsOptions,
) -> BloodstreamStats {
    let cutoff = now - Duration::hours(opts.window_hours);
    let windowed: Vec<IntakeEvent> = events
        .iter()
        .filter(|e| e.taken_at >= cutoff)
        .cloned()
        .collect();

    let current_level = engine::total_level(&windowed, now, profiles);
    let total_amount: f64 = windowed.iter().map(|e| e.amount_mg).sum();

    let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let today_usage_count = events
        .iter()
        .filter(|e| e.taken_at >= day_start && e.taken_at <= now)
        .count();

    // The peak scan covers the whole day, so it needs every event since
    // start of day even when the window is shorter: a morning dose carries
    // full amplitude at its intake instant, long before it decays.
    let peak_since = day_start.min(cutoff);
    let day_events: Vec<IntakeEvent> = events
        .iter()
        .filter(|e| e.taken_at >= peak_since)
        .cloned()
        .collect();

    let day_window = SeriesWindow {
        start: day_start,
        end: now,
        step_minutes: opts.step_minutes,
        reference_now: now,
    };
    let peak_level_today = engine::build_series(&day_events, &day_window, profiles, None)
        .iter()
        .map(|s| s.level)
        .fold(current_level, f64::max);

    let time_to_baseline = time_to_baseline_hours(&windowed, now, profiles, opts);

    let last_intake_at = events.iter().map(|e| e.taken_at).max();

    BloodstreamStats {
        current_level: round2(current_level),
        entries_in_window: windowed.len(),
        total_amount_in_window: round2(total_amount),
        today_usage_count,
        peak_level_today: round2(peak_level_today),
        time_to_baseline_hours: round2(time_to_baseline),
        last_intake_at,
        window_hours: opts.window_hours,
    }
}

/// Forward-sample from `now` until the level falls under the baseline.
///
/// Returns 0 when the level is already at/under the baseline, and the cap
/// when no crossing is found within `baseline_cap_hours`.
fn time_to_baseline_hours(
    events: &[IntakeEvent],
    now: DateTime<Utc>,
    profiles: &ProfileTable,
    opts: &StatsOptions,
) -> f64 {
    if engine::total_level(events, now, profiles) <= opts.baseline_level {
        return 0.0;
    }

    // The scan must terminate even for a degenerate zero step.
    let step = Duration::minutes(i64::from(opts.step_minutes.max(1)));
    let cap = now + Duration::hours(opts.baseline_cap_hours);

    let mut at = now + step;
    while at <= cap {
        if engine::total_level(events, at, profiles) < opts.baseline_level {
            return (at - now).num_minutes() as f64 / 60.0;
        }
        at += step;
    }

    opts.baseline_cap_hours as f64
}

/// Trailing spend rollups, independent of the decay model
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CostStats {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

/// Sum event costs over the trailing 1/7/30-day windows.
///
/// Boundaries are inclusive: an event at exactly `now - 24h` still counts
/// toward `daily`. Events without a cost count as zero. Each figure is
/// rounded to 2 decimals.
pub fn cost_stats(events: &[IntakeEvent], now: DateTime<Utc>) -> CostStats {
    let spend_since = |cutoff: DateTime<Utc>| -> f64 {
        events
            .iter()
            .filter(|e| e.taken_at >= cutoff)
            .map(|e| e.cost.unwrap_or(0.0))
            .sum()
    };

    CostStats {
        daily: round2(spend_since(now - Duration::days(1))),
        weekly: round2(spend_since(now - Duration::days(7))),
        monthly: round2(spend_since(now - Duration::days(30))),
    }
}

/// Event counts by UTC hour of day over a trailing window
pub fn usage_by_hour(events: &[IntakeEvent], now: DateTime<Utc>, window_hours: i64) -> [u32; 24] {
    let cutoff = now - Duration::hours(window_hours);
    let mut buckets = [0u32; 24];
    for event in events.iter().filter(|e| e.taken_at >= cutoff) {
        buckets[event.taken_at.hour() as usize] += 1;
    }
    buckets
}

/// Usage accumulated for one intake kind
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KindUsage {
    /// `None` groups events logged without a kind
    pub kind: Option<IntakeKind>,
    pub count: usize,
    pub total_amount: f64,
}

/// Count and total amount per kind over a trailing window.
///
/// Busiest kinds come first; ties order alphabetically by label, with the
/// untagged bucket after any tagged kind.
pub fn usage_by_kind(
    events: &[IntakeEvent],
    now: DateTime<Utc>,
    window_hours: i64,
) -> Vec<KindUsage> {
    let cutoff = now - Duration::hours(window_hours);
    let mut by_kind: HashMap<Option<IntakeKind>, (usize, f64)> = HashMap::new();
    for event in events.iter().filter(|e| e.taken_at >= cutoff) {
        let entry = by_kind.entry(event.kind).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += event.amount_mg;
    }

    let mut usage: Vec<KindUsage> = by_kind
        .into_iter()
        .map(|(kind, (count, total))| KindUsage {
            kind,
            count,
            total_amount: round2(total),
        })
        .collect();

    usage.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.kind.is_none().cmp(&b.kind.is_none()))
            .then_with(|| kind_sort_key(a.kind).cmp(kind_sort_key(b.kind)))
    });

    usage
}

fn kind_sort_key(kind: Option<IntakeKind>) -> &'static str {
    kind.map(|k| k.label()).unwrap_or("")
}
