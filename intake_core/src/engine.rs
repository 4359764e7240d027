//! Concentration engine: the pharmacokinetic bloodstream-level model.
//!
//! Computes the instantaneous substance level at an arbitrary time point
//! from a history of intake events, using first-order exponential decay
//! with an optional linear absorption (rise) phase per intake kind:
//!
//! - No rise phase: `amount * peak_factor * 0.5^(t / half_life_hours)`
//! - Rise phase: linear ramp to `amount * peak_factor` over
//!   `peak_time_hours`, then half-life decay of that peak
//! - Events contribute nothing at samples before they occurred
//!
//! Everything here is a pure function of its inputs: no I/O, no shared
//! state, safe to call concurrently for independent sample times. Numeric
//! inputs are assumed pre-validated by the caller; NaN and negative amounts
//! propagate through the sums rather than raise.

use crate::profiles::ProfileTable;
use crate::types::{AbsorptionProfile, IntakeEvent, SimulatedIntake};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Level contributed by a single intake at `sample_time`.
///
/// Returns 0 for samples before the intake occurred. With no rise phase the
/// effective amount `amount * peak_factor` begins decaying immediately; with
/// `peak_time_hours > 0` the contribution ramps linearly up to that peak
/// before decay starts.
pub fn contribution(
    amount: f64,
    taken_at: DateTime<Utc>,
    sample_time: DateTime<Utc>,
    profile: &AbsorptionProfile,
) -> f64 {
    let t = elapsed_hours(taken_at, sample_time);
    if t < 0.0 {
        return 0.0;
    }

    let peak = amount * profile.peak_factor;
    if profile.peak_time_hours <= 0.0 {
        return peak * 0.5_f64.powf(t / profile.half_life_hours);
    }

    if t < profile.peak_time_hours {
        peak * (t / profile.peak_time_hours)
    } else {
        peak * 0.5_f64.powf((t - profile.peak_time_hours) / profile.half_life_hours)
    }
}

/// Total level across all events at one instant.
///
/// Each event's profile is resolved from its kind via the table; untagged
/// events use the table's fallback.
pub fn total_level(
    events: &[IntakeEvent],
    sample_time: DateTime<Utc>,
    profiles: &ProfileTable,
) -> f64 {
    events
        .iter()
        .map(|e| contribution(e.amount_mg, e.taken_at, sample_time, profiles.lookup(e.kind)))
        .sum()
}

/// Actual and projected level at one instant
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LevelEstimate {
    /// Level from logged events only
    pub actual: f64,
    /// Level including the simulated intake; equals `actual` when none was
    /// supplied
    pub projected: f64,
}

/// Total level at `sample_time`, optionally with a simulated intake added.
///
/// The simulated intake models a dose the user is considering but has not
/// logged. It is supplied as an extra argument so the real event list never
/// has to be touched for what-if queries.
pub fn level_at(
    events: &[IntakeEvent],
    sample_time: DateTime<Utc>,
    profiles: &ProfileTable,
    simulated: Option<&SimulatedIntake>,
) -> LevelEstimate {
    let actual = total_level(events, sample_time, profiles);
    let projected = match simulated {
        Some(sim) => {
            actual
                + contribution(
                    sim.amount_mg,
                    sim.taken_at,
                    sample_time,
                    profiles.lookup(sim.kind),
                )
        }
        None => actual,
    };

    LevelEstimate { actual, projected }
}

/// Sampling window for [`build_series`]
#[derive(Clone, Copy, Debug)]
pub struct SeriesWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Spacing between samples; 0 yields an empty series
    pub step_minutes: u32,
    /// Samples after this instant are flagged `is_future`
    pub reference_now: DateTime<Utc>,
}

impl SeriesWindow {
    /// Historical window from `now - window_hours` to `now`
    pub fn trailing(now: DateTime<Utc>, window_hours: i64, step_minutes: u32) -> Self {
        Self {
            start: now - Duration::hours(window_hours),
            end: now,
            step_minutes,
            reference_now: now,
        }
    }

    /// Window extending past `now`, for preview charts with projected samples
    pub fn preview(
        now: DateTime<Utc>,
        hours_past: i64,
        hours_ahead: i64,
        step_minutes: u32,
    ) -> Self {
        Self {
            start: now - Duration::hours(hours_past),
            end: now + Duration::hours(hours_ahead),
            step_minutes,
            reference_now: now,
        }
    }
}

/// One evaluated instant of the concentration curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SamplePoint {
    pub at: DateTime<Utc>,
    /// Level from logged events only
    pub level: f64,
    /// Level including the simulated intake; equals `level` when none was
    /// supplied
    pub projected: f64,
    /// Whether this sample lies after the window's reference "now"
    pub is_future: bool,
}

/// Evaluate the concentration curve at evenly spaced instants.
///
/// Produces one sample every `step_minutes` from `window.start` through
/// `window.end` inclusive: `floor(minutes(end - start) / step) + 1` samples
/// for a well-formed window. A zero step or inverted range produces an empty
/// series. Pure function of its inputs: identical arguments yield an
/// identical series.
pub fn build_series(
    events: &[IntakeEvent],
    window: &SeriesWindow,
    profiles: &ProfileTable,
    simulated: Option<&SimulatedIntake>,
) -> Vec<SamplePoint> {
    if window.step_minutes == 0 || window.end < window.start {
        return Vec::new();
    }

    let step = Duration::minutes(i64::from(window.step_minutes));
    let mut samples = Vec::new();
    let mut at = window.start;
    while at <= window.end {
        let estimate = level_at(events, at, profiles, simulated);
        samples.push(SamplePoint {
            at,
            level: estimate.actual,
            projected: estimate.projected,
            is_future: at > window.reference_now,
        });
        at += step;
    }

    samples
}
