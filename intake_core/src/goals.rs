//! Goal progress derivation.
//!
//! Progress is a pure derivation from the goal's declared fields and the
//! event history, never stored:
//! - Daily limit: trailing-24h consumption measured against a target amount
//! - Reduction: elapsed share of the schedule between start and target date
//! - Quit date: the same schedule math, tracked until the quit day arrives
//!
//! Under-specified goals (missing target value or date) report zero progress
//! and `on_track = false` instead of erroring, since goals may be saved
//! half-filled during creation flows.

use crate::stats::round2;
use crate::types::{Goal, GoalType, IntakeEvent};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Derived progress for one goal
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GoalProgress {
    /// Amount consumed over the trailing 24h
    pub current_value: f64,
    /// 0-100, capped at 100
    pub percent_complete: f64,
    pub on_track: bool,
    /// Whole days left on the schedule; `None` for goals without a date
    pub days_remaining: Option<i64>,
}

/// Evaluate a goal against the event history at `now`
pub fn goal_progress(goal: &Goal, events: &[IntakeEvent], now: DateTime<Utc>) -> GoalProgress {
    let current_value = trailing_amount(events, now, 24);

    match goal.goal_type {
        GoalType::DailyLimit => daily_limit_progress(goal, current_value),
        GoalType::Reduction | GoalType::QuitDate => schedule_progress(goal, current_value, now),
    }
}

fn daily_limit_progress(goal: &Goal, current_value: f64) -> GoalProgress {
    let Some(target) = goal.target_value else {
        tracing::debug!("daily limit goal has no target value, reporting zero progress");
        return GoalProgress {
            current_value: round2(current_value),
            percent_complete: 0.0,
            on_track: false,
            days_remaining: None,
        };
    };

    let percent = (current_value / target * 100.0).min(100.0);

    GoalProgress {
        current_value: round2(current_value),
        percent_complete: round2(percent),
        on_track: current_value <= target,
        days_remaining: None,
    }
}

fn schedule_progress(goal: &Goal, current_value: f64, now: DateTime<Utc>) -> GoalProgress {
    let Some(target_date) = goal.target_date else {
        tracing::debug!(
            "{} goal has no target date, reporting zero progress",
            goal.goal_type.label()
        );
        return GoalProgress {
            current_value: round2(current_value),
            percent_complete: 0.0,
            on_track: false,
            days_remaining: None,
        };
    };

    // A same-day target still counts as a one-day schedule.
    let total_days = ceil_days(target_date - goal.start_date).max(1);
    let days_passed = ceil_days(now - goal.start_date).max(0);
    let days_remaining = (total_days - days_passed).max(0);

    let percent = (days_passed as f64 / total_days as f64 * 100.0).min(100.0);

    GoalProgress {
        current_value: round2(current_value),
        percent_complete: round2(percent),
        on_track: now < target_date,
        days_remaining: Some(days_remaining),
    }
}

/// Partial days round up: 36 hours into a schedule counts as 2 days passed
fn ceil_days(span: Duration) -> i64 {
    (span.num_milliseconds() as f64 / 86_400_000.0).ceil() as i64
}

fn trailing_amount(events: &[IntakeEvent], now: DateTime<Utc>, window_hours: i64) -> f64 {
    let cutoff = now - Duration::hours(window_hours);
    events
        .iter()
        .filter(|e| e.taken_at >= cutoff)
        .map(|e| e.amount_mg)
        .sum()
}
