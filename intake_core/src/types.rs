//! Core domain types for the Halflife intake tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Intake events and their kinds (route of administration)
//! - Absorption profiles (per-kind pharmacokinetic parameters)
//! - Simulated ("what-if") intakes
//! - Goals and persisted goal state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Intake Event Types
// ============================================================================

/// Route of administration for an intake event.
///
/// The kind selects which absorption profile the concentration engine uses;
/// untagged events fall back to the profile table's default.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntakeKind {
    Cigarette,
    Vape,
    Pouch,
    Gum,
    Lozenge,
    Patch,
}

impl IntakeKind {
    /// All kinds, in display order
    pub const ALL: [IntakeKind; 6] = [
        IntakeKind::Cigarette,
        IntakeKind::Vape,
        IntakeKind::Pouch,
        IntakeKind::Gum,
        IntakeKind::Lozenge,
        IntakeKind::Patch,
    ];

    /// Stable lowercase label, matching the serde representation
    pub fn label(&self) -> &'static str {
        match self {
            IntakeKind::Cigarette => "cigarette",
            IntakeKind::Vape => "vape",
            IntakeKind::Pouch => "pouch",
            IntakeKind::Gum => "gum",
            IntakeKind::Lozenge => "lozenge",
            IntakeKind::Patch => "patch",
        }
    }
}

impl std::str::FromStr for IntakeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cigarette" => Ok(IntakeKind::Cigarette),
            "vape" => Ok(IntakeKind::Vape),
            "pouch" => Ok(IntakeKind::Pouch),
            "gum" => Ok(IntakeKind::Gum),
            "lozenge" => Ok(IntakeKind::Lozenge),
            "patch" => Ok(IntakeKind::Patch),
            other => Err(format!(
                "unknown intake kind '{}' (expected one of: cigarette, vape, pouch, gum, lozenge, patch)",
                other
            )),
        }
    }
}

/// A recorded intake event.
///
/// Events are immutable inputs to every computation: the engine never
/// mutates or persists them. Multiple events may share a timestamp; order
/// among simultaneous events is irrelevant since contributions are summed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntakeEvent {
    pub id: Uuid,
    /// Nominal substance quantity administered, in milligrams
    pub amount_mg: f64,
    pub taken_at: DateTime<Utc>,
    pub kind: Option<IntakeKind>,
    /// Money spent on this event; consumed only by cost aggregation
    pub cost: Option<f64>,
    pub note: Option<String>,
}

/// A hypothetical, not-yet-logged intake used to preview its effect on the
/// concentration curve.
///
/// Passed as an optional extra argument to the summation/series functions so
/// the real event list is never mutated for what-if queries.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedIntake {
    pub amount_mg: f64,
    pub taken_at: DateTime<Utc>,
    pub kind: Option<IntakeKind>,
}

// ============================================================================
// Absorption Profile
// ============================================================================

/// Pharmacokinetic parameters for one intake kind.
///
/// Static configuration, not user data. A zero `peak_time_hours` selects the
/// simple model where decay begins immediately at `amount * peak_factor`;
/// a positive value adds a linear rise to peak before decay starts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AbsorptionProfile {
    /// Time for a contribution to decay to half its value
    pub half_life_hours: f64,
    /// Time from intake to peak absorption; 0 means no rise phase
    #[serde(default)]
    pub peak_time_hours: f64,
    /// Fraction of the nominal amount bioavailable at peak, in (0, 1]
    #[serde(default = "default_peak_factor")]
    pub peak_factor: f64,
}

fn default_peak_factor() -> f64 {
    1.0
}

impl Default for AbsorptionProfile {
    fn default() -> Self {
        Self::simple(crate::profiles::DEFAULT_HALF_LIFE_HOURS)
    }
}

impl AbsorptionProfile {
    /// Plain exponential decay: no rise phase, full bioavailability
    pub fn simple(half_life_hours: f64) -> Self {
        Self {
            half_life_hours,
            peak_time_hours: 0.0,
            peak_factor: 1.0,
        }
    }

    /// Rise-then-decay: linear ramp to `peak_factor * amount` over
    /// `peak_time_hours`, then half-life decay
    pub fn with_peak(half_life_hours: f64, peak_time_hours: f64, peak_factor: f64) -> Self {
        Self {
            half_life_hours,
            peak_time_hours,
            peak_factor,
        }
    }
}

// ============================================================================
// Goal Types
// ============================================================================

/// Category of user goal
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    DailyLimit,
    Reduction,
    QuitDate,
}

impl GoalType {
    pub fn label(&self) -> &'static str {
        match self {
            GoalType::DailyLimit => "daily_limit",
            GoalType::Reduction => "reduction",
            GoalType::QuitDate => "quit_date",
        }
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "daily_limit" => Ok(GoalType::DailyLimit),
            "reduction" => Ok(GoalType::Reduction),
            "quit_date" => Ok(GoalType::QuitDate),
            other => Err(format!(
                "unknown goal type '{}' (expected one of: daily_limit, reduction, quit_date)",
                other
            )),
        }
    }
}

/// A user goal.
///
/// Progress is always derived (see [`crate::goals::goal_progress`]), never
/// stored. Goals may be under-specified during creation flows: a missing
/// `target_value`/`target_date` degrades progress to zero rather than
/// erroring.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub goal_type: GoalType,
    /// Daily amount ceiling in mg (daily-limit goals)
    pub target_value: Option<f64>,
    /// Date the reduction/quit plan completes (time-based goals)
    pub target_date: Option<DateTime<Utc>>,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// User's persisted goals, at most one per goal type
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GoalState {
    pub goals: Vec<Goal>,
}

impl GoalState {
    /// Get the stored goal of the given type, if any
    pub fn get(&self, goal_type: GoalType) -> Option<&Goal> {
        self.goals.iter().find(|g| g.goal_type == goal_type)
    }

    /// Insert a goal, replacing any existing goal of the same type
    pub fn upsert(&mut self, goal: Goal) {
        self.goals.retain(|g| g.goal_type != goal.goal_type);
        self.goals.push(goal);
    }

    /// Remove the goal of the given type; returns whether one existed
    pub fn clear(&mut self, goal_type: GoalType) -> bool {
        let before = self.goals.len();
        self.goals.retain(|g| g.goal_type != goal_type);
        self.goals.len() != before
    }
}
