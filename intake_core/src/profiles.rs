//! Default absorption profile table.
//!
//! Maps each intake kind to the pharmacokinetic parameters governing its
//! rise/decay shape. The table is an explicit configuration object passed
//! into the engine (never a global the formulas reach for), so the model
//! stays portable and testable without import-time side effects.

use crate::types::{AbsorptionProfile, IntakeKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Domain default half-life for nicotine, in hours
pub const DEFAULT_HALF_LIFE_HOURS: f64 = 2.0;

/// Level treated as "effectively zero" for time-to-baseline calculations
pub const DEFAULT_BASELINE_LEVEL: f64 = 0.5;

/// Per-kind absorption profiles plus a fallback for untagged events
#[derive(Clone, Debug)]
pub struct ProfileTable {
    profiles: HashMap<IntakeKind, AbsorptionProfile>,
    fallback: AbsorptionProfile,
}

impl ProfileTable {
    /// Create an empty table with the given fallback profile
    pub fn new(fallback: AbsorptionProfile) -> Self {
        Self {
            profiles: HashMap::new(),
            fallback,
        }
    }

    /// Set the profile for a kind, replacing any existing entry
    pub fn insert(&mut self, kind: IntakeKind, profile: AbsorptionProfile) {
        self.profiles.insert(kind, profile);
    }

    /// Resolve the profile for an event's kind.
    ///
    /// Total: untagged events and kinds without an entry resolve to the
    /// fallback profile.
    pub fn lookup(&self, kind: Option<IntakeKind>) -> &AbsorptionProfile {
        kind.and_then(|k| self.profiles.get(&k))
            .unwrap_or(&self.fallback)
    }

    /// The profile used for untagged events
    pub fn fallback_profile(&self) -> &AbsorptionProfile {
        &self.fallback
    }

    /// Validate the table for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut check = |name: &str, profile: &AbsorptionProfile| {
            if !(profile.half_life_hours > 0.0) || !profile.half_life_hours.is_finite() {
                errors.push(format!(
                    "Profile '{}' has non-positive half-life {}",
                    name, profile.half_life_hours
                ));
            }
            if !(profile.peak_time_hours >= 0.0) || !profile.peak_time_hours.is_finite() {
                errors.push(format!(
                    "Profile '{}' has negative peak time {}",
                    name, profile.peak_time_hours
                ));
            }
            if !(profile.peak_factor > 0.0 && profile.peak_factor <= 1.0) {
                errors.push(format!(
                    "Profile '{}' has peak factor {} outside (0, 1]",
                    name, profile.peak_factor
                ));
            }
        };

        check("default", &self.fallback);
        for (kind, profile) in &self.profiles {
            check(kind.label(), profile);
        }

        errors
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new(AbsorptionProfile::default())
    }
}

/// Cached default table - built once and reused across all operations
static DEFAULT_TABLE: Lazy<ProfileTable> = Lazy::new(build_default_profile_table_internal);

/// Get a reference to the cached default profile table
pub fn get_default_profile_table() -> &'static ProfileTable {
    &DEFAULT_TABLE
}

/// Builds the default table with built-in per-kind profiles
///
/// **Note**: For production use, prefer `get_default_profile_table()` which
/// returns a cached reference. This function is retained for testing and
/// custom table creation.
pub fn build_default_profile_table() -> ProfileTable {
    build_default_profile_table_internal()
}

fn build_default_profile_table_internal() -> ProfileTable {
    build_profile_table(DEFAULT_HALF_LIFE_HOURS)
}

/// Builds a table with the built-in per-kind absorption shapes at the given
/// elimination half-life.
///
/// Elimination half-life is a property of the substance, while the kinds
/// differ only in how fast and how completely they absorb, so one half-life
/// value drives every entry.
pub fn build_profile_table(half_life_hours: f64) -> ProfileTable {
    let mut table = ProfileTable::new(AbsorptionProfile::simple(half_life_hours));

    // Inhaled routes hit the bloodstream within minutes.
    table.insert(
        IntakeKind::Cigarette,
        AbsorptionProfile::with_peak(half_life_hours, 0.1, 0.9),
    );
    table.insert(
        IntakeKind::Vape,
        AbsorptionProfile::with_peak(half_life_hours, 0.15, 0.75),
    );

    // Oral/mucosal routes absorb over roughly half an hour at reduced
    // bioavailability.
    table.insert(
        IntakeKind::Pouch,
        AbsorptionProfile::with_peak(half_life_hours, 0.5, 0.65),
    );
    table.insert(
        IntakeKind::Gum,
        AbsorptionProfile::with_peak(half_life_hours, 0.5, 0.55),
    );
    table.insert(
        IntakeKind::Lozenge,
        AbsorptionProfile::with_peak(half_life_hours, 0.4, 0.6),
    );

    // Transdermal is far slower on both ends.
    table.insert(
        IntakeKind::Patch,
        AbsorptionProfile::with_peak(half_life_hours, 2.0, 0.7),
    );

    table
}
