use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use intake_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "halflife")]
#[command(about = "Nicotine intake tracker with a pharmacokinetic bloodstream model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an intake event
    Log {
        /// Amount in milligrams
        #[arg(long)]
        amount: f64,

        /// Route of administration (cigarette, vape, pouch, gum, lozenge, patch)
        #[arg(long)]
        kind: Option<String>,

        /// Money spent on this intake
        #[arg(long, allow_negative_numbers = true)]
        cost: Option<f64>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,

        /// Timestamp (RFC 3339 or YYYY-MM-DD), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Show bloodstream stats (default)
    Status {
        /// Trailing window in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Sample the level curve over a trailing window
    Series {
        /// Trailing window in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Minutes between samples
        #[arg(long, default_value_t = 30)]
        step: u32,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Preview the effect of a hypothetical intake taken right now
    Preview {
        /// Amount in milligrams
        #[arg(long)]
        amount: f64,

        /// Route of administration (cigarette, vape, pouch, gum, lozenge, patch)
        #[arg(long)]
        kind: Option<String>,

        /// Hours of history to include
        #[arg(long, default_value_t = 2)]
        hours_past: i64,

        /// Hours to project forward
        #[arg(long, default_value_t = 6)]
        hours_ahead: i64,

        /// Minutes between samples
        #[arg(long, default_value_t = 15)]
        step: u32,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show spend over the trailing day/week/month
    Costs {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },

    /// Usage histograms by hour of day and by kind
    Usage {
        /// Trailing window in days
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Roll up WAL events to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Create or replace a goal
    Set {
        /// Goal type (daily_limit, reduction, quit_date)
        #[arg(long = "type")]
        goal_type: String,

        /// Target amount in mg per day (daily_limit goals)
        #[arg(long)]
        target_value: Option<f64>,

        /// Target date (RFC 3339 or YYYY-MM-DD) for reduction/quit_date goals
        #[arg(long)]
        target_date: Option<String>,
    },

    /// Show goals and their progress
    Status {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove a goal
    Clear {
        /// Goal type (daily_limit, reduction, quit_date)
        #[arg(long = "type")]
        goal_type: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    intake_core::logging::init_cli(cli.verbose);

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Log {
            amount,
            kind,
            cost,
            note,
            at,
        }) => cmd_log(data_dir, amount, kind, cost, note, at, &config),
        Some(Commands::Status { hours, json }) => cmd_status(data_dir, hours, json, &config),
        Some(Commands::Series { hours, step, json }) => {
            cmd_series(data_dir, hours, step, json, &config)
        }
        Some(Commands::Preview {
            amount,
            kind,
            hours_past,
            hours_ahead,
            step,
            json,
        }) => cmd_preview(data_dir, amount, kind, hours_past, hours_ahead, step, json, &config),
        Some(Commands::Costs { json }) => cmd_costs(data_dir, json, &config),
        Some(Commands::Goal { command }) => cmd_goal(data_dir, command, &config),
        Some(Commands::Usage { days, json }) => cmd_usage(data_dir, days, json, &config),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(data_dir, cleanup),
        None => {
            // Default to "status" command
            cmd_status(data_dir, 24, false, &config)
        }
    }
}

/// On-disk layout under the data directory
struct DataPaths {
    wal_dir: PathBuf,
    wal: PathBuf,
    csv: PathBuf,
    goals: PathBuf,
}

impl DataPaths {
    fn ensure(data_dir: &Path) -> Result<Self> {
        let wal_dir = data_dir.join("wal");
        std::fs::create_dir_all(&wal_dir)?;

        Ok(Self {
            wal: wal_dir.join("intake_events.wal"),
            csv: data_dir.join("events.csv"),
            goals: wal_dir.join("goals.json"),
            wal_dir,
        })
    }
}

/// Build the absorption table from config and refuse to run on a bad one
fn validated_profile_table(config: &Config) -> Result<ProfileTable> {
    let table = config.model.profile_table();
    let errors = table.validate();
    if !errors.is_empty() {
        eprintln!("Absorption profile errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Profile("Invalid absorption profiles".into()));
    }
    Ok(table)
}

fn parse_kind(kind: Option<&str>) -> Result<Option<IntakeKind>> {
    kind.map(|k| k.parse::<IntakeKind>().map_err(Error::Validation))
        .transpose()
}

/// Accepts a full RFC 3339 timestamp or a bare date (midnight UTC)
fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = input.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(Error::Validation(format!(
        "unable to parse '{}' as an RFC 3339 timestamp or YYYY-MM-DD date",
        input
    )))
}

fn cmd_log(
    data_dir: PathBuf,
    amount: f64,
    kind: Option<String>,
    cost: Option<f64>,
    note: Option<String>,
    at: Option<String>,
    config: &Config,
) -> Result<()> {
    // The engine is non-defensive about numerics, so reject garbage here
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(
            "amount must be a positive number of milligrams".into(),
        ));
    }
    if let Some(c) = cost {
        if !c.is_finite() || c < 0.0 {
            return Err(Error::Validation("cost must be a non-negative number".into()));
        }
    }

    let kind = parse_kind(kind.as_deref())?;
    let taken_at = match at {
        Some(ref s) => parse_timestamp(s)?,
        None => Utc::now(),
    };

    let paths = DataPaths::ensure(&data_dir)?;
    let profiles = validated_profile_table(config)?;

    let event = IntakeEvent {
        id: uuid::Uuid::new_v4(),
        amount_mg: amount,
        taken_at,
        kind,
        cost,
        note,
    };

    let mut sink = JsonlSink::new(&paths.wal);
    sink.append(&event)?;

    // Echo the updated level so logging doubles as a quick status check
    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let estimate = level_at(&events, Utc::now(), &profiles, None);

    let kind_label = kind.map(|k| format!(" ({})", k.label())).unwrap_or_default();
    println!("✓ Logged {:.1} mg{}", amount, kind_label);
    println!("  Current level: {:.2} mg", estimate.actual);

    Ok(())
}

fn cmd_status(data_dir: PathBuf, hours: i64, json: bool, config: &Config) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;
    let profiles = validated_profile_table(config)?;
    let window_hours = config.limits.clamp_hours(hours);

    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let opts = StatsOptions {
        window_hours,
        baseline_level: config.model.baseline_level,
        baseline_cap_hours: config.model.baseline_cap_hours,
        ..StatsOptions::default()
    };
    let stats = summarize(&events, Utc::now(), &profiles, &opts);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    display_status(&stats);
    Ok(())
}

fn cmd_series(data_dir: PathBuf, hours: i64, step: u32, json: bool, config: &Config) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;
    let profiles = validated_profile_table(config)?;
    let hours = config.limits.clamp_hours(hours);
    let step = config.limits.clamp_step_minutes(step);

    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let window = SeriesWindow::trailing(Utc::now(), hours, step);
    let series = build_series(&events, &window, &profiles, None);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    println!();
    println!("  TIME (UTC)          LEVEL (mg)");
    for point in &series {
        println!(
            "  {}    {:>7.2}",
            point.at.format("%Y-%m-%d %H:%M"),
            point.level
        );
    }
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_preview(
    data_dir: PathBuf,
    amount: f64,
    kind: Option<String>,
    hours_past: i64,
    hours_ahead: i64,
    step: u32,
    json: bool,
    config: &Config,
) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(
            "amount must be a positive number of milligrams".into(),
        ));
    }
    let kind = parse_kind(kind.as_deref())?;

    let paths = DataPaths::ensure(&data_dir)?;
    let profiles = validated_profile_table(config)?;
    let hours_past = config.limits.clamp_hours(hours_past);
    let hours_ahead = config.limits.clamp_hours(hours_ahead);
    let step = config.limits.clamp_step_minutes(step);

    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let now = Utc::now();
    let simulated = SimulatedIntake {
        amount_mg: amount,
        taken_at: now,
        kind,
    };

    let estimate = level_at(&events, now, &profiles, Some(&simulated));
    let window = SeriesWindow::preview(now, hours_past, hours_ahead, step);
    let series = build_series(&events, &window, &profiles, Some(&simulated));

    if json {
        let payload = serde_json::json!({
            "now": estimate,
            "series": series,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    // Kinds with a rise phase contribute nothing at the instant of intake,
    // so the peak of the projection is the number worth leading with.
    let projected_peak = series
        .iter()
        .filter(|p| p.at >= now)
        .map(|p| p.projected)
        .fold(estimate.projected, f64::max);

    println!();
    println!("  Current level:   {:>7.2} mg", estimate.actual);
    println!("  Projected peak:  {:>7.2} mg", projected_peak);
    println!();
    println!("  TIME (UTC)           ACTUAL   PROJECTED");
    for point in &series {
        let marker = if point.is_future { "  *" } else { "" };
        println!(
            "  {}   {:>7.2}   {:>9.2}{}",
            point.at.format("%Y-%m-%d %H:%M"),
            point.level,
            point.projected,
            marker
        );
    }
    println!();
    println!("  * after now");
    Ok(())
}

fn cmd_costs(data_dir: PathBuf, json: bool, config: &Config) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;
    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let stats = cost_stats(&events, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  SPEND");
    println!("  Last 24 hours:  {:>9.2}", stats.daily);
    println!("  Last 7 days:    {:>9.2}", stats.weekly);
    println!("  Last 30 days:   {:>9.2}", stats.monthly);
    println!();
    Ok(())
}

fn cmd_goal(data_dir: PathBuf, command: GoalCommands, config: &Config) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;

    match command {
        GoalCommands::Set {
            goal_type,
            target_value,
            target_date,
        } => {
            let goal_type: GoalType = goal_type.parse().map_err(Error::Validation)?;
            if let Some(v) = target_value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::Validation(
                        "target value must be a positive number of milligrams".into(),
                    ));
                }
            }
            let target_date = target_date.as_deref().map(parse_timestamp).transpose()?;

            // Under-specified goals are allowed but worth flagging
            match goal_type {
                GoalType::DailyLimit if target_value.is_none() => {
                    eprintln!("note: no --target-value set; progress will stay at 0%");
                }
                GoalType::Reduction | GoalType::QuitDate if target_date.is_none() => {
                    eprintln!("note: no --target-date set; progress will stay at 0%");
                }
                _ => {}
            }

            let now = Utc::now();
            let goal = Goal {
                goal_type,
                target_value,
                target_date,
                start_date: now,
                created_at: now,
            };

            GoalState::update(&paths.goals, |state| {
                state.upsert(goal);
                Ok(())
            })?;

            println!("✓ Goal set: {}", goal_type.label());
            Ok(())
        }

        GoalCommands::Status { json } => {
            let state = GoalState::load(&paths.goals)?;
            if state.goals.is_empty() {
                if json {
                    println!("[]");
                } else {
                    println!("No goals set.");
                }
                return Ok(());
            }

            let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
            let now = Utc::now();

            if json {
                let entries: Vec<_> = state
                    .goals
                    .iter()
                    .map(|goal| {
                        serde_json::json!({
                            "goal": goal,
                            "progress": goal_progress(goal, &events, now),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            for goal in &state.goals {
                let progress = goal_progress(goal, &events, now);
                display_goal(goal, &progress);
            }
            println!();
            Ok(())
        }

        GoalCommands::Clear { goal_type } => {
            let goal_type: GoalType = goal_type.parse().map_err(Error::Validation)?;

            let mut removed = false;
            GoalState::update(&paths.goals, |state| {
                removed = state.clear(goal_type);
                Ok(())
            })?;

            if removed {
                println!("✓ Cleared {} goal", goal_type.label());
            } else {
                println!("No {} goal to clear.", goal_type.label());
            }
            Ok(())
        }
    }
}

fn cmd_usage(data_dir: PathBuf, days: i64, json: bool, config: &Config) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;
    let days = config.limits.clamp_days(days);
    let window_hours = days * 24;

    let events = load_recent_events(&paths.wal, &paths.csv, config.limits.max_days)?;
    let now = Utc::now();
    let by_hour = usage_by_hour(&events, now, window_hours);
    let by_kind = usage_by_kind(&events, now, window_hours);

    if json {
        let payload = serde_json::json!({
            "days": days,
            "by_hour": by_hour,
            "by_kind": by_kind,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!();
    println!("  USAGE BY HOUR (UTC), last {} days", days);
    for (hour, count) in by_hour.iter().enumerate() {
        if *count > 0 {
            println!("  {:02}:00  {:>3}  {}", hour, count, "█".repeat(*count as usize));
        }
    }

    if !by_kind.is_empty() {
        println!();
        println!("  BY KIND");
        for usage in &by_kind {
            let label = usage.kind.map(|k| k.label()).unwrap_or("untagged");
            println!(
                "  {:<10} {:>4} intakes  {:>7.1} mg",
                label, usage.count, usage.total_amount
            );
        }
    }
    println!();
    Ok(())
}

fn cmd_rollup(data_dir: PathBuf, cleanup: bool) -> Result<()> {
    let paths = DataPaths::ensure(&data_dir)?;

    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = intake_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} events to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = intake_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn display_status(stats: &BloodstreamStats) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  BLOODSTREAM STATUS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Current level:     {:>7.2} mg", stats.current_level);
    println!("  Peak today:        {:>7.2} mg", stats.peak_level_today);
    if stats.time_to_baseline_hours > 0.0 {
        println!("  Time to baseline:  {:>7.1} h", stats.time_to_baseline_hours);
    } else {
        println!("  Time to baseline:  at baseline");
    }
    println!();
    println!(
        "  Last {}h: {} intakes, {:.1} mg total",
        stats.window_hours, stats.entries_in_window, stats.total_amount_in_window
    );
    println!("  Today: {} intakes", stats.today_usage_count);
    if let Some(last) = stats.last_intake_at {
        println!("  Last intake: {}", last.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
}

fn display_goal(goal: &Goal, progress: &GoalProgress) {
    println!();
    println!("  {} goal", goal.goal_type.label());
    match goal.goal_type {
        GoalType::DailyLimit => match goal.target_value {
            Some(target) => println!(
                "    {:.1} of {:.1} mg used in the last 24h ({:.0}%)",
                progress.current_value, target, progress.percent_complete
            ),
            None => println!("    no target value set"),
        },
        GoalType::Reduction | GoalType::QuitDate => {
            match (goal.target_date, progress.days_remaining) {
                (Some(date), Some(days)) => println!(
                    "    {} days remaining (until {}), {:.0}% through",
                    days,
                    date.format("%Y-%m-%d"),
                    progress.percent_complete
                ),
                _ => println!("    no target date set"),
            }
        }
    }
    println!("    on track: {}", if progress.on_track { "yes" } else { "no" });
}
