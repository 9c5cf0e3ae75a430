//! Pure progress math for the reward engine.
//!
//! Percentage is the stored source of truth; minutes are derived on demand.
//! Every conversion rounds half away from zero, so repeated small increments
//! can accumulate rounding drift. That drift is accepted and not corrected.

use crate::errors::{Error, Result};
use crate::goals::{Goal, GoalStatus};

/// Outcome of applying a minute delta to one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressComputation {
    pub previous_percentage: i32,
    pub new_percentage: i32,
    pub new_minutes: i32,
    pub child_completed: bool,
    /// True exactly when this delta crossed the 100% line. The reward guard:
    /// evaluated on the percentage read-and-written atomically inside the
    /// write transaction, so concurrent updates cannot both observe it.
    pub just_completed: bool,
}

/// Goal-level rollup over the non-deleted assignment percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    pub average_progress: i32,
    pub completed_count: usize,
    pub total_children: usize,
    pub global_completed: bool,
}

/// Round half away from zero, the convention used at every conversion step.
pub fn round_half_away(value: f64) -> i32 {
    value.round() as i32
}

/// Converts a stored percentage back into logged minutes.
pub fn minutes_from_percentage(percentage: i32, duration_min: i32) -> i32 {
    round_half_away(f64::from(percentage) / 100.0 * f64::from(duration_min))
}

/// Minutes still required before the assignment reaches the full duration.
pub fn remaining_minutes(percentage: i32, duration_min: i32) -> i32 {
    (duration_min - minutes_from_percentage(percentage, duration_min)).max(0)
}

/// Applies a minute delta to the current percentage.
///
/// The new minute total is clamped to `duration_min`, so a single oversized
/// report cannot over-credit, and replays at 100% are no-ops.
pub fn apply_minutes(
    current_percentage: i32,
    minutes_completed: i32,
    duration_min: i32,
) -> ProgressComputation {
    let current_minutes = minutes_from_percentage(current_percentage, duration_min);
    // Saturating: a delta near i32::MAX on top of prior minutes must clamp,
    // not wrap.
    let new_minutes = current_minutes
        .saturating_add(minutes_completed)
        .min(duration_min);
    let new_percentage = round_half_away(f64::from(new_minutes) / f64::from(duration_min) * 100.0);
    let child_completed = new_percentage >= 100;
    let just_completed = child_completed && current_percentage < 100;
    ProgressComputation {
        previous_percentage: current_percentage,
        new_percentage,
        new_minutes,
        child_completed,
        just_completed,
    }
}

/// Computes the goal-level rollup from assignment percentages.
///
/// Zero assignments yield an average of 0 (divisor-1 guard) and never count
/// as globally completed.
pub fn compute_rollup(percentages: &[i32]) -> Rollup {
    let total_children = percentages.len();
    let completed_count = percentages.iter().filter(|p| **p >= 100).count();
    let sum: i64 = percentages.iter().map(|p| i64::from(*p)).sum();
    let divisor = total_children.max(1) as f64;
    let average_progress = round_half_away(sum as f64 / divisor);
    Rollup {
        average_progress,
        completed_count,
        total_children,
        global_completed: total_children > 0 && completed_count == total_children,
    }
}

/// Early checks shared by progress updates, evaluated before any percentage
/// is read or written.
pub fn check_progress_preconditions(goal: &Goal, minutes_completed: i32) -> Result<()> {
    if goal.status == GoalStatus::Paused {
        return Err(Error::InvalidState("Goal is paused".to_string()));
    }
    if minutes_completed <= 0 {
        return Err(Error::InvalidInput(
            "minutesCompleted must be > 0".to_string(),
        ));
    }
    if goal.duration_min <= 0 {
        return Err(Error::InvalidState("Goal duration is not set".to_string()));
    }
    Ok(())
}

/// Early checks for starting a timed task. Mirrors the progress checks and
/// additionally rejects goals that already completed globally.
pub fn check_start_preconditions(goal: &Goal) -> Result<()> {
    if goal.status == GoalStatus::Paused {
        return Err(Error::InvalidState("Goal is paused".to_string()));
    }
    if goal.status == GoalStatus::Completed {
        return Err(Error::InvalidState("Goal is completed".to_string()));
    }
    if goal.duration_min <= 0 {
        return Err(Error::InvalidState("Goal duration is not set".to_string()));
    }
    Ok(())
}
