//! Progress engine wire and internal models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goals::GoalStatus;

/// Body of a progress update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInput {
    pub minutes_completed: i32,
}

/// Result object returned to the caller after a progress update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutcome {
    pub child_progress_percent: i32,
    pub child_minutes_logged: i32,
    pub child_completed: bool,
    pub goal_status: GoalStatus,
    /// Coins credited by this update; 0 unless this call crossed 100%.
    pub reward_given: i64,
    pub average_progress: i32,
    pub completed_count: usize,
    pub total_children: usize,
}

/// Everything the service needs after the transaction committed: the caller
/// outcome plus the context for notification fan-out.
#[derive(Debug, Clone)]
pub struct ProgressApplied {
    pub outcome: ProgressOutcome,
    pub goal_id: String,
    pub goal_title: String,
    /// The goal author, recipient of the progress-update notification.
    pub parent_user_id: String,
    pub child_id: String,
    pub child_name: String,
    /// All assigned child ids, for the goal-completed fan-out.
    pub assigned_child_ids: Vec<String>,
}

/// Snapshot taken when a timed task is started.
#[derive(Debug, Clone)]
pub struct TaskStartCheck {
    pub child_id: String,
    pub remaining_min: i32,
}

/// Response of the start-task endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedTask {
    pub goal_id: String,
    pub child_id: String,
    pub scheduled_ms: i64,
    pub ends_at: DateTime<Utc>,
    pub already_completed: bool,
}
