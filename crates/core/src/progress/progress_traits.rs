use crate::errors::Result;
use crate::progress::progress_model::{ProgressApplied, StartedTask, TaskStartCheck};
use async_trait::async_trait;

/// Trait for the progress store: the transactional read-modify-write over
/// one assignment row plus its goal and child profile.
#[async_trait]
pub trait ProgressRepositoryTrait: Send + Sync {
    /// Executes the full progress update as one atomic transaction: resolve
    /// child and assignment, check preconditions, apply the minute delta,
    /// recompute the goal rollup, and credit the reward at most once.
    ///
    /// Implementations must serialize concurrent calls touching the same
    /// assignment; the SQLite implementation runs every write job on a single
    /// writer connection inside an immediate transaction.
    async fn apply_progress(
        &self,
        goal_id: &str,
        user_id: &str,
        minutes_completed: i32,
    ) -> Result<ProgressApplied>;

    /// Performs the start-task early checks and computes the remaining
    /// minutes, without mutating anything.
    fn prepare_start(&self, goal_id: &str, user_id: &str) -> Result<TaskStartCheck>;
}

/// Trait for progress service operations.
#[async_trait]
pub trait ProgressServiceTrait: Send + Sync {
    /// Logs `minutes_completed` for the calling child on a goal and returns
    /// the caller-facing outcome. Notification fan-out happens after commit
    /// and never affects the returned result.
    async fn update_progress(
        &self,
        goal_id: &str,
        user_id: &str,
        minutes_completed: i32,
    ) -> Result<crate::progress::ProgressOutcome>;

    /// Starts a timed task: schedules a deferred progress update for the
    /// remaining duration, replacing any pending timer for the assignment.
    async fn start_task(&self, goal_id: &str, user_id: &str) -> Result<StartedTask>;
}
