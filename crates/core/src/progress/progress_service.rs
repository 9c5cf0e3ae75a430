use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use crate::errors::Result;
use crate::notifications::{
    dispatch_best_effort, NotificationDispatcherTrait, NotificationRequest, NotificationTarget,
    NotificationType,
};
use crate::progress::progress_model::{ProgressApplied, ProgressOutcome, StartedTask};
use crate::progress::progress_traits::{ProgressRepositoryTrait, ProgressServiceTrait};
use crate::timers::TaskTimerService;

/// The progress & reward engine service.
///
/// Owns the post-commit notification fan-out and the timed-task entry point.
/// The atomicity of the underlying read-modify-write lives in the repository.
pub struct ProgressService {
    repository: Arc<dyn ProgressRepositoryTrait>,
    dispatcher: Arc<dyn NotificationDispatcherTrait>,
    timers: Arc<TaskTimerService>,
    /// Wall-clock length of one logged minute. Overridable for tests.
    minute: Duration,
}

impl ProgressService {
    pub fn new(
        repository: Arc<dyn ProgressRepositoryTrait>,
        dispatcher: Arc<dyn NotificationDispatcherTrait>,
        timers: Arc<TaskTimerService>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            timers,
            minute: Duration::from_secs(60),
        }
    }

    /// Shrinks the minute for tests exercising timer expiry.
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    /// Applies the progress transaction, then fans out notifications.
    ///
    /// Free-standing so the deferred timer callback can run the same path
    /// without holding a reference to the service itself.
    async fn apply_and_notify(
        repository: Arc<dyn ProgressRepositoryTrait>,
        dispatcher: Arc<dyn NotificationDispatcherTrait>,
        goal_id: &str,
        user_id: &str,
        minutes_completed: i32,
    ) -> Result<ProgressOutcome> {
        let applied = repository
            .apply_progress(goal_id, user_id, minutes_completed)
            .await?;
        Self::notify_progress(dispatcher, &applied);
        Ok(applied.outcome)
    }

    /// Post-commit notification fan-out, best-effort and non-blocking.
    fn notify_progress(dispatcher: Arc<dyn NotificationDispatcherTrait>, applied: &ProgressApplied) {
        let outcome = &applied.outcome;

        dispatch_best_effort(
            dispatcher.clone(),
            NotificationRequest::new(
                NotificationType::ChildProgressUpdate,
                "Progress updated",
                format!(
                    "{} progress on {} is {}%",
                    applied.child_name, applied.goal_title, outcome.child_progress_percent
                ),
                NotificationTarget::parent(&applied.parent_user_id),
            )
            .with_data("goalId", &applied.goal_id)
            .with_data("percent", outcome.child_progress_percent.to_string()),
        );

        if outcome.reward_given > 0 {
            dispatch_best_effort(
                dispatcher.clone(),
                NotificationRequest::new(
                    NotificationType::RewardUnlocked,
                    "Reward unlocked",
                    format!(
                        "You earned {} coins on {}",
                        outcome.reward_given, applied.goal_title
                    ),
                    NotificationTarget::child(&applied.child_id),
                )
                .with_data("goalId", &applied.goal_id),
            );
        }

        if outcome.goal_status == crate::goals::GoalStatus::Completed {
            let message = format!("{} has been completed", applied.goal_title);
            dispatch_best_effort(
                dispatcher.clone(),
                NotificationRequest::new(
                    NotificationType::GoalCompleted,
                    "Goal completed",
                    message.clone(),
                    NotificationTarget::parent(&applied.parent_user_id),
                )
                .with_data("goalId", &applied.goal_id),
            );
            for child_id in &applied.assigned_child_ids {
                dispatch_best_effort(
                    dispatcher.clone(),
                    NotificationRequest::new(
                        NotificationType::GoalCompleted,
                        "Goal completed",
                        message.clone(),
                        NotificationTarget::child(child_id),
                    )
                    .with_data("goalId", &applied.goal_id),
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl ProgressServiceTrait for ProgressService {
    async fn update_progress(
        &self,
        goal_id: &str,
        user_id: &str,
        minutes_completed: i32,
    ) -> Result<ProgressOutcome> {
        Self::apply_and_notify(
            self.repository.clone(),
            self.dispatcher.clone(),
            goal_id,
            user_id,
            minutes_completed,
        )
        .await
    }

    async fn start_task(&self, goal_id: &str, user_id: &str) -> Result<StartedTask> {
        let check = self.repository.prepare_start(goal_id, user_id)?;

        if check.remaining_min == 0 {
            return Ok(StartedTask {
                goal_id: goal_id.to_string(),
                child_id: check.child_id,
                scheduled_ms: 0,
                ends_at: Utc::now(),
                already_completed: true,
            });
        }

        let delay = self.minute * check.remaining_min as u32;
        let key = (goal_id.to_string(), check.child_id.clone());

        let repository = self.repository.clone();
        let dispatcher = self.dispatcher.clone();
        let deferred_goal_id = goal_id.to_string();
        let deferred_user_id = user_id.to_string();
        let remaining = check.remaining_min;

        debug!(
            "Scheduling auto-completion of goal {} for child {} in {} min",
            goal_id, check.child_id, remaining
        );
        self.timers.schedule(key, delay, async move {
            // Deferred completions are best-effort; the goal may have been
            // paused, deleted, or completed by the time the timer fires.
            if let Err(e) = Self::apply_and_notify(
                repository,
                dispatcher,
                &deferred_goal_id,
                &deferred_user_id,
                remaining,
            )
            .await
            {
                warn!(
                    "Deferred completion for goal {} failed: {}",
                    deferred_goal_id, e
                );
            }
        });

        Ok(StartedTask {
            goal_id: goal_id.to_string(),
            child_id: check.child_id,
            scheduled_ms: delay.as_millis() as i64,
            ends_at: Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default(),
            already_completed: false,
        })
    }
}
