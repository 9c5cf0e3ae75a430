//! Scheduled reset service: recurring-goal windows and goal expiry.
//!
//! Recurrence is creation-anchored, not calendar-anchored: a WEEKLY goal
//! resets whenever a whole multiple of 7 days has elapsed since its creation,
//! so two goals created on different days reset on different absolute dates.
//! All resets are idempotent `update many` writes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::goals::GoalType;
use crate::notifications::{
    dispatch_best_effort, NotificationDispatcherTrait, NotificationRequest, NotificationTarget,
    NotificationType,
};

/// An assignment touched by the daily reset, for the reminder fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyResetEntry {
    pub goal_id: String,
    pub goal_title: String,
    pub child_id: String,
}

/// Id and creation anchor of an ACTIVE recurring goal.
#[derive(Debug, Clone)]
pub struct RecurringGoal {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Trait for the reset store operations, each one idempotent write job.
#[async_trait]
pub trait ResetRepositoryTrait: Send + Sync {
    /// Zeroes the percentage of every assignment on ACTIVE, non-deleted
    /// DAILY goals; returns the touched assignments.
    async fn reset_daily_assignments(&self) -> Result<Vec<DailyResetEntry>>;

    /// ACTIVE, non-deleted goals of the given recurring type.
    fn list_recurring_goals(&self, goal_type: GoalType) -> Result<Vec<RecurringGoal>>;

    /// Zeroes the assignments and cached progress of one goal.
    async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize>;

    /// Transitions ACTIVE, non-deleted goals whose end date has passed to
    /// CANCELLED. Rewards already given stay given.
    async fn cancel_expired_goals(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Whole days between two instants, truncated.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_days().abs()
}

/// Periodic reset jobs invoked by the server scheduler (and the manual reset
/// route, via `GoalService`).
pub struct ResetService {
    repository: Arc<dyn ResetRepositoryTrait>,
    dispatcher: Arc<dyn NotificationDispatcherTrait>,
}

impl ResetService {
    pub fn new(
        repository: Arc<dyn ResetRepositoryTrait>,
        dispatcher: Arc<dyn NotificationDispatcherTrait>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Daily reset: zero DAILY-goal assignments and remind each child.
    pub async fn run_daily_reset(&self) -> Result<usize> {
        let entries = self.repository.reset_daily_assignments().await?;
        info!("Daily reset touched {} assignments", entries.len());

        for entry in &entries {
            dispatch_best_effort(
                self.dispatcher.clone(),
                NotificationRequest::new(
                    NotificationType::DailyReminder,
                    "Daily goal reset",
                    format!("A new day for your goal: {}", entry.goal_title),
                    NotificationTarget::child(&entry.child_id),
                )
                .with_data("goalId", &entry.goal_id),
            );
        }
        Ok(entries.len())
    }

    /// Weekly reset: creation-anchored 7-day window.
    pub async fn run_weekly_reset(&self, now: DateTime<Utc>) -> Result<usize> {
        self.run_recurring_reset(GoalType::Weekly, 7, now).await
    }

    /// Monthly reset: creation-anchored 30-day window.
    pub async fn run_monthly_reset(&self, now: DateTime<Utc>) -> Result<usize> {
        self.run_recurring_reset(GoalType::Monthly, 30, now).await
    }

    async fn run_recurring_reset(
        &self,
        goal_type: GoalType,
        period_days: i64,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let goals = self.repository.list_recurring_goals(goal_type)?;
        let mut reset_count = 0;
        for goal in goals {
            if days_between(now, goal.created_at) % period_days == 0 {
                debug!("Resetting {} goal {}", goal_type.as_str(), goal.id);
                self.repository.reset_goal_progress(&goal.id).await?;
                reset_count += 1;
            }
        }
        info!(
            "{} reset touched {} of the active goals",
            goal_type.as_str(),
            reset_count
        );
        Ok(reset_count)
    }

    /// Expiry sweep: past-end-date ACTIVE goals become CANCELLED.
    pub async fn run_expiry_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let cancelled = self.repository.cancel_expired_goals(now).await?;
        if cancelled > 0 {
            info!("Expiry sweep cancelled {} goals", cancelled);
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[test]
    fn days_between_truncates_whole_days() {
        let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        assert_eq!(days_between(base, base), 0);
        assert_eq!(days_between(base + chrono::Duration::hours(23), base), 0);
        assert_eq!(days_between(base + chrono::Duration::days(7), base), 7);
        assert_eq!(
            days_between(base + chrono::Duration::days(7) + chrono::Duration::hours(5), base),
            7
        );
        // Symmetric regardless of argument order.
        assert_eq!(days_between(base, base + chrono::Duration::days(30)), 30);
    }

    #[derive(Default)]
    struct MockResetRepo {
        recurring: Vec<RecurringGoal>,
        reset_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResetRepositoryTrait for MockResetRepo {
        async fn reset_daily_assignments(&self) -> Result<Vec<DailyResetEntry>> {
            Ok(vec![])
        }

        fn list_recurring_goals(&self, _goal_type: GoalType) -> Result<Vec<RecurringGoal>> {
            Ok(self.recurring.clone())
        }

        async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize> {
            self.reset_calls.lock().unwrap().push(goal_id.to_string());
            Ok(1)
        }

        async fn cancel_expired_goals(&self, _now: DateTime<Utc>) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn weekly_reset_is_creation_anchored() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 1, 0, 0).unwrap();
        let repo = Arc::new(MockResetRepo {
            recurring: vec![
                // Created exactly 14 days ago: resets today.
                RecurringGoal {
                    id: "due".into(),
                    created_at: now - chrono::Duration::days(14),
                },
                // Created 10 days ago: not a multiple of 7.
                RecurringGoal {
                    id: "not-due".into(),
                    created_at: now - chrono::Duration::days(10),
                },
            ],
            ..Default::default()
        });
        let service = ResetService::new(
            repo.clone(),
            Arc::new(crate::notifications::NoopDispatcher),
        );

        let count = service.run_weekly_reset(now).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(*repo.reset_calls.lock().unwrap(), vec!["due".to_string()]);
    }
}
