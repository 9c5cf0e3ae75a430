use std::sync::Arc;

use log::debug;

use crate::errors::{Error, Result, ValidationError};
use crate::goals::goals_model::{
    Actor, AssignmentAction, ChildGoalView, Goal, GoalFieldPatch, GoalPatch, NewGoal,
    NewGoalRecord, ParentGoalView,
};
use crate::goals::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::notifications::{
    dispatch_best_effort, NotificationDispatcherTrait, NotificationRequest, NotificationTarget,
    NotificationType,
};
use crate::profiles::{ChildProfile, ChildProfileRepositoryTrait};
use crate::progress::compute_rollup;

/// Service for goal creation, updates, and the parent/child views.
pub struct GoalService {
    repository: Arc<dyn GoalRepositoryTrait>,
    profiles: Arc<dyn ChildProfileRepositoryTrait>,
    dispatcher: Arc<dyn NotificationDispatcherTrait>,
}

impl GoalService {
    pub fn new(
        repository: Arc<dyn GoalRepositoryTrait>,
        profiles: Arc<dyn ChildProfileRepositoryTrait>,
        dispatcher: Arc<dyn NotificationDispatcherTrait>,
    ) -> Self {
        Self {
            repository,
            profiles,
            dispatcher,
        }
    }

    fn child_profile(&self, user_id: &str) -> Result<ChildProfile> {
        self.profiles
            .get_by_user_id(user_id)?
            .ok_or_else(|| Error::NotFound("Child profile not found".to_string()))
    }

    fn validate_new_goal(new_goal: &NewGoal) -> Result<()> {
        if new_goal.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()).into());
        }
        if new_goal.reward_coins < 0 {
            return Err(
                ValidationError::InvalidInput("rewardCoins must be >= 0".to_string()).into(),
            );
        }
        if new_goal.duration_min < 1 {
            return Err(
                ValidationError::InvalidInput("durationMin must be >= 1".to_string()).into(),
            );
        }
        if new_goal.assigned_child_ids.is_empty() {
            return Err(ValidationError::MissingField("assignedChildIds".to_string()).into());
        }
        Ok(())
    }

    fn validate_patch(patch: &GoalPatch) -> Result<()> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(ValidationError::InvalidInput("title must not be empty".to_string()).into());
            }
        }
        if patch.reward_coins.is_some_and(|c| c < 0) {
            return Err(
                ValidationError::InvalidInput("rewardCoins must be >= 0".to_string()).into(),
            );
        }
        if patch.duration_min.is_some_and(|d| d < 1) {
            return Err(
                ValidationError::InvalidInput("durationMin must be >= 1".to_string()).into(),
            );
        }
        if patch
            .assigned_child_ids
            .as_ref()
            .is_some_and(|ids| ids.is_empty())
        {
            return Err(
                ValidationError::InvalidInput("assignedChildIds must not be empty".to_string())
                    .into(),
            );
        }
        Ok(())
    }

    /// Fields a CHILD author may never touch. Field presence alone trips the
    /// check, regardless of the value.
    fn check_child_forbidden_fields(patch: &GoalPatch) -> Result<()> {
        let forbidden: [(&str, bool); 8] = [
            ("rewardCoins", patch.reward_coins.is_some()),
            ("durationMin", patch.duration_min.is_some()),
            ("type", patch.goal_type.is_some()),
            ("status", patch.status.is_some()),
            ("assignedChildIds", patch.assigned_child_ids.is_some()),
            ("isDeleted", patch.is_deleted.is_some()),
            ("startDate", patch.start_date.is_some()),
            ("endDate", patch.end_date.is_some()),
        ];
        for (field, touched) in forbidden {
            if touched {
                return Err(Error::Forbidden(format!("Children cannot update {}", field)));
            }
        }
        Ok(())
    }

    fn notify_assigned(
        &self,
        child_ids: &[String],
        notification_type: NotificationType,
        title: &str,
        message: &str,
        goal_id: &str,
    ) {
        for child_id in child_ids {
            dispatch_best_effort(
                self.dispatcher.clone(),
                NotificationRequest::new(
                    notification_type,
                    title,
                    message,
                    NotificationTarget::child(child_id),
                )
                .with_data("goalId", goal_id),
            );
        }
    }

    fn view_from(goal: Goal, assignments: Vec<crate::goals::GoalAssignment>) -> ParentGoalView {
        let percentages: Vec<i32> = assignments.iter().map(|a| a.percentage).collect();
        let rollup = compute_rollup(&percentages);
        ParentGoalView {
            goal,
            assignments,
            average_progress: rollup.average_progress,
            completed_count: rollup.completed_count,
            total_children: rollup.total_children,
        }
    }
}

#[async_trait::async_trait]
impl GoalServiceTrait for GoalService {
    async fn create_goal(&self, new_goal: NewGoal, actor: &Actor) -> Result<Goal> {
        Self::validate_new_goal(&new_goal)?;

        let mut assigned_child_ids = new_goal.assigned_child_ids.clone();
        if actor.is_child() {
            let profile = self.child_profile(&actor.user_id)?;
            if !profile.create_goals {
                return Err(Error::Forbidden(
                    "You are not allowed to create goals".to_string(),
                ));
            }
            // A child can only assign themselves; accept their user id or
            // profile id and normalize to the profile id.
            if assigned_child_ids
                .iter()
                .any(|id| id != &actor.user_id && id != &profile.id)
            {
                return Err(Error::Forbidden(
                    "Children cannot assign goals to other children".to_string(),
                ));
            }
            assigned_child_ids = vec![profile.id.clone()];
        }

        debug!(
            "Creating goal '{}' by {} ({} children)",
            new_goal.title,
            actor.user_id,
            assigned_child_ids.len()
        );

        let record = NewGoalRecord {
            author_id: actor.user_id.clone(),
            author_role: actor.role,
            title: new_goal.title,
            description: new_goal.description,
            goal_type: new_goal.goal_type,
            reward_coins: new_goal.reward_coins,
            duration_min: new_goal.duration_min,
            start_date: new_goal.start_date,
            end_date: new_goal.end_date,
            assigned_child_ids: assigned_child_ids.clone(),
        };
        let goal = self.repository.create_goal_with_assignments(record).await?;

        self.notify_assigned(
            &assigned_child_ids,
            NotificationType::GoalCreated,
            "New goal assigned",
            &format!("You have a new goal: {}", goal.title),
            &goal.id,
        );
        Ok(goal)
    }

    async fn update_goal(&self, goal_id: &str, patch: GoalPatch, actor: &Actor) -> Result<Goal> {
        Self::validate_patch(&patch)?;

        let existing = self
            .repository
            .get_goal(goal_id)?
            .ok_or_else(|| Error::NotFound("Goal not found".to_string()))?;
        if existing.is_deleted {
            return Err(Error::InvalidState("Goal is deleted".to_string()));
        }

        if actor.is_child() {
            let profile = self.child_profile(&actor.user_id)?;
            let assignments = self.repository.list_assignments(goal_id)?;
            if !assignments.iter().any(|a| a.child_id == profile.id) {
                return Err(Error::Forbidden(
                    "You are not assigned to this goal".to_string(),
                ));
            }
            if !profile.create_goals {
                return Err(Error::Forbidden("You cannot update goals".to_string()));
            }
            Self::check_child_forbidden_fields(&patch)?;
        }

        // Parent soft delete cascades to every assignment instead of
        // applying field updates.
        let action = if actor.is_parent() && patch.is_deleted == Some(true) {
            AssignmentAction::CascadeDelete
        } else if actor.is_parent() {
            match &patch.assigned_child_ids {
                Some(ids) => AssignmentAction::Replace(ids.clone()),
                None => AssignmentAction::Keep,
            }
        } else {
            AssignmentAction::Keep
        };

        let fields = GoalFieldPatch {
            title: patch.title,
            description: patch.description,
            goal_type: patch.goal_type,
            status: patch.status,
            reward_coins: patch.reward_coins,
            duration_min: patch.duration_min,
            // An explicit null clears nothing; only concrete dates are applied.
            start_date: patch.start_date.flatten(),
            end_date: patch.end_date.flatten(),
        };

        let updated = self
            .repository
            .update_goal_txn(goal_id, fields, action)
            .await?;

        let assigned: Vec<String> = self
            .repository
            .list_assignments(goal_id)?
            .into_iter()
            .map(|a| a.child_id)
            .collect();
        self.notify_assigned(
            &assigned,
            NotificationType::GoalUpdated,
            "Goal updated",
            &format!("Your goal was updated: {}", updated.title),
            goal_id,
        );
        Ok(updated)
    }

    fn get_parent_goals(&self, parent_id: &str) -> Result<Vec<ParentGoalView>> {
        let goals = self.repository.list_parent_goals(parent_id)?;
        Ok(goals
            .into_iter()
            .map(|(goal, assignments)| Self::view_from(goal, assignments))
            .collect())
    }

    fn get_child_goals(&self, user_id: &str) -> Result<Vec<ChildGoalView>> {
        let profile = self
            .profiles
            .get_by_user_id(user_id)?
            .ok_or_else(|| Error::NotFound("Child not found".to_string()))?;
        let rows = self.repository.list_child_goals(&profile.id)?;
        Ok(rows
            .into_iter()
            .map(|(assignment, goal)| ChildGoalView { assignment, goal })
            .collect())
    }

    fn get_goal_details(&self, goal_id: &str, actor: &Actor) -> Result<ParentGoalView> {
        let goal = self
            .repository
            .get_goal(goal_id)?
            .filter(|g| !g.is_deleted)
            .ok_or_else(|| Error::NotFound("Goal not found".to_string()))?;
        let assignments = self.repository.list_assignments(goal_id)?;

        if actor.is_child() {
            let profile = self.child_profile(&actor.user_id)?;
            if !assignments.iter().any(|a| a.child_id == profile.id) {
                return Err(Error::Forbidden(
                    "You are not assigned to this goal".to_string(),
                ));
            }
        }
        Ok(Self::view_from(goal, assignments))
    }

    async fn reset_goal(&self, goal_id: &str, actor: &Actor) -> Result<usize> {
        let goal = self
            .repository
            .get_goal(goal_id)?
            .filter(|g| !g.is_deleted)
            .ok_or_else(|| Error::NotFound("Goal not found".to_string()))?;
        if !actor.is_parent() || goal.author_id != actor.user_id {
            return Err(Error::Forbidden(
                "Only the goal's author can reset it".to_string(),
            ));
        }
        self.repository.reset_goal_progress(goal_id).await
    }
}
