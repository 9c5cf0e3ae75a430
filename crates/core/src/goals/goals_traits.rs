use crate::errors::Result;
use crate::goals::goals_model::{
    Actor, AssignmentAction, ChildGoalView, Goal, GoalAssignment, GoalFieldPatch, GoalPatch,
    NewGoal, NewGoalRecord, ParentGoalView,
};
use async_trait::async_trait;

/// Trait for goal repository operations.
///
/// Every mutating method executes as a single atomic transaction; reads apply
/// the `is_deleted = false` default filter unless stated otherwise.
#[async_trait]
pub trait GoalRepositoryTrait: Send + Sync {
    /// Inserts the goal and one assignment per child id in one transaction.
    async fn create_goal_with_assignments(&self, record: NewGoalRecord) -> Result<Goal>;

    /// Loads a goal by id regardless of its soft-delete flag, so callers can
    /// distinguish "missing" from "deleted".
    fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>>;

    /// Non-deleted assignments of a goal.
    fn list_assignments(&self, goal_id: &str) -> Result<Vec<GoalAssignment>>;

    /// Applies field changes and the assignment action in one transaction.
    async fn update_goal_txn(
        &self,
        goal_id: &str,
        fields: GoalFieldPatch,
        action: AssignmentAction,
    ) -> Result<Goal>;

    /// Non-deleted goals authored by the parent, each with its non-deleted
    /// assignments.
    fn list_parent_goals(&self, parent_id: &str) -> Result<Vec<(Goal, Vec<GoalAssignment>)>>;

    /// Non-deleted assignments of a child with their parent goal.
    fn list_child_goals(&self, child_id: &str) -> Result<Vec<(GoalAssignment, Goal)>>;

    /// Resets every assignment of the goal to percentage 0 and the goal's
    /// cached progress to 0. Returns the number of assignments touched.
    async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize>;
}

/// Trait for goal service operations (create/update/authorization and views).
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    async fn create_goal(&self, new_goal: NewGoal, actor: &Actor) -> Result<Goal>;
    async fn update_goal(&self, goal_id: &str, patch: GoalPatch, actor: &Actor) -> Result<Goal>;
    fn get_parent_goals(&self, parent_id: &str) -> Result<Vec<ParentGoalView>>;
    fn get_child_goals(&self, user_id: &str) -> Result<Vec<ChildGoalView>>;
    fn get_goal_details(&self, goal_id: &str, actor: &Actor) -> Result<ParentGoalView>;
    async fn reset_goal(&self, goal_id: &str, actor: &Actor) -> Result<usize>;
}
