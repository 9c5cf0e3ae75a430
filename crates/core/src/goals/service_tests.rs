//! Tests for GoalService authorization and lifecycle rules over an
//! in-memory repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::goals::{
    Actor, ActorRole, AssignmentAction, Goal, GoalAssignment, GoalFieldPatch, GoalPatch,
    GoalRepositoryTrait, GoalService, GoalServiceTrait, GoalStatus, GoalType, NewGoal,
    NewGoalRecord,
};
use crate::notifications::NoopDispatcher;
use crate::profiles::{ChildProfile, ChildProfileRepositoryTrait, NewChildProfile};

// =========================================================================
// In-memory repositories
// =========================================================================

#[derive(Default)]
struct MockGoalRepo {
    goals: Mutex<HashMap<String, Goal>>,
    assignments: Mutex<Vec<GoalAssignment>>,
}

impl MockGoalRepo {
    fn assignment(goal_id: &str, child_id: &str, percentage: i32) -> GoalAssignment {
        GoalAssignment {
            id: Uuid::new_v4().to_string(),
            goal_id: goal_id.to_string(),
            child_id: child_id.to_string(),
            percentage,
            reward_given: false,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn seed_goal(&self, goal: Goal, child_ids: &[&str]) {
        for child_id in child_ids {
            self.assignments
                .lock()
                .unwrap()
                .push(Self::assignment(&goal.id, child_id, 0));
        }
        self.goals.lock().unwrap().insert(goal.id.clone(), goal);
    }

    fn set_percentage(&self, goal_id: &str, child_id: &str, percentage: i32) {
        for a in self.assignments.lock().unwrap().iter_mut() {
            if a.goal_id == goal_id && a.child_id == child_id {
                a.percentage = percentage;
            }
        }
    }
}

#[async_trait]
impl GoalRepositoryTrait for MockGoalRepo {
    async fn create_goal_with_assignments(&self, record: NewGoalRecord) -> Result<Goal> {
        let goal = Goal {
            id: Uuid::new_v4().to_string(),
            author_id: record.author_id,
            author_role: record.author_role,
            title: record.title,
            description: record.description,
            goal_type: record.goal_type,
            status: GoalStatus::Active,
            reward_coins: record.reward_coins,
            duration_min: record.duration_min,
            start_date: record.start_date,
            end_date: record.end_date,
            progress: 0,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        for child_id in &record.assigned_child_ids {
            self.assignments
                .lock()
                .unwrap()
                .push(Self::assignment(&goal.id, child_id, 0));
        }
        self.goals
            .lock()
            .unwrap()
            .insert(goal.id.clone(), goal.clone());
        Ok(goal)
    }

    fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>> {
        Ok(self.goals.lock().unwrap().get(goal_id).cloned())
    }

    fn list_assignments(&self, goal_id: &str) -> Result<Vec<GoalAssignment>> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.goal_id == goal_id && !a.is_deleted)
            .cloned()
            .collect())
    }

    async fn update_goal_txn(
        &self,
        goal_id: &str,
        fields: GoalFieldPatch,
        action: AssignmentAction,
    ) -> Result<Goal> {
        let mut goals = self.goals.lock().unwrap();
        let goal = goals
            .get_mut(goal_id)
            .ok_or_else(|| Error::NotFound("Goal not found".to_string()))?;

        match action {
            AssignmentAction::CascadeDelete => {
                goal.is_deleted = true;
                for a in self.assignments.lock().unwrap().iter_mut() {
                    if a.goal_id == goal_id {
                        a.is_deleted = true;
                    }
                }
            }
            AssignmentAction::Replace(child_ids) => {
                self.apply_fields(goal, fields);
                let mut assignments = self.assignments.lock().unwrap();
                assignments.retain(|a| a.goal_id != goal_id);
                for child_id in &child_ids {
                    assignments.push(Self::assignment(goal_id, child_id, 0));
                }
            }
            AssignmentAction::Keep => {
                self.apply_fields(goal, fields);
            }
        }
        Ok(goal.clone())
    }

    fn list_parent_goals(&self, parent_id: &str) -> Result<Vec<(Goal, Vec<GoalAssignment>)>> {
        let goals = self.goals.lock().unwrap();
        let assignments = self.assignments.lock().unwrap();
        Ok(goals
            .values()
            .filter(|g| g.author_id == parent_id && !g.is_deleted)
            .map(|g| {
                let assigned = assignments
                    .iter()
                    .filter(|a| a.goal_id == g.id && !a.is_deleted)
                    .cloned()
                    .collect();
                (g.clone(), assigned)
            })
            .collect())
    }

    fn list_child_goals(&self, child_id: &str) -> Result<Vec<(GoalAssignment, Goal)>> {
        let goals = self.goals.lock().unwrap();
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.child_id == child_id && !a.is_deleted)
            .filter_map(|a| goals.get(&a.goal_id).map(|g| (a.clone(), g.clone())))
            .collect())
    }

    async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize> {
        let mut count = 0;
        for a in self.assignments.lock().unwrap().iter_mut() {
            if a.goal_id == goal_id && !a.is_deleted {
                a.percentage = 0;
                count += 1;
            }
        }
        if let Some(goal) = self.goals.lock().unwrap().get_mut(goal_id) {
            goal.progress = 0;
        }
        Ok(count)
    }
}

impl MockGoalRepo {
    fn apply_fields(&self, goal: &mut Goal, fields: GoalFieldPatch) {
        if let Some(title) = fields.title {
            goal.title = title;
        }
        if let Some(description) = fields.description {
            goal.description = Some(description);
        }
        if let Some(goal_type) = fields.goal_type {
            goal.goal_type = goal_type;
        }
        if let Some(status) = fields.status {
            goal.status = status;
        }
        if let Some(reward_coins) = fields.reward_coins {
            goal.reward_coins = reward_coins;
        }
        if let Some(duration_min) = fields.duration_min {
            goal.duration_min = duration_min;
        }
        goal.updated_at = Utc::now();
    }
}

#[derive(Default)]
struct MockProfileRepo {
    profiles: Mutex<Vec<ChildProfile>>,
}

impl MockProfileRepo {
    fn seed(&self, id: &str, user_id: &str, create_goals: bool) {
        self.profiles.lock().unwrap().push(ChildProfile {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("child-{}", id),
            coins: 0,
            completed_tasks: 0,
            create_goals,
            approve_tasks: false,
            edit_profile: false,
            delete_goals: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }
}

#[async_trait]
impl ChildProfileRepositoryTrait for MockProfileRepo {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<ChildProfile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    fn get_by_id(&self, profile_id: &str) -> Result<Option<ChildProfile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == profile_id)
            .cloned())
    }

    async fn insert(&self, new_profile: NewChildProfile) -> Result<ChildProfile> {
        let profile = ChildProfile {
            id: Uuid::new_v4().to_string(),
            user_id: new_profile.user_id,
            name: new_profile.name,
            coins: 0,
            completed_tasks: 0,
            create_goals: new_profile.create_goals,
            approve_tasks: new_profile.approve_tasks,
            edit_profile: new_profile.edit_profile,
            delete_goals: new_profile.delete_goals,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.profiles.lock().unwrap().push(profile.clone());
        Ok(profile)
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn make_service() -> (Arc<MockGoalRepo>, Arc<MockProfileRepo>, GoalService) {
    let repo = Arc::new(MockGoalRepo::default());
    let profiles = Arc::new(MockProfileRepo::default());
    let service = GoalService::new(repo.clone(), profiles.clone(), Arc::new(NoopDispatcher));
    (repo, profiles, service)
}

fn parent() -> Actor {
    Actor::new("parent-1", ActorRole::Parent)
}

fn parent_goal(id: &str) -> Goal {
    Goal {
        id: id.to_string(),
        author_id: "parent-1".to_string(),
        author_role: ActorRole::Parent,
        title: "Read a book".to_string(),
        description: None,
        goal_type: GoalType::OneTime,
        status: GoalStatus::Active,
        reward_coins: 10,
        duration_min: 60,
        start_date: None,
        end_date: None,
        progress: 0,
        is_deleted: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn new_goal(assigned: &[&str]) -> NewGoal {
    NewGoal {
        title: "Practice piano".to_string(),
        description: None,
        goal_type: GoalType::Daily,
        reward_coins: 5,
        duration_min: 30,
        start_date: None,
        end_date: None,
        assigned_child_ids: assigned.iter().map(|s| s.to_string()).collect(),
    }
}

// =========================================================================
// create_goal
// =========================================================================

#[tokio::test]
async fn child_without_create_permission_is_forbidden() {
    let (_repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", false);

    let result = service
        .create_goal(new_goal(&["child-1"]), &Actor::new("user-c1", ActorRole::Child))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn child_cannot_assign_other_children() {
    let (_repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", true);
    profiles.seed("child-2", "user-c2", true);

    let result = service
        .create_goal(
            new_goal(&["child-1", "child-2"]),
            &Actor::new("user-c1", ActorRole::Child),
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn child_self_assignment_normalizes_to_profile_id() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", true);

    // The child passes their own user id; the assignment is stored against
    // the profile id.
    let goal = service
        .create_goal(new_goal(&["user-c1"]), &Actor::new("user-c1", ActorRole::Child))
        .await
        .unwrap();

    let assignments = repo.list_assignments(&goal.id).unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].child_id, "child-1");
    assert_eq!(assignments[0].percentage, 0);
    assert!(!assignments[0].reward_given);
}

#[tokio::test]
async fn child_without_profile_is_not_found() {
    let (_repo, _profiles, service) = make_service();
    let result = service
        .create_goal(new_goal(&["child-1"]), &Actor::new("user-cx", ActorRole::Child))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn parent_creates_goal_with_one_assignment_per_child() {
    let (repo, _profiles, service) = make_service();
    let goal = service
        .create_goal(new_goal(&["child-1", "child-2", "child-3"]), &parent())
        .await
        .unwrap();

    assert_eq!(goal.status, GoalStatus::Active);
    assert_eq!(repo.list_assignments(&goal.id).unwrap().len(), 3);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let (_repo, _profiles, service) = make_service();

    let mut no_children = new_goal(&[]);
    no_children.assigned_child_ids.clear();
    assert!(matches!(
        service.create_goal(no_children, &parent()).await,
        Err(Error::Validation(_))
    ));

    let mut bad_duration = new_goal(&["child-1"]);
    bad_duration.duration_min = 0;
    assert!(matches!(
        service.create_goal(bad_duration, &parent()).await,
        Err(Error::Validation(_))
    ));

    let mut negative_coins = new_goal(&["child-1"]);
    negative_coins.reward_coins = -1;
    assert!(matches!(
        service.create_goal(negative_coins, &parent()).await,
        Err(Error::Validation(_))
    ));
}

// =========================================================================
// update_goal
// =========================================================================

#[tokio::test]
async fn update_missing_goal_is_not_found() {
    let (_repo, _profiles, service) = make_service();
    let result = service
        .update_goal("nope", GoalPatch::default(), &parent())
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn update_deleted_goal_is_invalid_state() {
    let (repo, _profiles, service) = make_service();
    let mut goal = parent_goal("g1");
    goal.is_deleted = true;
    repo.seed_goal(goal, &[]);

    let result = service
        .update_goal("g1", GoalPatch::default(), &parent())
        .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn child_patch_touching_reward_coins_is_forbidden() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", true);
    repo.seed_goal(parent_goal("g1"), &["child-1"]);

    // A valid title alongside the forbidden field does not save the patch.
    let patch = GoalPatch {
        title: Some("New title".to_string()),
        reward_coins: Some(100),
        ..Default::default()
    };
    let result = service
        .update_goal("g1", patch, &Actor::new("user-c1", ActorRole::Child))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn child_patch_with_explicit_null_date_is_forbidden() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", true);
    repo.seed_goal(parent_goal("g1"), &["child-1"]);

    // An explicit null is still field presence on the wire.
    let patch: GoalPatch =
        serde_json::from_str(r#"{"title": "New title", "startDate": null}"#).unwrap();
    assert_eq!(patch.start_date, Some(None));

    let result = service
        .update_goal("g1", patch, &Actor::new("user-c1", ActorRole::Child))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn child_not_assigned_is_forbidden() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-2", "user-c2", true);
    repo.seed_goal(parent_goal("g1"), &["child-1"]);

    let patch = GoalPatch {
        title: Some("Hack".to_string()),
        ..Default::default()
    };
    let result = service
        .update_goal("g1", patch, &Actor::new("user-c2", ActorRole::Child))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn assigned_child_with_permission_updates_title() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-1", "user-c1", true);
    repo.seed_goal(parent_goal("g1"), &["child-1"]);

    let patch = GoalPatch {
        title: Some("Read two books".to_string()),
        ..Default::default()
    };
    let updated = service
        .update_goal("g1", patch, &Actor::new("user-c1", ActorRole::Child))
        .await
        .unwrap();
    assert_eq!(updated.title, "Read two books");
}

#[tokio::test]
async fn parent_soft_delete_cascades_to_assignments() {
    let (repo, _profiles, service) = make_service();
    repo.seed_goal(parent_goal("g1"), &["child-1", "child-2"]);

    let patch = GoalPatch {
        is_deleted: Some(true),
        // Field updates are discarded when the patch is a delete.
        title: Some("ignored".to_string()),
        ..Default::default()
    };
    let updated = service.update_goal("g1", patch, &parent()).await.unwrap();

    assert!(updated.is_deleted);
    assert_eq!(updated.title, "Read a book");
    assert!(repo.list_assignments("g1").unwrap().is_empty());
}

#[tokio::test]
async fn reassignment_resets_all_percentages() {
    let (repo, _profiles, service) = make_service();
    repo.seed_goal(parent_goal("g1"), &["child-1", "child-2"]);
    repo.set_percentage("g1", "child-1", 80);
    repo.set_percentage("g1", "child-2", 100);

    let patch = GoalPatch {
        assigned_child_ids: Some(vec!["child-2".to_string(), "child-3".to_string()]),
        ..Default::default()
    };
    service.update_goal("g1", patch, &parent()).await.unwrap();

    let assignments = repo.list_assignments("g1").unwrap();
    assert_eq!(assignments.len(), 2);
    // No progress carry-over for anyone, including the child kept on.
    assert!(assignments.iter().all(|a| a.percentage == 0));
}

// =========================================================================
// Views
// =========================================================================

#[tokio::test]
async fn parent_view_rollup_counts_completed_children() {
    let (repo, _profiles, service) = make_service();
    repo.seed_goal(parent_goal("g1"), &["child-1", "child-2", "child-3", "child-4"]);
    repo.set_percentage("g1", "child-1", 100);
    repo.set_percentage("g1", "child-2", 100);

    let views = service.get_parent_goals("parent-1").unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.average_progress, 50);
    assert_eq!(view.completed_count, 2);
    assert_eq!(view.total_children, 4);
}

#[tokio::test]
async fn parent_view_with_no_assignments_has_zero_average() {
    let (repo, _profiles, service) = make_service();
    repo.seed_goal(parent_goal("g1"), &[]);

    let views = service.get_parent_goals("parent-1").unwrap();
    assert_eq!(views[0].average_progress, 0);
    assert_eq!(views[0].total_children, 0);
}

#[tokio::test]
async fn child_goals_require_profile() {
    let (_repo, _profiles, service) = make_service();
    assert!(matches!(
        service.get_child_goals("user-unknown"),
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn goal_details_hidden_from_unassigned_child() {
    let (repo, profiles, service) = make_service();
    profiles.seed("child-2", "user-c2", true);
    repo.seed_goal(parent_goal("g1"), &["child-1"]);

    let result = service.get_goal_details("g1", &Actor::new("user-c2", ActorRole::Child));
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

// =========================================================================
// reset_goal
// =========================================================================

#[tokio::test]
async fn manual_reset_requires_the_author() {
    let (repo, _profiles, service) = make_service();
    repo.seed_goal(parent_goal("g1"), &["child-1"]);
    repo.set_percentage("g1", "child-1", 70);

    let stranger = Actor::new("parent-2", ActorRole::Parent);
    assert!(matches!(
        service.reset_goal("g1", &stranger).await,
        Err(Error::Forbidden(_))
    ));

    let count = service.reset_goal("g1", &parent()).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(repo.list_assignments("g1").unwrap()[0].percentage, 0);
}
