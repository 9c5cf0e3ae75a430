use chrono::{DateTime, Utc};
use famquest_core::goals::{
    AssignmentAction, Goal, GoalAssignment, GoalFieldPatch, GoalRepositoryTrait, GoalStatus,
    GoalType, NewGoalRecord,
};
use famquest_core::resets::{DailyResetEntry, RecurringGoal, ResetRepositoryTrait};
use famquest_core::Result;

use super::model::{GoalAssignmentDB, GoalChangesDB, GoalDB, NewGoalAssignmentDB, NewGoalDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{goal_assignments, goals};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;
use uuid::Uuid;

pub struct GoalRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl GoalRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        GoalRepository { pool, writer }
    }

    /// Zeroes every assignment of a goal and the cached rollup, opening a new
    /// reward cycle. Runs on the writer connection.
    fn reset_goal_progress_impl(conn: &mut SqliteConnection, goal_id: &str) -> Result<usize> {
        let now = Utc::now().naive_utc();
        let touched = diesel::update(
            goal_assignments::table
                .filter(goal_assignments::goal_id.eq(goal_id))
                .filter(goal_assignments::is_deleted.eq(false)),
        )
        .set((
            goal_assignments::percentage.eq(0),
            goal_assignments::reward_given.eq(false),
            goal_assignments::updated_at.eq(now),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

        diesel::update(goals::table.find(goal_id))
            .set((goals::progress.eq(0), goals::updated_at.eq(now)))
            .execute(conn)
            .map_err(StorageError::from)?;

        Ok(touched)
    }

    fn insert_assignment(
        conn: &mut SqliteConnection,
        goal_id: &str,
        child_id: &str,
    ) -> Result<()> {
        let new_db = NewGoalAssignmentDB {
            id: Uuid::new_v4().to_string(),
            goal_id: goal_id.to_string(),
            child_id: child_id.to_string(),
        };
        diesel::insert_into(goal_assignments::table)
            .values(&new_db)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn load_goal(conn: &mut SqliteConnection, goal_id: &str) -> Result<Goal> {
        let goal_db = goals::table
            .find(goal_id)
            .first::<GoalDB>(conn)
            .map_err(StorageError::from)?;
        Goal::try_from(goal_db)
    }
}

#[async_trait]
impl GoalRepositoryTrait for GoalRepository {
    async fn create_goal_with_assignments(&self, record: NewGoalRecord) -> Result<Goal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                let goal_id = Uuid::new_v4().to_string();
                let new_goal_db = NewGoalDB::from_record(&record, goal_id.clone());

                let result_db = diesel::insert_into(goals::table)
                    .values(&new_goal_db)
                    .returning(GoalDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                for child_id in &record.assigned_child_ids {
                    Self::insert_assignment(conn, &goal_id, child_id)?;
                }

                Goal::try_from(result_db)
            })
            .await
    }

    fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>> {
        let mut conn = get_connection(&self.pool)?;
        let goal_db = goals::table
            .find(goal_id)
            .first::<GoalDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        goal_db.map(Goal::try_from).transpose()
    }

    fn list_assignments(&self, goal_id: &str) -> Result<Vec<GoalAssignment>> {
        let mut conn = get_connection(&self.pool)?;
        let assignments_db = goal_assignments::table
            .filter(goal_assignments::goal_id.eq(goal_id))
            .filter(goal_assignments::is_deleted.eq(false))
            .load::<GoalAssignmentDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(assignments_db
            .into_iter()
            .map(GoalAssignment::from)
            .collect())
    }

    async fn update_goal_txn(
        &self,
        goal_id: &str,
        fields: GoalFieldPatch,
        action: AssignmentAction,
    ) -> Result<Goal> {
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                let now = Utc::now().naive_utc();

                match action {
                    AssignmentAction::CascadeDelete => {
                        // Field changes are discarded; the whole aggregate is
                        // soft-deleted in place.
                        diesel::update(goals::table.find(&goal_id))
                            .set((goals::is_deleted.eq(true), goals::updated_at.eq(now)))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        diesel::update(
                            goal_assignments::table
                                .filter(goal_assignments::goal_id.eq(&goal_id)),
                        )
                        .set((
                            goal_assignments::is_deleted.eq(true),
                            goal_assignments::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    }
                    AssignmentAction::Keep => {
                        diesel::update(goals::table.find(&goal_id))
                            .set(&GoalChangesDB::from_patch(fields, now))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                    }
                    AssignmentAction::Replace(child_ids) => {
                        diesel::update(goals::table.find(&goal_id))
                            .set(&GoalChangesDB::from_patch(fields, now))
                            .execute(conn)
                            .map_err(StorageError::from)?;

                        // Reassignment starts everyone from zero. Existing
                        // rows are revived rather than re-inserted to keep
                        // the (goal_id, child_id) uniqueness.
                        diesel::update(
                            goal_assignments::table
                                .filter(goal_assignments::goal_id.eq(&goal_id)),
                        )
                        .set((
                            goal_assignments::is_deleted.eq(true),
                            goal_assignments::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;

                        for child_id in &child_ids {
                            let revived = diesel::update(
                                goal_assignments::table
                                    .filter(goal_assignments::goal_id.eq(&goal_id))
                                    .filter(goal_assignments::child_id.eq(child_id)),
                            )
                            .set((
                                goal_assignments::is_deleted.eq(false),
                                goal_assignments::percentage.eq(0),
                                goal_assignments::reward_given.eq(false),
                                goal_assignments::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .map_err(StorageError::from)?;

                            if revived == 0 {
                                Self::insert_assignment(conn, &goal_id, child_id)?;
                            }
                        }

                        diesel::update(goals::table.find(&goal_id))
                            .set((goals::progress.eq(0), goals::updated_at.eq(now)))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                    }
                }

                Self::load_goal(conn, &goal_id)
            })
            .await
    }

    fn list_parent_goals(&self, parent_id: &str) -> Result<Vec<(Goal, Vec<GoalAssignment>)>> {
        let mut conn = get_connection(&self.pool)?;
        let goals_db = goals::table
            .filter(goals::author_id.eq(parent_id))
            .filter(goals::is_deleted.eq(false))
            .order(goals::created_at.desc())
            .load::<GoalDB>(&mut conn)
            .map_err(StorageError::from)?;

        let assignments_db = GoalAssignmentDB::belonging_to(&goals_db)
            .filter(goal_assignments::is_deleted.eq(false))
            .load::<GoalAssignmentDB>(&mut conn)
            .map_err(StorageError::from)?;

        let grouped = assignments_db.grouped_by(&goals_db);
        goals_db
            .into_iter()
            .zip(grouped)
            .map(|(goal_db, assignments)| {
                Ok((
                    Goal::try_from(goal_db)?,
                    assignments.into_iter().map(GoalAssignment::from).collect(),
                ))
            })
            .collect()
    }

    fn list_child_goals(&self, child_id: &str) -> Result<Vec<(GoalAssignment, Goal)>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goal_assignments::table
            .inner_join(goals::table)
            .filter(goal_assignments::child_id.eq(child_id))
            .filter(goal_assignments::is_deleted.eq(false))
            .filter(goals::is_deleted.eq(false))
            .order(goal_assignments::created_at.desc())
            .select((GoalAssignmentDB::as_select(), GoalDB::as_select()))
            .load::<(GoalAssignmentDB, GoalDB)>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(assignment_db, goal_db)| {
                Ok((GoalAssignment::from(assignment_db), Goal::try_from(goal_db)?))
            })
            .collect()
    }

    async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize> {
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Self::reset_goal_progress_impl(conn, &goal_id)
            })
            .await
    }
}

#[async_trait]
impl ResetRepositoryTrait for GoalRepository {
    async fn reset_daily_assignments(&self) -> Result<Vec<DailyResetEntry>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<DailyResetEntry>> {
                let now = Utc::now().naive_utc();

                let rows = goal_assignments::table
                    .inner_join(goals::table)
                    .filter(goals::goal_type.eq(GoalType::Daily.as_str()))
                    .filter(goals::status.eq(GoalStatus::Active.as_str()))
                    .filter(goals::is_deleted.eq(false))
                    .filter(goal_assignments::is_deleted.eq(false))
                    .select((goal_assignments::id, goals::id, goals::title, goal_assignments::child_id))
                    .load::<(String, String, String, String)>(conn)
                    .map_err(StorageError::from)?;

                let assignment_ids: Vec<&String> = rows.iter().map(|(a, _, _, _)| a).collect();
                diesel::update(
                    goal_assignments::table.filter(goal_assignments::id.eq_any(&assignment_ids)),
                )
                .set((
                    goal_assignments::percentage.eq(0),
                    goal_assignments::reward_given.eq(false),
                    goal_assignments::updated_at.eq(now),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                let goal_ids: Vec<&String> = rows.iter().map(|(_, g, _, _)| g).collect();
                diesel::update(goals::table.filter(goals::id.eq_any(&goal_ids)))
                    .set((goals::progress.eq(0), goals::updated_at.eq(now)))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                Ok(rows
                    .into_iter()
                    .map(|(_, goal_id, goal_title, child_id)| DailyResetEntry {
                        goal_id,
                        goal_title,
                        child_id,
                    })
                    .collect())
            })
            .await
    }

    fn list_recurring_goals(&self, goal_type: GoalType) -> Result<Vec<RecurringGoal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goals::table
            .filter(goals::goal_type.eq(goal_type.as_str()))
            .filter(goals::status.eq(GoalStatus::Active.as_str()))
            .filter(goals::is_deleted.eq(false))
            .select((goals::id, goals::created_at))
            .load::<(String, chrono::NaiveDateTime)>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(|(id, created_at)| RecurringGoal {
                id,
                created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
            })
            .collect())
    }

    async fn reset_goal_progress(&self, goal_id: &str) -> Result<usize> {
        GoalRepositoryTrait::reset_goal_progress(self, goal_id).await
    }

    async fn cancel_expired_goals(&self, now: DateTime<Utc>) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let cancelled = diesel::update(
                    goals::table
                        .filter(goals::status.eq(GoalStatus::Active.as_str()))
                        .filter(goals::is_deleted.eq(false))
                        .filter(goals::end_date.is_not_null())
                        .filter(goals::end_date.lt(now.naive_utc())),
                )
                .set((
                    goals::status.eq(GoalStatus::Cancelled.as_str()),
                    goals::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(cancelled)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, write_actor::spawn_writer};
    use crate::profiles::ChildProfileRepository;
    use diesel::r2d2::ConnectionManager;
    use famquest_core::goals::ActorRole;
    use famquest_core::profiles::{ChildProfileRepositoryTrait, NewChildProfile};
    use tempfile::tempdir;

    async fn create_test_repository() -> (
        GoalRepository,
        ChildProfileRepository,
        tempfile::TempDir,
    ) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool: Arc<Pool<ConnectionManager<SqliteConnection>>> =
            create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (
            GoalRepository::new(Arc::clone(&pool), writer.clone()),
            ChildProfileRepository::new(pool, writer),
            temp_dir,
        )
    }

    async fn seed_child(profiles: &ChildProfileRepository, user_id: &str) -> String {
        profiles
            .insert(NewChildProfile {
                user_id: user_id.to_string(),
                name: format!("Child {}", user_id),
                create_goals: false,
                approve_tasks: false,
                edit_profile: false,
                delete_goals: false,
            })
            .await
            .expect("Failed to insert child profile")
            .id
    }

    fn record_for(child_ids: Vec<String>) -> NewGoalRecord {
        NewGoalRecord {
            author_id: "parent-1".to_string(),
            author_role: ActorRole::Parent,
            title: "Read a book".to_string(),
            description: Some("One chapter a day".to_string()),
            goal_type: GoalType::Daily,
            reward_coins: 10,
            duration_min: 30,
            start_date: None,
            end_date: None,
            assigned_child_ids: child_ids,
        }
    }

    #[tokio::test]
    async fn create_inserts_goal_and_assignments() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child_a = seed_child(&profiles, "user-a").await;
        let child_b = seed_child(&profiles, "user-b").await;

        let goal = goals_repo
            .create_goal_with_assignments(record_for(vec![child_a.clone(), child_b]))
            .await
            .expect("create failed");
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0);
        assert!(!goal.is_deleted);

        let assignments = goals_repo
            .list_assignments(&goal.id)
            .expect("list failed");
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|a| a.percentage == 0 && !a.reward_given));
        assert!(assignments.iter().any(|a| a.child_id == child_a));
    }

    #[tokio::test]
    async fn cascade_delete_soft_deletes_goal_and_assignments() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child = seed_child(&profiles, "user-c").await;
        let goal = goals_repo
            .create_goal_with_assignments(record_for(vec![child]))
            .await
            .expect("create failed");

        let deleted = goals_repo
            .update_goal_txn(&goal.id, GoalFieldPatch::default(), AssignmentAction::CascadeDelete)
            .await
            .expect("delete failed");
        assert!(deleted.is_deleted);

        // get_goal is unfiltered so callers can tell deleted from missing.
        assert!(goals_repo.get_goal(&goal.id).expect("get failed").is_some());
        assert!(goals_repo.list_assignments(&goal.id).expect("list failed").is_empty());
        assert!(goals_repo
            .list_parent_goals("parent-1")
            .expect("list parents failed")
            .is_empty());
    }

    #[tokio::test]
    async fn replace_restarts_every_percentage_from_zero() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child_a = seed_child(&profiles, "user-d").await;
        let child_b = seed_child(&profiles, "user-e").await;
        let goal = goals_repo
            .create_goal_with_assignments(record_for(vec![child_a.clone()]))
            .await
            .expect("create failed");

        let updated = goals_repo
            .update_goal_txn(
                &goal.id,
                GoalFieldPatch {
                    title: Some("Read two books".to_string()),
                    ..Default::default()
                },
                AssignmentAction::Replace(vec![child_a.clone(), child_b.clone()]),
            )
            .await
            .expect("replace failed");
        assert_eq!(updated.title, "Read two books");
        assert_eq!(updated.progress, 0);

        let assignments = goals_repo.list_assignments(&goal.id).expect("list failed");
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|a| a.percentage == 0 && !a.reward_given));
    }

    #[tokio::test]
    async fn child_goals_join_assignment_with_goal() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child = seed_child(&profiles, "user-f").await;
        let goal = goals_repo
            .create_goal_with_assignments(record_for(vec![child.clone()]))
            .await
            .expect("create failed");

        let rows = goals_repo.list_child_goals(&child).expect("list failed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.child_id, child);
        assert_eq!(rows[0].1.id, goal.id);
    }

    #[tokio::test]
    async fn daily_reset_touches_only_daily_active_goals() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child = seed_child(&profiles, "user-g").await;

        goals_repo
            .create_goal_with_assignments(record_for(vec![child.clone()]))
            .await
            .expect("create daily failed");

        let mut one_time = record_for(vec![child]);
        one_time.goal_type = GoalType::OneTime;
        goals_repo
            .create_goal_with_assignments(one_time)
            .await
            .expect("create one-time failed");

        let entries = goals_repo
            .reset_daily_assignments()
            .await
            .expect("daily reset failed");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].goal_title, "Read a book");
    }

    #[tokio::test]
    async fn expiry_sweep_cancels_past_end_date() {
        let (goals_repo, profiles, _tmp) = create_test_repository().await;
        let child = seed_child(&profiles, "user-h").await;

        let mut expired = record_for(vec![child.clone()]);
        expired.end_date = Some(Utc::now() - chrono::Duration::days(1));
        let expired_goal = goals_repo
            .create_goal_with_assignments(expired)
            .await
            .expect("create expired failed");

        let mut open = record_for(vec![child]);
        open.end_date = Some(Utc::now() + chrono::Duration::days(1));
        let open_goal = goals_repo
            .create_goal_with_assignments(open)
            .await
            .expect("create open failed");

        let cancelled = goals_repo
            .cancel_expired_goals(Utc::now())
            .await
            .expect("sweep failed");
        assert_eq!(cancelled, 1);

        let expired_after = goals_repo
            .get_goal(&expired_goal.id)
            .expect("get failed")
            .expect("missing");
        assert_eq!(expired_after.status, GoalStatus::Cancelled);

        let open_after = goals_repo
            .get_goal(&open_goal.id)
            .expect("get failed")
            .expect("missing");
        assert_eq!(open_after.status, GoalStatus::Active);
    }
}
