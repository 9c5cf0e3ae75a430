//! The transactional progress store.
//!
//! `apply_progress` is the only place a reward is ever issued. It runs on
//! the single writer connection inside an immediate transaction, so two
//! concurrent updates to the same assignment are applied one after the
//! other and the `reward_given` flag can flip false to true at most once.

use chrono::Utc;
use famquest_core::errors::Error;
use famquest_core::goals::GoalStatus;
use famquest_core::progress::engine;
use famquest_core::progress::{
    ProgressApplied, ProgressOutcome, ProgressRepositoryTrait, TaskStartCheck,
};
use famquest_core::Result;

use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::goals::{GoalAssignmentDB, GoalDB};
use crate::profiles::ChildProfileDB;
use crate::schema::{child_profiles, goal_assignments, goals};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;

pub struct ProgressRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ProgressRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        ProgressRepository { pool, writer }
    }

    fn resolve_context(
        conn: &mut SqliteConnection,
        goal_id: &str,
        user_id: &str,
    ) -> Result<(ChildProfileDB, GoalDB, GoalAssignmentDB)> {
        let profile = child_profiles::table
            .filter(child_profiles::user_id.eq(user_id))
            .first::<ChildProfileDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::NotFound("Child profile not found".to_string()))?;

        let goal = goals::table
            .find(goal_id)
            .first::<GoalDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .filter(|g| !g.is_deleted)
            .ok_or_else(|| Error::NotFound("Goal not found".to_string()))?;

        let assignment = goal_assignments::table
            .filter(goal_assignments::goal_id.eq(goal_id))
            .filter(goal_assignments::child_id.eq(&profile.id))
            .filter(goal_assignments::is_deleted.eq(false))
            .first::<GoalAssignmentDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::NotFound("Goal assignment not found".to_string()))?;

        Ok((profile, goal, assignment))
    }
}

#[async_trait]
impl ProgressRepositoryTrait for ProgressRepository {
    async fn apply_progress(
        &self,
        goal_id: &str,
        user_id: &str,
        minutes_completed: i32,
    ) -> Result<ProgressApplied> {
        let goal_id = goal_id.to_string();
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ProgressApplied> {
                let (profile, goal_db, assignment) =
                    Self::resolve_context(conn, &goal_id, &user_id)?;
                let goal = famquest_core::goals::Goal::try_from(goal_db)?;

                engine::check_progress_preconditions(&goal, minutes_completed)?;

                let computation =
                    engine::apply_minutes(assignment.percentage, minutes_completed, goal.duration_min);

                let now = Utc::now().naive_utc();
                diesel::update(goal_assignments::table.find(&assignment.id))
                    .set((
                        goal_assignments::percentage.eq(computation.new_percentage),
                        goal_assignments::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                // Rollup over the freshly written percentages.
                let siblings = goal_assignments::table
                    .filter(goal_assignments::goal_id.eq(&goal_id))
                    .filter(goal_assignments::is_deleted.eq(false))
                    .select((goal_assignments::child_id, goal_assignments::percentage))
                    .load::<(String, i32)>(conn)
                    .map_err(StorageError::from)?;
                let percentages: Vec<i32> = siblings.iter().map(|(_, p)| *p).collect();
                let rollup = engine::compute_rollup(&percentages);

                let goal_status = if rollup.global_completed && goal.status != GoalStatus::Completed
                {
                    GoalStatus::Completed
                } else {
                    goal.status
                };
                diesel::update(goals::table.find(&goal_id))
                    .set((
                        goals::progress.eq(rollup.average_progress),
                        goals::status.eq(goal_status.as_str()),
                        goals::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                // At-most-once reward: the completion edge and the stored
                // flag are both checked inside this transaction.
                let mut reward_given = 0i64;
                if computation.just_completed && !assignment.reward_given {
                    diesel::update(goal_assignments::table.find(&assignment.id))
                        .set((
                            goal_assignments::reward_given.eq(true),
                            goal_assignments::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;

                    diesel::update(child_profiles::table.find(&profile.id))
                        .set((
                            child_profiles::coins.eq(profile.coins + goal.reward_coins),
                            child_profiles::completed_tasks.eq(profile.completed_tasks + 1),
                            child_profiles::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;

                    reward_given = goal.reward_coins;
                }

                Ok(ProgressApplied {
                    outcome: ProgressOutcome {
                        child_progress_percent: computation.new_percentage,
                        child_minutes_logged: computation.new_minutes,
                        child_completed: computation.child_completed,
                        goal_status,
                        reward_given,
                        average_progress: rollup.average_progress,
                        completed_count: rollup.completed_count,
                        total_children: rollup.total_children,
                    },
                    goal_id: goal_id.clone(),
                    goal_title: goal.title,
                    parent_user_id: goal.author_id,
                    child_id: profile.id,
                    child_name: profile.name,
                    assigned_child_ids: siblings.into_iter().map(|(c, _)| c).collect(),
                })
            })
            .await
    }

    fn prepare_start(&self, goal_id: &str, user_id: &str) -> Result<TaskStartCheck> {
        let mut conn = get_connection(&self.pool)?;
        let (profile, goal_db, assignment) = Self::resolve_context(&mut conn, goal_id, user_id)?;
        let goal = famquest_core::goals::Goal::try_from(goal_db)?;

        engine::check_start_preconditions(&goal)?;

        Ok(TaskStartCheck {
            child_id: profile.id,
            remaining_min: engine::remaining_minutes(assignment.percentage, goal.duration_min),
        })
    }
}
