//! Database models for goals and goal assignments.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use famquest_core::errors::{DatabaseError, Error};
use famquest_core::goals::{Goal, GoalAssignment, NewGoalRecord};

use crate::profiles::ChildProfileDB;

/// Database model for goals
#[derive(
    Queryable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct GoalDB {
    pub id: String,
    pub author_id: String,
    pub author_role: String,
    pub title: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub status: String,
    pub reward_coins: i64,
    pub duration_min: i32,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub progress: i32,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for creating a new goal
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::goals)]
#[serde(rename_all = "camelCase")]
pub struct NewGoalDB {
    pub id: String,
    pub author_id: String,
    pub author_role: String,
    pub title: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub status: String,
    pub reward_coins: i64,
    pub duration_min: i32,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

/// Database model for goal assignments
#[derive(
    Queryable,
    Identifiable,
    Associations,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(GoalDB, foreign_key = goal_id))]
#[diesel(belongs_to(ChildProfileDB, foreign_key = child_id))]
#[diesel(table_name = crate::schema::goal_assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct GoalAssignmentDB {
    pub id: String,
    pub goal_id: String,
    pub child_id: String,
    pub percentage: i32,
    pub reward_given: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for creating a goal assignment
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::goal_assignments)]
#[serde(rename_all = "camelCase")]
pub struct NewGoalAssignmentDB {
    pub id: String,
    pub goal_id: String,
    pub child_id: String,
}

/// Column-level changeset; `None` fields are left untouched.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::goals)]
pub(crate) struct GoalChangesDB {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<String>,
    pub status: Option<String>,
    pub reward_coins: Option<i64>,
    pub duration_min: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl GoalChangesDB {
    pub fn from_patch(patch: famquest_core::goals::GoalFieldPatch, now: NaiveDateTime) -> Self {
        Self {
            title: patch.title,
            description: patch.description,
            goal_type: patch.goal_type.map(|t| t.as_str().to_string()),
            status: patch.status.map(|s| s.as_str().to_string()),
            reward_coins: patch.reward_coins,
            duration_min: patch.duration_min,
            start_date: patch.start_date.map(|d| d.naive_utc()),
            end_date: patch.end_date.map(|d| d.naive_utc()),
            updated_at: now,
        }
    }
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

// Stored enum columns are Text; a value that fails to parse means the row
// was written by something other than this crate.
fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|e| Error::Database(DatabaseError::Internal(e)))
}

impl TryFrom<GoalDB> for Goal {
    type Error = Error;

    fn try_from(db: GoalDB) -> Result<Self, Error> {
        Ok(Self {
            author_role: parse_column(&db.author_role)?,
            goal_type: parse_column(&db.goal_type)?,
            status: parse_column(&db.status)?,
            id: db.id,
            author_id: db.author_id,
            title: db.title,
            description: db.description,
            reward_coins: db.reward_coins,
            duration_min: db.duration_min,
            start_date: db.start_date.map(to_utc),
            end_date: db.end_date.map(to_utc),
            progress: db.progress,
            is_deleted: db.is_deleted,
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        })
    }
}

impl From<GoalAssignmentDB> for GoalAssignment {
    fn from(db: GoalAssignmentDB) -> Self {
        Self {
            id: db.id,
            goal_id: db.goal_id,
            child_id: db.child_id,
            percentage: db.percentage,
            reward_given: db.reward_given,
            is_deleted: db.is_deleted,
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}

impl NewGoalDB {
    pub fn from_record(record: &NewGoalRecord, id: String) -> Self {
        Self {
            id,
            author_id: record.author_id.clone(),
            author_role: record.author_role.as_str().to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            goal_type: record.goal_type.as_str().to_string(),
            status: famquest_core::goals::GoalStatus::Active.as_str().to_string(),
            reward_coins: record.reward_coins,
            duration_min: record.duration_min,
            start_date: record.start_date.map(|d| d.naive_utc()),
            end_date: record.end_date.map(|d| d.naive_utc()),
        }
    }
}
