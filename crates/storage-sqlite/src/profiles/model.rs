//! Database models for child profiles.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use famquest_core::profiles::{ChildProfile, NewChildProfile};

/// Database model for child profiles
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
#[diesel(table_name = crate::schema::child_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ChildProfileDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub coins: i64,
    pub completed_tasks: i32,
    pub create_goals: bool,
    pub approve_tasks: bool,
    pub edit_profile: bool,
    pub delete_goals: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for creating a child profile
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::child_profiles)]
#[serde(rename_all = "camelCase")]
pub struct NewChildProfileDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub create_goals: bool,
    pub approve_tasks: bool,
    pub edit_profile: bool,
    pub delete_goals: bool,
}

impl From<ChildProfileDB> for ChildProfile {
    fn from(db: ChildProfileDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            coins: db.coins,
            completed_tasks: db.completed_tasks,
            create_goals: db.create_goals,
            approve_tasks: db.approve_tasks,
            edit_profile: db.edit_profile,
            delete_goals: db.delete_goals,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(db.updated_at, Utc),
        }
    }
}

impl NewChildProfileDB {
    pub fn from_domain(domain: NewChildProfile, id: String) -> Self {
        Self {
            id,
            user_id: domain.user_id,
            name: domain.name,
            create_goals: domain.create_goals,
            approve_tasks: domain.approve_tasks,
            edit_profile: domain.edit_profile,
            delete_goals: domain.delete_goals,
        }
    }
}
