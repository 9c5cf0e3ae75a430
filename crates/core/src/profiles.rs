//! Child profiles: coin balance, completion counter, and permission flags.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A child account's profile.
///
/// `coins` is mutated only by reward issuance (increment) and the
/// avatar-purchase flow (decrement, outside this engine). The permission
/// flags gate what a CHILD author may do in the goal store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub coins: i64,
    pub completed_tasks: i32,
    pub create_goals: bool,
    pub approve_tasks: bool,
    pub edit_profile: bool,
    pub delete_goals: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a child profile (registration lives upstream;
/// this is used by provisioning and tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChildProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub create_goals: bool,
    #[serde(default)]
    pub approve_tasks: bool,
    #[serde(default)]
    pub edit_profile: bool,
    #[serde(default)]
    pub delete_goals: bool,
}

/// Trait for child profile repository operations.
#[async_trait]
pub trait ChildProfileRepositoryTrait: Send + Sync {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<ChildProfile>>;
    fn get_by_id(&self, profile_id: &str) -> Result<Option<ChildProfile>>;
    async fn insert(&self, new_profile: NewChildProfile) -> Result<ChildProfile>;
}
