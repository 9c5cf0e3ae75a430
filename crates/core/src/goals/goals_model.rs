//! Goals domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the authenticated actor (and of a goal's author).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Parent,
    Child,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Parent => "PARENT",
            ActorRole::Child => "CHILD",
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARENT" => Ok(ActorRole::Parent),
            "CHILD" => Ok(ActorRole::Child),
            other => Err(format!("Unknown actor role: {}", other)),
        }
    }
}

/// The authenticated caller, resolved by upstream auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.role == ActorRole::Parent
    }

    pub fn is_child(&self) -> bool {
        self.role == ActorRole::Child
    }
}

/// Recurrence class of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
    OneTime,
    Daily,
    Weekly,
    Monthly,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::OneTime => "ONE_TIME",
            GoalType::Daily => "DAILY",
            GoalType::Weekly => "WEEKLY",
            GoalType::Monthly => "MONTHLY",
        }
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE_TIME" => Ok(GoalType::OneTime),
            "DAILY" => Ok(GoalType::Daily),
            "WEEKLY" => Ok(GoalType::Weekly),
            "MONTHLY" => Ok(GoalType::Monthly),
            other => Err(format!("Unknown goal type: {}", other)),
        }
    }
}

/// Lifecycle status of a goal.
///
/// A goal never regresses from `Completed` back to `Active`; lifecycle ends
/// via soft delete or `Cancelled`/`Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Paused => "PAUSED",
            GoalStatus::Completed => "COMPLETED",
            GoalStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(GoalStatus::Active),
            "PAUSED" => Ok(GoalStatus::Paused),
            "COMPLETED" => Ok(GoalStatus::Completed),
            "CANCELLED" => Ok(GoalStatus::Cancelled),
            other => Err(format!("Unknown goal status: {}", other)),
        }
    }
}

/// Domain model representing a goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub author_id: String,
    pub author_role: ActorRole,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub status: GoalStatus,
    pub reward_coins: i64,
    pub duration_min: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Cached goal-level rollup (0-100), recomputed on every progress update.
    pub progress: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links one goal to one child profile; unique per (goal_id, child_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalAssignment {
    pub id: String,
    pub goal_id: String,
    pub child_id: String,
    /// This child's individual progress (0-100), monotonically non-decreasing
    /// within a reward cycle.
    pub percentage: i32,
    /// Guards at-most-once reward issuance; transitions false -> true exactly
    /// once per completion.
    pub reward_given: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a new goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub reward_coins: i64,
    pub duration_min: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub assigned_child_ids: Vec<String>,
}

/// Fully-resolved insert record built by the service after authorization.
#[derive(Debug, Clone)]
pub struct NewGoalRecord {
    pub author_id: String,
    pub author_role: ActorRole,
    pub title: String,
    pub description: Option<String>,
    pub goal_type: GoalType,
    pub reward_coins: i64,
    pub duration_min: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub assigned_child_ids: Vec<String>,
}

/// Partial goal update as received on the wire.
///
/// Field presence is meaningful: a child patch carrying any forbidden field
/// is rejected even if the value matches the stored one. The date fields are
/// double-optioned so an explicit JSON `null` still counts as present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: Option<GoalType>,
    pub status: Option<GoalStatus>,
    pub reward_coins: Option<i64>,
    pub duration_min: Option<i32>,
    #[serde(
        default,
        deserialize_with = "present_even_if_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "present_even_if_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub assigned_child_ids: Option<Vec<String>>,
    pub is_deleted: Option<bool>,
}

/// Deserializes a nullable field where `null` is distinct from absent.
fn present_even_if_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Column-level changes applied by the repository in one transaction.
#[derive(Debug, Clone, Default)]
pub struct GoalFieldPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<GoalType>,
    pub status: Option<GoalStatus>,
    pub reward_coins: Option<i64>,
    pub duration_min: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// What happens to a goal's assignment set during an update.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentAction {
    /// Leave the assignment set untouched.
    Keep,
    /// Soft-delete the goal and every assignment; field changes are discarded.
    CascadeDelete,
    /// Delete-all and recreate for the given child ids. Every percentage
    /// restarts at 0; there is no progress carry-over on reassignment.
    Replace(Vec<String>),
}

/// Parent-facing goal view with the per-goal rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentGoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub assignments: Vec<GoalAssignment>,
    pub average_progress: i32,
    pub completed_count: usize,
    pub total_children: usize,
}

/// Child-facing view: the child's assignment with its parent goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildGoalView {
    #[serde(flatten)]
    pub assignment: GoalAssignment,
    pub goal: Goal,
}
