//! Notification types and the dispatch seam.
//!
//! Services emit [`NotificationRequest`]s after successful mutations. A
//! runtime adapter (the server) persists and best-effort delivers them;
//! delivery failures never cause the originating operation to fail.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Kind of notification emitted by goal state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    GoalCreated,
    GoalUpdated,
    ChildProgressUpdate,
    RewardUnlocked,
    GoalCompleted,
    DailyReminder,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::GoalCreated => "GOAL_CREATED",
            NotificationType::GoalUpdated => "GOAL_UPDATED",
            NotificationType::ChildProgressUpdate => "CHILD_PROGRESS_UPDATE",
            NotificationType::RewardUnlocked => "REWARD_UNLOCKED",
            NotificationType::GoalCompleted => "GOAL_COMPLETED",
            NotificationType::DailyReminder => "DAILY_REMINDER",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GOAL_CREATED" => Ok(NotificationType::GoalCreated),
            "GOAL_UPDATED" => Ok(NotificationType::GoalUpdated),
            "CHILD_PROGRESS_UPDATE" => Ok(NotificationType::ChildProgressUpdate),
            "REWARD_UNLOCKED" => Ok(NotificationType::RewardUnlocked),
            "GOAL_COMPLETED" => Ok(NotificationType::GoalCompleted),
            "DAILY_REMINDER" => Ok(NotificationType::DailyReminder),
            other => Err(format!("Unknown notification type: {}", other)),
        }
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NotificationTarget {
    Parent { user_id: String },
    Child { child_id: String },
}

impl NotificationTarget {
    pub fn parent(user_id: impl Into<String>) -> Self {
        NotificationTarget::Parent {
            user_id: user_id.into(),
        }
    }

    pub fn child(child_id: impl Into<String>) -> Self {
        NotificationTarget::Child {
            child_id: child_id.into(),
        }
    }
}

/// A typed notification-send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub target: NotificationTarget,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl NotificationRequest {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        target: NotificationTarget,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            message: message.into(),
            target,
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A stored notification row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub parent_user_id: Option<String>,
    pub child_id: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Dispatch seam implemented by the runtime (persist + push).
///
/// Implementations must be safe to call from spawned tasks; callers treat
/// the result as best-effort and log failures.
#[async_trait]
pub trait NotificationDispatcherTrait: Send + Sync {
    async fn send(&self, request: NotificationRequest) -> Result<()>;
}

/// Trait for the stored-notification repository.
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn insert(&self, request: &NotificationRequest) -> Result<Notification>;
    fn list_for_target(&self, target: &NotificationTarget) -> Result<Vec<Notification>>;
    async fn mark_read(&self, notification_id: &str) -> Result<Notification>;
}

/// Fire-and-forget dispatch. Runs after the originating transaction committed;
/// failures are logged and swallowed.
pub fn dispatch_best_effort(
    dispatcher: Arc<dyn NotificationDispatcherTrait>,
    request: NotificationRequest,
) {
    tokio::spawn(async move {
        let kind = request.notification_type;
        if let Err(e) = dispatcher.send(request).await {
            warn!("Notification dispatch failed ({}): {}", kind.as_str(), e);
        }
    });
}

/// A dispatcher that drops everything. Useful for tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcherTrait for NoopDispatcher {
    async fn send(&self, _request: NotificationRequest) -> Result<()> {
        Ok(())
    }
}
