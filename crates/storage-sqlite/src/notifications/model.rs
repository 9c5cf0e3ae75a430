//! Database models for stored notifications.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use famquest_core::errors::{DatabaseError, Error};
use famquest_core::notifications::{Notification, NotificationRequest, NotificationTarget};

pub(crate) const TARGET_PARENT: &str = "PARENT";
pub(crate) const TARGET_CHILD: &str = "CHILD";

/// Database model for notifications
#[derive(Queryable, Identifiable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct NotificationDB {
    pub id: String,
    pub target_kind: String,
    pub target_id: String,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<String>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// Database model for inserting a notification
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
#[serde(rename_all = "camelCase")]
pub struct NewNotificationDB {
    pub id: String,
    pub target_kind: String,
    pub target_id: String,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<String>,
}

pub(crate) fn target_columns(target: &NotificationTarget) -> (&'static str, &str) {
    match target {
        NotificationTarget::Parent { user_id } => (TARGET_PARENT, user_id),
        NotificationTarget::Child { child_id } => (TARGET_CHILD, child_id),
    }
}

impl NewNotificationDB {
    pub fn from_request(request: &NotificationRequest, id: String) -> Result<Self, Error> {
        let (target_kind, target_id) = target_columns(&request.target);
        let data = if request.data.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&request.data)?)
        };
        Ok(Self {
            id,
            target_kind: target_kind.to_string(),
            target_id: target_id.to_string(),
            notification_type: request.notification_type.as_str().to_string(),
            title: request.title.clone(),
            body: request.message.clone(),
            data,
        })
    }
}

impl TryFrom<NotificationDB> for Notification {
    type Error = Error;

    fn try_from(db: NotificationDB) -> Result<Self, Error> {
        let notification_type = db
            .notification_type
            .parse()
            .map_err(|e: String| Error::Database(DatabaseError::Internal(e)))?;

        let (parent_user_id, child_id) = match db.target_kind.as_str() {
            TARGET_PARENT => (Some(db.target_id), None),
            TARGET_CHILD => (None, Some(db.target_id)),
            other => {
                return Err(Error::Database(DatabaseError::Internal(format!(
                    "Unknown notification target kind: {}",
                    other
                ))))
            }
        };

        let data: HashMap<String, String> = match db.data {
            Some(raw) => serde_json::from_str(&raw)?,
            None => HashMap::new(),
        };

        Ok(Self {
            id: db.id,
            notification_type,
            title: db.title,
            message: db.body,
            parent_user_id,
            child_id,
            data,
            is_read: db.is_read,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(db.created_at, Utc),
        })
    }
}
