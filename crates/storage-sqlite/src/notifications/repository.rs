use famquest_core::errors::Error;
use famquest_core::notifications::{
    Notification, NotificationRepositoryTrait, NotificationRequest, NotificationTarget,
};
use famquest_core::Result;

use super::model::{target_columns, NewNotificationDB, NotificationDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::notifications;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;
use uuid::Uuid;

pub struct NotificationRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl NotificationRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        NotificationRepository { pool, writer }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn insert(&self, request: &NotificationRequest) -> Result<Notification> {
        let new_db = NewNotificationDB::from_request(request, Uuid::new_v4().to_string())?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Notification> {
                let result_db = diesel::insert_into(notifications::table)
                    .values(&new_db)
                    .returning(NotificationDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Notification::try_from(result_db)
            })
            .await
    }

    fn list_for_target(&self, target: &NotificationTarget) -> Result<Vec<Notification>> {
        let mut conn = get_connection(&self.pool)?;
        let (target_kind, target_id) = target_columns(target);
        let rows = notifications::table
            .filter(notifications::target_kind.eq(target_kind))
            .filter(notifications::target_id.eq(target_id))
            .order(notifications::created_at.desc())
            .load::<NotificationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(&self, notification_id: &str) -> Result<Notification> {
        let notification_id = notification_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Notification> {
                let updated = diesel::update(notifications::table.find(&notification_id))
                    .set(notifications::is_read.eq(true))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(Error::NotFound("Notification not found".to_string()));
                }
                let result_db = notifications::table
                    .find(&notification_id)
                    .first::<NotificationDB>(conn)
                    .map_err(StorageError::from)?;
                Notification::try_from(result_db)
            })
            .await
    }
}
