use famquest_core::profiles::{ChildProfile, ChildProfileRepositoryTrait, NewChildProfile};
use famquest_core::Result;

use super::model::{ChildProfileDB, NewChildProfileDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::child_profiles;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;
use uuid::Uuid;

pub struct ChildProfileRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ChildProfileRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        ChildProfileRepository { pool, writer }
    }
}

#[async_trait]
impl ChildProfileRepositoryTrait for ChildProfileRepository {
    fn get_by_user_id(&self, target_user_id: &str) -> Result<Option<ChildProfile>> {
        let mut conn = get_connection(&self.pool)?;
        let profile_db = child_profiles::table
            .filter(child_profiles::user_id.eq(target_user_id))
            .first::<ChildProfileDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(profile_db.map(ChildProfile::from))
    }

    fn get_by_id(&self, profile_id: &str) -> Result<Option<ChildProfile>> {
        let mut conn = get_connection(&self.pool)?;
        let profile_db = child_profiles::table
            .find(profile_id)
            .first::<ChildProfileDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(profile_db.map(ChildProfile::from))
    }

    async fn insert(&self, new_profile: NewChildProfile) -> Result<ChildProfile> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChildProfile> {
                let new_db =
                    NewChildProfileDB::from_domain(new_profile, Uuid::new_v4().to_string());
                let result_db = diesel::insert_into(child_profiles::table)
                    .values(&new_db)
                    .returning(ChildProfileDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(ChildProfile::from(result_db))
            })
            .await
    }
}
