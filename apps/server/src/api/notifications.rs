use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use famquest_core::errors::Error;
use famquest_core::notifications::{Notification, NotificationTarget};

use crate::actor::Caller;
use crate::api::{ok, ApiResponse};
use crate::error::ApiResult;
use crate::main_lib::AppState;

/// Resolves the caller into their notification target. Children are keyed by
/// profile id, not user id.
fn caller_target(state: &AppState, caller: &Caller) -> Result<NotificationTarget, Error> {
    if caller.0.is_parent() {
        Ok(NotificationTarget::parent(&caller.0.user_id))
    } else {
        let profile = state
            .profile_repository
            .get_by_user_id(&caller.0.user_id)?
            .ok_or_else(|| Error::NotFound("Child profile not found".to_string()))?;
        Ok(NotificationTarget::child(profile.id))
    }
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    let target = caller_target(&state, &caller)?;
    let notifications = state.notification_repository.list_for_target(&target)?;
    Ok(ok("Notifications fetched", notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let target = caller_target(&state, &caller)?;

    // A caller may only touch their own notifications.
    let owned = state
        .notification_repository
        .list_for_target(&target)?
        .into_iter()
        .any(|n| n.id == notification_id);
    if !owned {
        return Err(Error::NotFound("Notification not found".to_string()).into());
    }

    let notification = state
        .notification_repository
        .mark_read(&notification_id)
        .await?;
    Ok(ok("Notification marked as read", notification))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
}
