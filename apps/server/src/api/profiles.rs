use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use famquest_core::errors::Error;
use famquest_core::profiles::ChildProfile;

use crate::actor::Caller;
use crate::api::{ok, ApiResponse};
use crate::error::ApiResult;
use crate::main_lib::AppState;

/// The calling child's own profile: coin balance, completion counter, and
/// permission flags.
async fn my_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<ApiResponse<ChildProfile>>> {
    caller.require_child()?;
    let profile = state
        .profile_repository
        .get_by_user_id(&caller.0.user_id)?
        .ok_or_else(|| Error::NotFound("Child profile not found".to_string()))?;
    Ok(ok("Profile fetched", profile))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/profiles/child/me", get(my_profile))
}
