use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use famquest_core::goals::{ChildGoalView, Goal, GoalPatch, NewGoal, ParentGoalView};
use famquest_core::progress::{ProgressInput, ProgressOutcome, StartedTask};

use crate::actor::Caller;
use crate::api::{ok, ApiResponse};
use crate::error::ApiResult;
use crate::main_lib::AppState;

async fn create_goal(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(new_goal): Json<NewGoal>,
) -> ApiResult<Json<ApiResponse<Goal>>> {
    let goal = state.goal_service.create_goal(new_goal, &caller.0).await?;
    Ok(ok("Goal created", goal))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(goal_id): Path<String>,
    Json(patch): Json<GoalPatch>,
) -> ApiResult<Json<ApiResponse<Goal>>> {
    let goal = state
        .goal_service
        .update_goal(&goal_id, patch, &caller.0)
        .await?;
    Ok(ok("Goal updated", goal))
}

async fn update_progress(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(goal_id): Path<String>,
    Json(input): Json<ProgressInput>,
) -> ApiResult<Json<ApiResponse<ProgressOutcome>>> {
    caller.require_child()?;
    let outcome = state
        .progress_service
        .update_progress(&goal_id, &caller.0.user_id, input.minutes_completed)
        .await?;
    Ok(ok("Progress updated", outcome))
}

async fn start_task(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(goal_id): Path<String>,
) -> ApiResult<Json<ApiResponse<StartedTask>>> {
    caller.require_child()?;
    let started = state
        .progress_service
        .start_task(&goal_id, &caller.0.user_id)
        .await?;
    let message = if started.already_completed {
        "Task already completed"
    } else {
        "Task started"
    };
    Ok(ok(message, started))
}

async fn parent_goals(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<ApiResponse<Vec<ParentGoalView>>>> {
    caller.require_parent()?;
    let goals = state.goal_service.get_parent_goals(&caller.0.user_id)?;
    Ok(ok("Goals fetched", goals))
}

async fn child_goals(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<ApiResponse<Vec<ChildGoalView>>>> {
    caller.require_child()?;
    let goals = state.goal_service.get_child_goals(&caller.0.user_id)?;
    Ok(ok("Goals fetched", goals))
}

async fn goal_details(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(goal_id): Path<String>,
) -> ApiResult<Json<ApiResponse<ParentGoalView>>> {
    let view = state.goal_service.get_goal_details(&goal_id, &caller.0)?;
    Ok(ok("Goal fetched", view))
}

async fn reset_goal(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(goal_id): Path<String>,
) -> ApiResult<Json<ApiResponse<usize>>> {
    caller.require_parent()?;
    let touched = state.goal_service.reset_goal(&goal_id, &caller.0).await?;
    Ok(ok("Goal progress reset", touched))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/goals/create", post(create_goal))
        .route("/goals/update/{goal_id}", patch(update_goal))
        .route("/goals/progress/{goal_id}", patch(update_progress))
        .route("/goals/{goal_id}/start", post(start_task))
        .route("/goals/parent/list", get(parent_goals))
        .route("/goals/child/list", get(child_goals))
        .route("/goals/details/{goal_id}", get(goal_details))
        .route("/goals/reset/{goal_id}", post(reset_goal))
}
