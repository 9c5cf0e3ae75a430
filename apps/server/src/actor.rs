//! Caller identity extraction.
//!
//! Authentication lives upstream; this deployment trusts the
//! `x-user-id` / `x-user-role` headers set by the gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use famquest_core::{Actor, ActorRole};

use crate::error::ApiError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, extracted per request.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

impl Caller {
    pub fn require_parent(&self) -> Result<(), ApiError> {
        if self.0.is_parent() {
            Ok(())
        } else {
            Err(ApiError::forbidden("This action requires a parent account"))
        }
    }

    pub fn require_child(&self) -> Result<(), ApiError> {
        if self.0.is_child() {
            Ok(())
        } else {
            Err(ApiError::forbidden("This action requires a child account"))
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;

        let role: ActorRole = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-role header"))?
            .parse()
            .map_err(ApiError::unauthorized)?;

        Ok(Caller(Actor::new(user_id, role)))
    }
}
