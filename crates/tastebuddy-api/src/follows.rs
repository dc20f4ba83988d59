use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use serde_json::json;

use crate::AppState;
use crate::achievements::follower_milestones;
use crate::auth::extract_claims;
use crate::error::{ApiError, success};

/// POST /users/{id}/follow — follow the target user. Re-following is a
/// no-op success. Follower milestones land on the target, not the caller,
/// and any newly granted ones ride along in the response.
pub async fn follow_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    let follower_id = claims.sub.to_string();

    if follower_id == user_id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let Some(target) = state.db.get_user_by_id(&user_id)? else {
        return Err(ApiError::not_found("No such user"));
    };

    let newly_followed = state.db.follow(&follower_id, &target.id)?;
    let new_achievements = if newly_followed {
        follower_milestones(&state.db, &target.id)?
    } else {
        Vec::new()
    };

    Ok(success(json!({
        "following": true,
        "new_achievements": new_achievements,
    })))
}

/// DELETE /users/{id}/follow — unfollow. Removing an edge that does not
/// exist is a no-op success.
pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    let follower_id = claims.sub.to_string();

    if follower_id == user_id {
        return Err(ApiError::bad_request("You cannot unfollow yourself"));
    }

    let Some(target) = state.db.get_user_by_id(&user_id)? else {
        return Err(ApiError::not_found("No such user"));
    };

    state.db.unfollow(&follower_id, &target.id)?;

    Ok(success(json!({ "following": false })))
}
