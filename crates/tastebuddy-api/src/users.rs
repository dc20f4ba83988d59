use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use tracing::error;

use tastebuddy_types::api::{ProfileResponse, UpdateProfileRequest, UserSummary};

use crate::AppState;
use crate::auth::{extract_claims, maybe_claims};
use crate::error::{ApiError, success};
use crate::extract::Json;

/// GET /users/{id} — public profile. The email field is filled in only when
/// the owner's visibility setting admits this viewer.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = maybe_claims(&headers, &state.jwt_secret).map(|claims| claims.sub.to_string());

    let db = state.clone();
    let profile = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<ProfileResponse>> {
        let Some(user) = db.db.get_user_by_id(&user_id)? else {
            return Ok(None);
        };

        let counts = db.db.profile_counts(&user.id)?;
        let email_visible =
            db.db
                .resolve_email_visibility(&user.id, viewer_id.as_deref(), user.email_visibility)?;

        Ok(Some(ProfileResponse {
            email: if email_visible { user.email } else { None },
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            email_visibility: user.email_visibility,
            created_at: user.created_at,
            followers: counts.followers,
            following: counts.following,
            recipes: counts.recipes,
        }))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(anyhow!("task join failed"))
    })??
    .ok_or_else(|| ApiError::not_found("No such user"))?;

    Ok(success(profile))
}

/// PUT /users/{id} — owner-only profile update.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    if claims.sub.to_string() != user_id {
        return Err(ApiError::forbidden());
    }

    if let Some(email) = req.email.as_deref() {
        if !email.contains('@') {
            return Err(ApiError::bad_request("Email address is not valid"));
        }
    }
    if req.display_name.as_deref().is_some_and(|n| n.len() > 80) {
        return Err(ApiError::bad_request("Display name is too long"));
    }

    let updated = state.db.update_user_profile(
        &user_id,
        req.display_name.as_deref(),
        req.bio.as_deref(),
        req.email.as_deref(),
        req.email_visibility,
    )?;
    if !updated {
        return Err(ApiError::not_found("No such user"));
    }

    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or_else(|| ApiError::not_found("No such user"))?;
    let counts = state.db.profile_counts(&user_id)?;

    Ok(success(ProfileResponse {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        bio: user.bio,
        // self-view, the owner always sees their own email
        email: user.email,
        email_visibility: user.email_visibility,
        created_at: user.created_at,
        followers: counts.followers,
        following: counts.following,
        recipes: counts.recipes,
    }))
}

/// GET /users/{id}/followers
pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    summaries(state, user_id, |db, id| db.list_followers(id)).await
}

/// GET /users/{id}/following
pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    summaries(state, user_id, |db, id| db.list_following(id)).await
}

async fn summaries<F>(
    state: AppState,
    user_id: String,
    query: F,
) -> Result<axum::Json<crate::error::Success<Vec<UserSummary>>>, ApiError>
where
    F: FnOnce(
            &tastebuddy_db::Database,
            &str,
        ) -> anyhow::Result<Vec<tastebuddy_db::models::UserSummaryRow>>
        + Send
        + 'static,
{
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if !db.db.user_exists(&user_id)? {
            return Ok(None);
        }
        Ok(Some(query(&db.db, &user_id)?))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(anyhow!("task join failed"))
    })??
    .ok_or_else(|| ApiError::not_found("No such user"))?;

    let users: Vec<_> = rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
        })
        .collect();

    Ok(success(users))
}
