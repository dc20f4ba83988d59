use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use uuid::Uuid;

use tastebuddy_db::models::ComplimentRow;
use tastebuddy_types::api::{
    ComplimentResponse, CreateComplimentRequest, UpdateComplimentRequest,
};

use crate::AppState;
use crate::achievements::compliment_milestones;
use crate::auth::extract_claims;
use crate::error::{ApiError, success};
use crate::extract::Json;

const MAX_BODY_LEN: usize = 500;

/// POST /recipes/{id}/compliments — leave a compliment on a recipe.
pub async fn create_compliment(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateComplimentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let body = req.body.trim();
    if body.is_empty() || body.len() > MAX_BODY_LEN {
        return Err(ApiError::bad_request("Compliment must be 1-500 characters"));
    }

    if state.db.get_recipe(&recipe_id)?.is_none() {
        return Err(ApiError::not_found("No such recipe"));
    }

    let compliment_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    state
        .db
        .insert_compliment(&compliment_id, &recipe_id, &author_id, body)?;

    let new_achievements = compliment_milestones(&state.db, &author_id)?;

    let compliment = state
        .db
        .get_compliment(&compliment_id)?
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("compliment vanished after insert")))?;

    Ok((
        StatusCode::CREATED,
        success(json!({
            "compliment": response(compliment),
            "new_achievements": new_achievements,
        })),
    ))
}

/// GET /compliments/{id}
pub async fn get_compliment(
    State(state): State<AppState>,
    Path(compliment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let compliment = state
        .db
        .get_compliment(&compliment_id)?
        .ok_or_else(|| ApiError::not_found("No such compliment"))?;

    Ok(success(response(compliment)))
}

/// GET /recipes/{id}/compliments — thread order, oldest first.
pub async fn list_for_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_recipe(&recipe_id)?.is_none() {
        return Err(ApiError::not_found("No such recipe"));
    }

    let rows = state.db.list_compliments_for_recipe(&recipe_id)?;
    let compliments: Vec<_> = rows.into_iter().map(response).collect();

    Ok(success(compliments))
}

/// PUT /compliments/{id} — author-only edit.
pub async fn update_compliment(
    State(state): State<AppState>,
    Path(compliment_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateComplimentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let body = req.body.trim();
    if body.is_empty() || body.len() > MAX_BODY_LEN {
        return Err(ApiError::bad_request("Compliment must be 1-500 characters"));
    }

    let Some(existing) = state.db.get_compliment(&compliment_id)? else {
        return Err(ApiError::not_found("No such compliment"));
    };
    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::forbidden());
    }

    state.db.update_compliment_body(&compliment_id, body)?;

    let compliment = state
        .db
        .get_compliment(&compliment_id)?
        .ok_or_else(|| ApiError::not_found("No such compliment"))?;

    Ok(success(response(compliment)))
}

/// DELETE /compliments/{id} — author-only.
pub async fn delete_compliment(
    State(state): State<AppState>,
    Path(compliment_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let Some(existing) = state.db.get_compliment(&compliment_id)? else {
        return Err(ApiError::not_found("No such compliment"));
    };
    if existing.author_id != claims.sub.to_string() {
        return Err(ApiError::forbidden());
    }

    state.db.delete_compliment(&compliment_id)?;

    Ok(success(json!({ "deleted": true })))
}

fn response(row: ComplimentRow) -> ComplimentResponse {
    ComplimentResponse {
        id: row.id,
        recipe_id: row.recipe_id,
        author_id: row.author_id,
        body: row.body,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
