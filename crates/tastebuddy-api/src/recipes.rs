use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use tastebuddy_db::Database;
use tastebuddy_db::models::RecipeRow;
use tastebuddy_types::api::{CreateRecipeRequest, RateRecipeRequest, RecipeResponse};

use crate::AppState;
use crate::achievements::recipe_milestones;
use crate::auth::extract_claims;
use crate::error::{ApiError, success};
use crate::extract::Json;

const MAX_TITLE_LEN: usize = 200;

/// POST /recipes — publish a recipe; recipe-count milestones for the author
/// are awarded in the same request and returned as `new_achievements`.
pub async fn create_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let title = req.title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request("Title must be 1-200 characters"));
    }
    if req.instructions.trim().is_empty() {
        return Err(ApiError::bad_request("Instructions must not be empty"));
    }

    let recipe_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();

    state.db.insert_recipe(
        &recipe_id,
        &author_id,
        title,
        req.summary.as_deref(),
        &req.ingredients,
        &req.instructions,
    )?;

    let new_achievements = recipe_milestones(&state.db, &author_id)?;

    let recipe = state
        .db
        .get_recipe(&recipe_id)?
        .ok_or_else(|| ApiError::internal(anyhow!("recipe vanished after insert")))?;

    Ok((
        StatusCode::CREATED,
        success(json!({
            "recipe": fresh_response(recipe),
            "new_achievements": new_achievements,
        })),
    ))
}

/// GET /recipes/{id} — recipe with its rating summary and favorite count.
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let recipe = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<RecipeResponse>> {
        let Some(recipe) = db.db.get_recipe(&recipe_id)? else {
            return Ok(None);
        };
        Ok(Some(full_response(&db.db, recipe)?))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(anyhow!("task join failed"))
    })??
    .ok_or_else(|| ApiError::not_found("No such recipe"))?;

    Ok(success(recipe))
}

/// GET /users/{id}/recipes — a user's recipes, newest first.
pub async fn list_user_recipes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let recipes = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if !db.db.user_exists(&user_id)? {
            return Ok(None);
        }
        let rows = db.db.list_recipes_by_author(&user_id)?;
        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            recipes.push(full_response(&db.db, row)?);
        }
        Ok(Some(recipes))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(anyhow!("task join failed"))
    })??
    .ok_or_else(|| ApiError::not_found("No such user"))?;

    Ok(success(recipes))
}

/// DELETE /recipes/{id} — author-only.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let Some(recipe) = state.db.get_recipe(&recipe_id)? else {
        return Err(ApiError::not_found("No such recipe"));
    };
    if recipe.author_id != claims.sub.to_string() {
        return Err(ApiError::forbidden());
    }

    state.db.delete_recipe(&recipe_id)?;

    Ok(success(json!({ "deleted": true })))
}

/// PUT /recipes/{id}/rating — rate 1-5; re-rating replaces the old value.
pub async fn rate_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if !(1..=5).contains(&req.value) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }

    let Some(recipe) = state.db.get_recipe(&recipe_id)? else {
        return Err(ApiError::not_found("No such recipe"));
    };
    let rater_id = claims.sub.to_string();
    if recipe.author_id == rater_id {
        return Err(ApiError::bad_request("You cannot rate your own recipe"));
    }

    state.db.upsert_rating(&recipe_id, &rater_id, req.value)?;
    let summary = state.db.rating_summary(&recipe_id)?;

    Ok(success(json!({
        "rating_average": summary.average,
        "rating_count": summary.count,
    })))
}

/// PUT /recipes/{id}/favorite — idempotent set.
pub async fn favorite_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if state.db.get_recipe(&recipe_id)?.is_none() {
        return Err(ApiError::not_found("No such recipe"));
    }

    state.db.add_favorite(&recipe_id, &claims.sub.to_string())?;
    let count = state.db.favorite_count(&recipe_id)?;

    Ok(success(json!({ "favorited": true, "favorite_count": count })))
}

/// DELETE /recipes/{id}/favorite — idempotent unset.
pub async fn unfavorite_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if state.db.get_recipe(&recipe_id)?.is_none() {
        return Err(ApiError::not_found("No such recipe"));
    }

    state.db.remove_favorite(&recipe_id, &claims.sub.to_string())?;
    let count = state.db.favorite_count(&recipe_id)?;

    Ok(success(json!({ "favorited": false, "favorite_count": count })))
}

/// A just-created recipe has no ratings or favorites yet.
fn fresh_response(row: RecipeRow) -> RecipeResponse {
    RecipeResponse {
        id: row.id,
        author_id: row.author_id,
        title: row.title,
        summary: row.summary,
        ingredients: row.ingredients,
        instructions: row.instructions,
        created_at: row.created_at,
        rating_average: None,
        rating_count: 0,
        favorite_count: 0,
    }
}

fn full_response(db: &Database, row: RecipeRow) -> anyhow::Result<RecipeResponse> {
    let summary = db.rating_summary(&row.id)?;
    let favorite_count = db.favorite_count(&row.id)?;
    Ok(RecipeResponse {
        id: row.id,
        author_id: row.author_id,
        title: row.title,
        summary: row.summary,
        ingredients: row.ingredients,
        instructions: row.instructions,
        created_at: row.created_at,
        rating_average: summary.average,
        rating_count: summary.count,
        favorite_count,
    })
}
